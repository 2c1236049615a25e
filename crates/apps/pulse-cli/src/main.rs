mod config;
mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::PulseConfig;
use pulse_sdk::{FileStore, NotificationLog, SyncController, TcpChannel};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pulse", version, about = "CRM real-time notification subsystem")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "pulse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the server and stream notifications to stdout.
    Run,
    /// Print the persisted notification log.
    List,
    /// Print the number of unread notifications.
    Unread,
    /// Mark one notification as read.
    MarkRead { id: String },
    /// Mark every notification as read.
    MarkAllRead,
    /// Delete one notification.
    Delete { id: String },
    /// Delete every notification, including the persisted log.
    Clear,
    /// Run a minimal room-scoped broadcast server for local development.
    Serve {
        #[arg(long, default_value = "127.0.0.1:4780")]
        bind: String,
    },
    /// Print an example configuration file.
    ExampleConfig,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = PulseConfig::load_or_default(&cli.config)?;

    match cli.command {
        Command::Run => run(config),
        Command::List => list(&config),
        Command::Unread => unread(&config),
        Command::MarkRead { id } => {
            let mut log = open_log(&config);
            if !log.mark_read(&id) {
                println!("no notification with id {id}");
            }
            Ok(())
        }
        Command::MarkAllRead => {
            open_log(&config).mark_all_read();
            Ok(())
        }
        Command::Delete { id } => {
            let mut log = open_log(&config);
            if !log.delete(&id) {
                println!("no notification with id {id}");
            }
            Ok(())
        }
        Command::Clear => {
            open_log(&config).clear();
            Ok(())
        }
        Command::Serve { bind } => serve::serve(&bind),
        Command::ExampleConfig => {
            print!("{}", PulseConfig::example_toml());
            Ok(())
        }
    }
}

fn open_log(config: &PulseConfig) -> NotificationLog {
    NotificationLog::open(Box::new(FileStore::new(config.storage_file())))
}

fn list(config: &PulseConfig) -> Result<()> {
    let log = open_log(config);
    if log.is_empty() {
        println!("no notifications");
        return Ok(());
    }
    for record in log.records() {
        let marker = if record.read { ' ' } else { '*' };
        println!(
            "{marker} {}  {}  {}",
            record.id,
            pulse_sdk::time_ago(&record.timestamp),
            record.body.summary()
        );
    }
    Ok(())
}

fn unread(config: &PulseConfig) -> Result<()> {
    let log = open_log(config);
    let count = log.records().iter().filter(|record| !record.read).count();
    println!("{count}");
    Ok(())
}

fn run(config: PulseConfig) -> Result<()> {
    let transport = TcpChannel::new(&config.server_addr);
    let store = FileStore::new(config.storage_file());
    let mut controller = SyncController::new(Box::new(store), Box::new(transport));

    controller.set_identity(Some(config.identity.to_context()));
    controller.set_active_brand(config.brand.clone());

    let unread = controller.notifications().iter().filter(|r| !r.read).count();
    println!("connecting to {} ({unread} unread)", config.server_addr);

    let mut last_state = controller.connection_state();
    loop {
        let accepted = controller.tick();
        let state = controller.connection_state();
        if state != last_state {
            println!("[{}]", state.as_str());
            last_state = state;
        }
        if accepted > 0 {
            let fresh: Vec<_> = controller
                .notifications()
                .into_iter()
                .take(accepted)
                .collect();
            for record in fresh.into_iter().rev() {
                println!(
                    "* {}  {}  {}",
                    record.id,
                    controller.time_ago(&record.timestamp),
                    record.body.summary()
                );
            }
        }
        std::thread::sleep(Duration::from_millis(200));
    }
}
