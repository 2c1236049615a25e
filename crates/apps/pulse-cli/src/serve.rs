use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// One broadcast entry: the target room (brand), or `None` for everyone.
type Fanout = (Option<String>, Value);

/// Development-only counterpart of the production push server: accepts
/// line-delimited JSON clients, understands `register` and `join-room`,
/// and fans any `notify` frame out as a `notification` to the matching
/// room.
pub fn serve(bind: &str) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(serve_async(bind))
}

async fn serve_async(bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    println!("pulse dev server listening on {bind}");

    let (fanout, _) = broadcast::channel::<Fanout>(64);
    loop {
        let (socket, peer) = listener.accept().await.context("accept failed")?;
        log::debug!("client connected from {peer}");
        let fanout = fanout.clone();
        tokio::spawn(async move {
            handle_client(socket, fanout).await;
            log::debug!("client from {peer} disconnected");
        });
    }
}

async fn handle_client(socket: TcpStream, fanout: broadcast::Sender<Fanout>) {
    let (read_half, mut write_half) = socket.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let mut inbox = fanout.subscribe();
    let mut room: Option<String> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        let Ok(frame) = serde_json::from_str::<Value>(&line) else {
                            log::warn!("dropping malformed client frame");
                            continue;
                        };
                        handle_frame(frame, &mut room, &fanout);
                    }
                    Ok(None) => break,
                    Err(err) => {
                        log::debug!("client read failed: {err}");
                        break;
                    }
                }
            }
            entry = inbox.recv() => {
                match entry {
                    Ok((target, payload)) => {
                        if target.is_none() || target == room {
                            if deliver(&mut write_half, &payload).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log::warn!("client lagged, skipped {skipped} notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

fn handle_frame(frame: Value, room: &mut Option<String>, fanout: &broadcast::Sender<Fanout>) {
    match frame.get("type").and_then(Value::as_str) {
        Some("register") => {
            let user = frame.get("userId").and_then(Value::as_str).unwrap_or("?");
            log::info!("registered {user}");
        }
        Some("join-room") => {
            *room = frame.get("brandId").and_then(Value::as_str).map(str::to_string);
            log::info!("client joined room {room:?}");
        }
        Some("notify") => {
            let target = frame.get("brandId").and_then(Value::as_str).map(str::to_string);
            let mut payload = frame;
            if let Value::Object(fields) = &mut payload {
                fields.insert("type".to_string(), json!("notification"));
            }
            let _ = fanout.send((target, payload));
        }
        other => log::debug!("ignoring client frame of type {other:?}"),
    }
}

async fn deliver(writer: &mut OwnedWriteHalf, payload: &Value) -> std::io::Result<()> {
    let mut line = payload.to_string();
    line.push('\n');
    writer.write_all(line.as_bytes()).await
}
