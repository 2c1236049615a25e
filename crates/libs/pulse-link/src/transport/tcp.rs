use crate::error::LinkError;
use crate::event::ChannelEvent;
use crate::message::ClientMessage;
use crate::transport::ChannelTransport;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const BACKOFF_SLICE: Duration = Duration::from_millis(50);

/// Line-delimited JSON over TCP. A reader thread owns the dial/redial loop
/// and feeds parsed events into a queue drained by `poll_event`; every
/// successful dial surfaces a fresh `Connected`, every lost session a
/// `Disconnected`.
pub struct TcpChannel {
    addr: String,
    connect_timeout: Duration,
    retry_delay: Duration,
    queue: Arc<Mutex<VecDeque<ChannelEvent>>>,
    writer: Arc<Mutex<Option<TcpStream>>>,
    shutdown: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl TcpChannel {
    pub fn new(addr: impl Into<String>) -> Self {
        Self::new_with_timeouts(addr, Duration::from_secs(3), Duration::from_secs(1))
    }

    pub fn new_with_timeouts(
        addr: impl Into<String>,
        connect_timeout: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            retry_delay,
            queue: Arc::new(Mutex::new(VecDeque::new())),
            writer: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(false)),
            reader: None,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl ChannelTransport for TcpChannel {
    fn connect(&mut self) -> Result<(), LinkError> {
        if self.reader.is_some() {
            return Err(LinkError::InvalidState("channel already connected"));
        }
        self.shutdown.store(false, Ordering::SeqCst);
        self.queue.lock().expect("event queue mutex poisoned").clear();
        let addr = self.addr.clone();
        let connect_timeout = self.connect_timeout;
        let retry_delay = self.retry_delay;
        let queue = Arc::clone(&self.queue);
        let writer = Arc::clone(&self.writer);
        let shutdown = Arc::clone(&self.shutdown);
        self.reader = Some(std::thread::spawn(move || {
            run_reader(&addr, connect_timeout, retry_delay, &queue, &writer, &shutdown);
        }));
        Ok(())
    }

    fn send(&mut self, message: &ClientMessage) -> Result<(), LinkError> {
        let frame = message.to_frame()?;
        let mut guard = self.writer.lock().expect("writer mutex poisoned");
        let Some(stream) = guard.as_mut() else {
            return Err(LinkError::InvalidState("channel not connected"));
        };
        stream
            .write_all(frame.as_bytes())
            .and_then(|()| stream.write_all(b"\n"))
            .map_err(|e| LinkError::Io(e.to_string()))
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        if self.shutdown.load(Ordering::SeqCst) {
            return None;
        }
        self.queue.lock().expect("event queue mutex poisoned").pop_front()
    }

    fn close(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(stream) = self.writer.lock().expect("writer mutex poisoned").take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.queue.lock().expect("event queue mutex poisoned").clear();
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_reader(
    addr: &str,
    connect_timeout: Duration,
    retry_delay: Duration,
    queue: &Arc<Mutex<VecDeque<ChannelEvent>>>,
    writer: &Arc<Mutex<Option<TcpStream>>>,
    shutdown: &Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match dial(addr, connect_timeout) {
            Ok(stream) => {
                let session = match stream.try_clone() {
                    Ok(session) => session,
                    Err(err) => {
                        log::warn!("channel socket clone failed: {err}");
                        backoff(retry_delay, shutdown);
                        continue;
                    }
                };
                *writer.lock().expect("writer mutex poisoned") = Some(stream);
                push(queue, shutdown, ChannelEvent::Connected);

                for line in BufReader::new(session).lines() {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    match line {
                        Ok(line) if line.trim().is_empty() => continue,
                        Ok(line) => {
                            if let Some(event) = ChannelEvent::parse_frame(&line) {
                                push(queue, shutdown, event);
                            }
                        }
                        Err(err) => {
                            log::warn!("channel read failed: {err}");
                            break;
                        }
                    }
                }

                writer.lock().expect("writer mutex poisoned").take();
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                push(queue, shutdown, ChannelEvent::Disconnected);
            }
            Err(err) => {
                log::warn!("channel dial {addr} failed: {err}");
            }
        }
        backoff(retry_delay, shutdown);
    }
}

fn dial(addr: &str, timeout: Duration) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for candidate in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "address resolved to nothing")
    }))
}

fn push(
    queue: &Arc<Mutex<VecDeque<ChannelEvent>>>,
    shutdown: &Arc<AtomicBool>,
    event: ChannelEvent,
) {
    if shutdown.load(Ordering::SeqCst) {
        return;
    }
    queue.lock().expect("event queue mutex poisoned").push_back(event);
}

fn backoff(delay: Duration, shutdown: &Arc<AtomicBool>) {
    let deadline = Instant::now() + delay;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(BACKOFF_SLICE.min(remaining));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn connect_twice_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut channel = TcpChannel::new(&addr);
        channel.connect().unwrap();
        assert!(matches!(channel.connect(), Err(LinkError::InvalidState(_))));
        channel.close();
    }

    #[test]
    fn events_flow_and_close_discards_the_queue() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let mut channel =
            TcpChannel::new_with_timeouts(&addr, Duration::from_secs(3), Duration::from_millis(50));
        channel.connect().unwrap();

        let (mut server_side, _) = listener.accept().unwrap();
        server_side
            .write_all(b"{\"type\":\"notification\",\"id\":\"n1\"}\n")
            .unwrap();
        server_side.flush().unwrap();

        let mut events = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while events.len() < 2 && Instant::now() < deadline {
            if let Some(event) = channel.poll_event() {
                events.push(event);
            } else {
                std::thread::sleep(Duration::from_millis(10));
            }
        }
        assert_eq!(events[0], ChannelEvent::Connected);
        assert_eq!(
            events[1],
            ChannelEvent::Notification(serde_json::json!({ "id": "n1" }))
        );

        channel.close();
        assert!(channel.poll_event().is_none());
    }

    #[test]
    fn send_before_session_is_up_is_an_invalid_state() {
        let mut channel = TcpChannel::new("127.0.0.1:1");
        let err = channel.send(&ClientMessage::join_room("b1")).unwrap_err();
        assert!(matches!(err, LinkError::InvalidState(_)));
    }
}
