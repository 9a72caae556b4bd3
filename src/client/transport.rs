//! Transport abstraction over the device link.
//!
//! The client never touches a socket directly: a `Transport` hands back a
//! channel of lifecycle and traffic events when opened, and accepts text
//! writes while open. The production implementation is a blocking WebSocket
//! on a dedicated thread; tests substitute a fake that injects events.

use std::io;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use flume::{Receiver, Sender};
use tungstenite::Message;
use tungstenite::stream::MaybeTlsStream;

/// Connection lifecycle and inbound traffic as observed by the client.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The link is up and ready for the handshake.
    Opened,
    /// One inbound framed message, delivered as raw bytes.
    Message(Vec<u8>),
    /// The remote side closed the link.
    Closed,
    /// The link failed; the payload is a human-readable reason.
    Error(String),
}

/// One bidirectional device link. `open` may be called again after `close`
/// to start a fresh attempt.
pub trait Transport: Send {
    /// Open the link and return the event stream for this attempt.
    fn open(&mut self, url: &str) -> Result<Receiver<TransportEvent>>;
    /// Send one text message. Fails when the link is not open.
    fn send(&mut self, text: &str) -> Result<()>;
    /// Close the link. Safe to call when already closed.
    fn close(&mut self);
}

enum Outbound {
    Text(String),
    Shutdown,
}

/// Blocking WebSocket transport. The socket lives on its own thread, which
/// multiplexes outbound writes (via a channel) with timed reads.
pub struct WsTransport {
    outbound: Option<Sender<Outbound>>,
}

impl WsTransport {
    pub fn new() -> Self {
        Self { outbound: None }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WsTransport {
    fn open(&mut self, url: &str) -> Result<Receiver<TransportEvent>> {
        self.close();
        let (event_tx, event_rx) = flume::unbounded();
        let (out_tx, out_rx) = flume::unbounded();
        let url = url.to_string();
        thread::Builder::new()
            .name("ws-transport".to_string())
            .spawn(move || run_socket(&url, out_rx, event_tx))
            .context("failed to spawn transport thread")?;
        self.outbound = Some(out_tx);
        Ok(event_rx)
    }

    fn send(&mut self, text: &str) -> Result<()> {
        let tx = self
            .outbound
            .as_ref()
            .ok_or_else(|| anyhow!("transport is not open"))?;
        tx.send(Outbound::Text(text.to_string()))
            .map_err(|_| anyhow!("transport thread has exited"))
    }

    fn close(&mut self) {
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Outbound::Shutdown);
        }
    }
}

fn run_socket(url: &str, out_rx: Receiver<Outbound>, event_tx: Sender<TransportEvent>) {
    let (mut socket, _response) = match tungstenite::connect(url) {
        Ok(ok) => ok,
        Err(e) => {
            log::warn!("websocket connect failed: {e}");
            let _ = event_tx.send(TransportEvent::Error(e.to_string()));
            return;
        }
    };

    // A short read timeout lets the loop interleave reads with outbound
    // writes without a second thread fighting over the socket.
    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        let _ = stream.set_read_timeout(Some(Duration::from_millis(50)));
    }
    log::info!("websocket open: {url}");
    let _ = event_tx.send(TransportEvent::Opened);

    loop {
        match out_rx.try_recv() {
            Ok(Outbound::Text(text)) => {
                if let Err(e) = socket.send(Message::Text(text)) {
                    let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                    break;
                }
            }
            Ok(Outbound::Shutdown) | Err(flume::TryRecvError::Disconnected) => {
                let _ = socket.close(None);
                let _ = event_tx.send(TransportEvent::Closed);
                break;
            }
            Err(flume::TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Binary(data)) => {
                let _ = event_tx.send(TransportEvent::Message(data));
            }
            Ok(Message::Text(text)) => {
                // Some firmware sends control messages as text frames.
                let _ = event_tx.send(TransportEvent::Message(text.into_bytes()));
            }
            Ok(Message::Close(_)) => {
                let _ = event_tx.send(TransportEvent::Closed);
                break;
            }
            // Ping/pong are answered inside tungstenite.
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
            }
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => {
                let _ = event_tx.send(TransportEvent::Closed);
                break;
            }
            Err(e) => {
                log::warn!("websocket read failed: {e}");
                let _ = event_tx.send(TransportEvent::Error(e.to_string()));
                break;
            }
        }
    }
}
