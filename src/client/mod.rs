//! Streaming protocol client.
//!
//! Owns the transport link and the connection state machine, routes every
//! inbound message through the frame decoder, and publishes typed events to
//! subscribers. There is no automatic reconnect: retry is an explicit caller
//! action that starts a fresh attempt with `connect`.

mod transport;

use std::time::Duration;

use anyhow::Result;
use flume::{Receiver, Sender};

use crate::protocol::{self, DecodedFrame, DeviceStatus, SpectralRow, command};

pub use transport::{Transport, TransportEvent, WsTransport};

/// Connection lifecycle. Exactly one state is active at a time; transitions
/// are monotonic within a single attempt, and a fresh `connect` always
/// restarts at `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Neutral pre-connect condition; also the state after `disconnect`.
    Idle,
    Connecting,
    Connected,
    Failed,
    Closed,
}

/// Streaming parameters applied during the handshake.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub zoom: u32,
    pub window_start: u32,
    pub magnitude_floor_db: i32,
    pub magnitude_ceil_db: i32,
    pub rows_per_second: u32,
}

impl Default for ConnectParams {
    fn default() -> Self {
        Self {
            zoom: command::DEFAULT_ZOOM,
            window_start: command::DEFAULT_WINDOW_START,
            magnitude_floor_db: command::DEFAULT_FLOOR_DB,
            magnitude_ceil_db: command::DEFAULT_CEIL_DB,
            rows_per_second: command::DEFAULT_ROW_RATE,
        }
    }
}

/// Events published to subscribers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// One decoded waterfall row.
    SpectralRow(SpectralRow),
    /// Device status at the moment session setup completed.
    StatusSnapshot(DeviceStatus),
    /// Transport opened and the handshake was sent.
    Opened,
    /// The remote side closed the link.
    Closed,
    /// The link failed; retry by calling `connect` again.
    Failed(String),
}

/// Subscription filter, one per event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SpectralRow,
    StatusSnapshot,
    Opened,
    Closed,
    Failed,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::SpectralRow,
        EventKind::StatusSnapshot,
        EventKind::Opened,
        EventKind::Closed,
        EventKind::Failed,
    ];
}

impl ClientEvent {
    fn kind(&self) -> EventKind {
        match self {
            ClientEvent::SpectralRow(_) => EventKind::SpectralRow,
            ClientEvent::StatusSnapshot(_) => EventKind::StatusSnapshot,
            ClientEvent::Opened => EventKind::Opened,
            ClientEvent::Closed => EventKind::Closed,
            ClientEvent::Failed(_) => EventKind::Failed,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    kind: EventKind,
    tx: Sender<ClientEvent>,
}

/// Commands sent from the UI to the client thread.
#[derive(Debug)]
pub enum Command {
    Connect { url: String, params: ConnectParams },
    SetZoom { zoom: u32, start: u32 },
    SetMagnitudeRange { floor_db: i32, ceil_db: i32 },
    Disconnect,
    /// Stop the client thread entirely.
    Stop,
}

/// The protocol client. Generic over the transport so tests can drive the
/// state machine without a socket.
pub struct Client<T: Transport> {
    transport: T,
    state: ConnectionState,
    status: DeviceStatus,
    params: ConnectParams,
    ident: String,
    events: Option<Receiver<TransportEvent>>,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Idle,
            status: DeviceStatus::default(),
            params: ConnectParams::default(),
            ident: "spectrafall".to_string(),
            events: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    /// Register a sender for one event kind. Events are delivered in
    /// registration order; a receiver that has gone away is dropped without
    /// affecting delivery to the others.
    pub fn subscribe(&mut self, kind: EventKind, tx: Sender<ClientEvent>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push(Subscriber { id, kind, tx });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|s| s.id != id);
    }

    /// Open the transport and start a fresh connection attempt. Any existing
    /// link is torn down first.
    pub fn connect(&mut self, url: &str, params: ConnectParams) -> Result<()> {
        self.disconnect();
        self.params = params;
        match self.transport.open(url) {
            Ok(events) => {
                log::info!("connecting to {url}");
                self.events = Some(events);
                self.state = ConnectionState::Connecting;
                Ok(())
            }
            Err(e) => {
                self.fail(e.to_string());
                Err(e)
            }
        }
    }

    /// Update the zoom window. No-op unless connected.
    pub fn set_zoom(&mut self, zoom: u32, start: u32) {
        self.send_if_connected(command::zoom(zoom, start));
    }

    /// Update the magnitude color range. No-op unless connected.
    pub fn set_magnitude_range(&mut self, floor_db: i32, ceil_db: i32) {
        self.send_if_connected(command::magnitude_range(floor_db, ceil_db));
    }

    /// Close the link and return to the neutral pre-connect state. Idempotent;
    /// valid in every state, including mid-connect.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.events = None;
        self.status = DeviceStatus::default();
        self.state = ConnectionState::Idle;
    }

    /// Process every transport event queued so far. Non-blocking.
    pub fn pump(&mut self) {
        let Some(events) = self.events.clone() else {
            return;
        };
        while let Ok(event) = events.try_recv() {
            self.handle_transport_event(event);
            if self.events.is_none() {
                break;
            }
        }
    }

    /// Blocking command loop used by the binary: multiplexes UI commands with
    /// transport events until `Stop` or the command channel goes away.
    pub fn run(mut self, cmd_rx: Receiver<Command>) -> Result<()> {
        loop {
            self.pump();
            match cmd_rx.recv_timeout(Duration::from_millis(10)) {
                Ok(Command::Connect { url, params }) => {
                    // Failure is already published as a Failed event.
                    let _ = self.connect(&url, params);
                }
                Ok(Command::SetZoom { zoom, start }) => self.set_zoom(zoom, start),
                Ok(Command::SetMagnitudeRange { floor_db, ceil_db }) => {
                    self.set_magnitude_range(floor_db, ceil_db)
                }
                Ok(Command::Disconnect) => self.disconnect(),
                Ok(Command::Stop) | Err(flume::RecvTimeoutError::Disconnected) => {
                    self.disconnect();
                    return Ok(());
                }
                Err(flume::RecvTimeoutError::Timeout) => {}
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(raw) => self.on_message(&raw),
            TransportEvent::Closed => {
                if matches!(
                    self.state,
                    ConnectionState::Connecting | ConnectionState::Connected
                ) {
                    log::info!("connection closed by remote");
                    self.events = None;
                    self.state = ConnectionState::Closed;
                    self.publish(ClientEvent::Closed);
                }
            }
            TransportEvent::Error(reason) => self.fail(reason),
        }
    }

    /// Transport is up: send the handshake, in order, then go Connected.
    /// The device applies the commands sequentially, so the order is part of
    /// the external contract.
    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        let p = &self.params;
        let handshake = [
            command::auth(),
            command::zoom(p.zoom, p.window_start),
            command::magnitude_range(p.magnitude_floor_db, p.magnitude_ceil_db),
            command::row_rate(p.rows_per_second),
            command::no_compression(),
            command::ident(&self.ident),
        ];
        for cmd in handshake {
            if let Err(e) = self.transport.send(&cmd) {
                self.fail(e.to_string());
                return;
            }
        }
        log::info!("connected, handshake sent");
        self.state = ConnectionState::Connected;
        self.publish(ClientEvent::Opened);
    }

    fn on_message(&mut self, raw: &[u8]) {
        match protocol::decode(raw) {
            DecodedFrame::ControlText(text) => {
                if protocol::control::apply(&mut self.status, &text) {
                    self.publish(ClientEvent::StatusSnapshot(self.status.clone()));
                }
            }
            DecodedFrame::Spectral(row) => self.publish(ClientEvent::SpectralRow(row)),
            DecodedFrame::Ignored => {}
        }
    }

    fn send_if_connected(&mut self, cmd: String) {
        if self.state != ConnectionState::Connected {
            return;
        }
        if let Err(e) = self.transport.send(&cmd) {
            self.fail(e.to_string());
        }
    }

    fn fail(&mut self, reason: String) {
        // Terminal states stay terminal until a fresh connect.
        if matches!(self.state, ConnectionState::Failed | ConnectionState::Closed) {
            return;
        }
        log::warn!("connection failed: {reason}");
        self.transport.close();
        self.events = None;
        self.state = ConnectionState::Failed;
        self.publish(ClientEvent::Failed(reason));
    }

    fn publish(&mut self, event: ClientEvent) {
        let kind = event.kind();
        self.subscribers
            .retain(|s| s.kind != kind || s.tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Scripted transport: records sent text, lets tests inject events.
    struct FakeTransport {
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<u32>>,
        event_tx: Sender<TransportEvent>,
        event_rx: Receiver<TransportEvent>,
        fail_open: bool,
    }

    impl FakeTransport {
        fn new() -> Self {
            let (event_tx, event_rx) = flume::unbounded();
            Self {
                sent: Arc::new(Mutex::new(Vec::new())),
                closed: Arc::new(Mutex::new(0)),
                event_tx,
                event_rx,
                fail_open: false,
            }
        }
    }

    impl Transport for FakeTransport {
        fn open(&mut self, _url: &str) -> Result<Receiver<TransportEvent>> {
            if self.fail_open {
                anyhow::bail!("connection refused");
            }
            Ok(self.event_rx.clone())
        }

        fn send(&mut self, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() += 1;
        }
    }

    fn connected_client() -> (Client<FakeTransport>, Sender<TransportEvent>) {
        let transport = FakeTransport::new();
        let inject = transport.event_tx.clone();
        let mut client = Client::new(transport);
        client
            .connect("ws://device.test/waterfall", ConnectParams::default())
            .unwrap();
        inject.send(TransportEvent::Opened).unwrap();
        client.pump();
        assert_eq!(client.state(), ConnectionState::Connected);
        (client, inject)
    }

    fn spectral_frame(seq: u32, bins: &[u8]) -> Vec<u8> {
        let mut raw = vec![0x00, 0x00, 0x00];
        raw.extend_from_slice(&seq.to_be_bytes());
        raw.push(0x00);
        raw.extend_from_slice(bins);
        raw
    }

    #[test]
    fn connect_then_open_reaches_connected_and_sends_the_handshake() {
        let transport = FakeTransport::new();
        let sent = Arc::clone(&transport.sent);
        let inject = transport.event_tx.clone();
        let mut client = Client::new(transport);

        client
            .connect("ws://device.test/waterfall", ConnectParams::default())
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert!(sent.lock().unwrap().is_empty());

        inject.send(TransportEvent::Opened).unwrap();
        client.pump();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(
            *sent.lock().unwrap(),
            vec![
                "SET auth t=kiwi p=",
                "SET zoom=0 start=0",
                "SET maxdb=-10 mindb=-110",
                "SET wf_speed=4",
                "SET wf_comp=0",
                "SET ident_user=spectrafall",
            ]
        );
    }

    #[test]
    fn open_failure_goes_straight_to_failed() {
        let mut transport = FakeTransport::new();
        transport.fail_open = true;
        let mut client = Client::new(transport);
        let (tx, rx) = flume::unbounded();
        client.subscribe(EventKind::Failed, tx);

        assert!(
            client
                .connect("ws://device.test/waterfall", ConnectParams::default())
                .is_err()
        );
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::Failed(_))));
    }

    #[test]
    fn transport_error_is_terminal_until_reconnect() {
        let (mut client, inject) = connected_client();
        inject
            .send(TransportEvent::Error("reset by peer".to_string()))
            .unwrap();
        client.pump();
        assert_eq!(client.state(), ConnectionState::Failed);

        // A close arriving after the failure changes nothing.
        inject.send(TransportEvent::Closed).unwrap();
        client.pump();
        assert_eq!(client.state(), ConnectionState::Failed);

        // A fresh connect restarts the cycle.
        client
            .connect("ws://device.test/waterfall", ConnectParams::default())
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Connecting);
    }

    #[test]
    fn remote_close_transitions_to_closed() {
        let (mut client, inject) = connected_client();
        let (tx, rx) = flume::unbounded();
        client.subscribe(EventKind::Closed, tx);
        inject.send(TransportEvent::Closed).unwrap();
        client.pump();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::Closed)));
    }

    #[test]
    fn spectral_frames_become_row_events() {
        let (mut client, inject) = connected_client();
        let (tx, rx) = flume::unbounded();
        client.subscribe(EventKind::SpectralRow, tx);

        inject
            .send(TransportEvent::Message(spectral_frame(42, &[10, 20, 30])))
            .unwrap();
        client.pump();
        match rx.try_recv() {
            Ok(ClientEvent::SpectralRow(row)) => {
                assert_eq!(row.seq, 42);
                assert_eq!(row.bins, vec![10, 20, 30]);
            }
            other => panic!("expected a spectral row event, got {other:?}"),
        }
    }

    #[test]
    fn audio_init_publishes_one_status_snapshot() {
        let (mut client, inject) = connected_client();
        let (tx, rx) = flume::unbounded();
        client.subscribe(EventKind::StatusSnapshot, tx);

        inject
            .send(TransportEvent::Message(
                b"MSG center_freq=14200.5 audio_init=1".to_vec(),
            ))
            .unwrap();
        client.pump();
        match rx.try_recv() {
            Ok(ClientEvent::StatusSnapshot(status)) => {
                assert_eq!(status.center_freq, Some(14200.5));
                assert!(status.audio_ready);
            }
            other => panic!("expected a status snapshot, got {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "exactly one snapshot expected");
    }

    #[test]
    fn malformed_frames_produce_no_events_and_no_failure() {
        let (mut client, inject) = connected_client();
        let (tx, rx) = flume::unbounded();
        for kind in EventKind::ALL {
            client.subscribe(kind, tx.clone());
        }
        inject
            .send(TransportEvent::Message(vec![0x01, 0x02, 0x03]))
            .unwrap();
        client.pump();
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn zoom_and_range_updates_are_no_ops_unless_connected() {
        let transport = FakeTransport::new();
        let sent = Arc::clone(&transport.sent);
        let mut client = Client::new(transport);
        client.set_zoom(2, 100);
        client.set_magnitude_range(-100, -20);
        assert!(sent.lock().unwrap().is_empty());

        client
            .connect("ws://device.test/waterfall", ConnectParams::default())
            .unwrap();
        client.set_zoom(2, 100);
        assert!(sent.lock().unwrap().is_empty(), "still only connecting");
    }

    #[test]
    fn zoom_and_range_updates_go_out_while_connected() {
        let (mut client, _inject) = connected_client();
        let sent = Arc::clone(&client.transport.sent);
        sent.lock().unwrap().clear();
        client.set_zoom(5, 2048);
        client.set_magnitude_range(-90, -30);
        assert_eq!(*sent.lock().unwrap(), vec![
            "SET zoom=5 start=2048",
            "SET maxdb=-30 mindb=-90",
        ]);
    }

    #[test]
    fn disconnect_is_idempotent_and_neutral() {
        let (mut client, _inject) = connected_client();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(*client.status(), DeviceStatus::default());
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(*client.status(), DeviceStatus::default());
    }

    #[test]
    fn dead_subscribers_do_not_block_the_others() {
        let (mut client, inject) = connected_client();
        let (first_tx, first_rx) = flume::unbounded();
        let (second_tx, second_rx) = flume::unbounded();
        client.subscribe(EventKind::SpectralRow, first_tx);
        client.subscribe(EventKind::SpectralRow, second_tx);
        drop(first_rx);

        inject
            .send(TransportEvent::Message(spectral_frame(1, &[1, 2])))
            .unwrap();
        client.pump();
        assert!(matches!(
            second_rx.try_recv(),
            Ok(ClientEvent::SpectralRow(_))
        ));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut client, inject) = connected_client();
        let (tx, rx) = flume::unbounded();
        let id = client.subscribe(EventKind::SpectralRow, tx);
        client.unsubscribe(id);
        inject
            .send(TransportEvent::Message(spectral_frame(1, &[1, 2])))
            .unwrap();
        client.pump();
        assert!(rx.try_recv().is_err());
    }
}
