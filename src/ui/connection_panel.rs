use eframe::egui::{DragValue, Response, TextEdit, Ui, Widget};
use flume::Sender;

use crate::client::{Command, ConnectParams};

/// Connection status as the shell last observed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkStatus {
    Idle,
    Connecting,
    Connected,
    Closed,
    Failed,
}

impl LinkStatus {
    fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Closed => "Closed",
            Self::Failed => "Failed",
        }
    }
}

/// Side panel for the connection lifecycle and streaming parameters.
///
/// Retry after a failure is deliberately manual: the client never reconnects
/// on its own, so the Connect button is the caller-provided retry action.
pub struct ConnectionPanel {
    cmd_tx: Sender<Command>,
    url: String,
    pending: ConnectParams,
    has_pending_changes: bool,
    disconnect_requested: bool,
    pub status: LinkStatus,
    pub last_error: Option<String>,
}

impl ConnectionPanel {
    pub fn new(cmd_tx: Sender<Command>, url: String) -> Self {
        Self {
            cmd_tx,
            url,
            pending: ConnectParams::default(),
            has_pending_changes: false,
            disconnect_requested: false,
            status: LinkStatus::Idle,
            last_error: None,
        }
    }

    /// True once per Disconnect click. The shell drops everything queued for
    /// paint when it sees this, so a later connect starts clean.
    pub fn take_disconnect_request(&mut self) -> bool {
        std::mem::take(&mut self.disconnect_requested)
    }

    fn send_connect(&self) {
        let _ = self.cmd_tx.send(Command::Connect {
            url: self.url.clone(),
            params: self.pending.clone(),
        });
    }

    fn send_updates(&self) {
        let _ = self.cmd_tx.send(Command::SetZoom {
            zoom: self.pending.zoom,
            start: self.pending.window_start,
        });
        let _ = self.cmd_tx.send(Command::SetMagnitudeRange {
            floor_db: self.pending.magnitude_floor_db,
            ceil_db: self.pending.magnitude_ceil_db,
        });
    }
}

impl Widget for &mut ConnectionPanel {
    fn ui(self, ui: &mut Ui) -> Response {
        ui.heading("Receiver");
        ui.separator();

        ui.label(format!("Status: {}", self.status.label()));
        if let Some(error) = &self.last_error {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }
        ui.add_space(10.0);

        let editable = self.status != LinkStatus::Connecting;
        ui.add_enabled_ui(editable, |ui| {
            ui.horizontal(|ui| {
                ui.label("URL:");
                ui.add(TextEdit::singleline(&mut self.url).hint_text("ws://host:8073/waterfall"));
            });
        });

        ui.horizontal(|ui| {
            ui.label("Zoom:");
            if ui
                .add(DragValue::new(&mut self.pending.zoom).range(0..=14))
                .changed()
            {
                self.has_pending_changes = true;
            }
            ui.label("Start:");
            if ui
                .add(DragValue::new(&mut self.pending.window_start).speed(16))
                .changed()
            {
                self.has_pending_changes = true;
            }
        });

        ui.horizontal(|ui| {
            ui.label("Floor:");
            if ui
                .add(
                    DragValue::new(&mut self.pending.magnitude_floor_db)
                        .range(-160..=-30)
                        .suffix(" dB"),
                )
                .changed()
            {
                self.has_pending_changes = true;
            }
            ui.label("Ceil:");
            if ui
                .add(
                    DragValue::new(&mut self.pending.magnitude_ceil_db)
                        .range(-60..=0)
                        .suffix(" dB"),
                )
                .changed()
            {
                self.has_pending_changes = true;
            }
        });

        ui.add_space(10.0);
        ui.separator();

        ui.horizontal(|ui| {
            match self.status {
                LinkStatus::Connected | LinkStatus::Connecting => {
                    if ui.button("Disconnect").clicked() {
                        let _ = self.cmd_tx.send(Command::Disconnect);
                        self.disconnect_requested = true;
                        self.status = LinkStatus::Idle;
                        self.last_error = None;
                    }
                }
                LinkStatus::Idle | LinkStatus::Closed | LinkStatus::Failed => {
                    let label = if self.status == LinkStatus::Failed {
                        "Retry"
                    } else {
                        "Connect"
                    };
                    if ui.button(label).clicked() {
                        self.send_connect();
                        self.status = LinkStatus::Connecting;
                        self.last_error = None;
                    }
                }
            }

            let can_apply = self.has_pending_changes && self.status == LinkStatus::Connected;
            ui.add_enabled_ui(can_apply, |ui| {
                if ui.button("Apply").clicked() {
                    self.send_updates();
                    self.has_pending_changes = false;
                }
            });
        });

        ui.response()
    }
}
