mod connection_panel;
mod state;
mod waterfall;

use crate::client::{ClientEvent, Command};
use state::UiState;

/// Main application struct implementing the egui App trait.
pub struct SpectrafallApp {
    /// Receiver for events from the protocol client
    event_rx: flume::Receiver<ClientEvent>,

    /// Local application state
    state: UiState,
}

impl SpectrafallApp {
    fn new(event_rx: flume::Receiver<ClientEvent>, cmd_tx: flume::Sender<Command>, url: String) -> Self {
        Self {
            event_rx,
            state: UiState::new(cmd_tx, url),
        }
    }
}

impl eframe::App for SpectrafallApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        // 1. Process all pending client events (non-blocking)
        while let Ok(event) = self.event_rx.try_recv() {
            self.state.handle_event(event);
        }

        // 2. Drain the frame buffer onto the raster, once per refresh
        self.state.render_tick();

        // 3. Request continuous repaint (for streaming data)
        ctx.request_repaint();

        // Right side panel for the connection controls
        eframe::egui::SidePanel::right("connection_panel")
            .default_width(250.0)
            .show(ctx, |ui| {
                ui.add(&mut self.state.connection_panel);
                if let Some(status) = &self.state.device_status {
                    ui.separator();
                    if let Some(freq) = status.center_freq {
                        ui.label(format!("Center: {freq} kHz"));
                    }
                    if let Some(rate) = status.sample_rate {
                        ui.label(format!("Rate: {rate} Hz"));
                    }
                    if let Some(bins) = status.fft_size {
                        ui.label(format!("Bins: {bins}"));
                    }
                }
            });

        // A Disconnect click drops everything queued for paint
        if self.state.connection_panel.take_disconnect_request() {
            self.state.on_disconnect();
        }

        // Central panel for the waterfall
        eframe::egui::CentralPanel::default().show(ctx, |ui| {
            ui.add(&mut self.state.waterfall);
        });
    }
}

/// Entry point for the UI module.
///
/// Runs the eframe application on the main thread (blocking).
pub fn run(
    event_rx: flume::Receiver<ClientEvent>,
    cmd_tx: flume::Sender<Command>,
    url: String,
) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 768.0])
            .with_title("Spectrafall"),
        ..Default::default()
    };

    eframe::run_native(
        "Spectrafall",
        options,
        Box::new(|_cc| Ok(Box::new(SpectrafallApp::new(event_rx, cmd_tx, url)))),
    )
    .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
