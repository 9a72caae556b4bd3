use std::sync::Arc;

use flume::Sender;

use crate::buffer::FrameBuffer;
use crate::client::{ClientEvent, Command};
use crate::colormap::build_color_lut;
use crate::protocol::DeviceStatus;
use crate::render::{PixelSurface, RenderPipeline};
use crate::ui::connection_panel::{ConnectionPanel, LinkStatus};
use crate::ui::waterfall::Waterfall;

/// Default raster size. Widths that do not divide the device's bin count
/// alias slightly; accepted.
const SURFACE_WIDTH: usize = 1024;
const SURFACE_HEIGHT: usize = 512;

/// Local UI state derived from client events.
pub(super) struct UiState {
    /// Shared row queue between the client subscription and the renderer
    pub buffer: Arc<FrameBuffer>,

    /// Drains the buffer onto the surface once per repaint
    pub pipeline: RenderPipeline,

    /// Raster the pipeline paints into
    pub surface: PixelSurface,

    /// Waterfall widget state
    pub waterfall: Waterfall,

    /// Connection panel widget state
    pub connection_panel: ConnectionPanel,

    /// Latest device status snapshot (from StatusSnapshot)
    pub device_status: Option<DeviceStatus>,
}

impl UiState {
    pub fn new(cmd_tx: Sender<Command>, url: String) -> Self {
        let buffer = Arc::new(FrameBuffer::new());
        let lut = Arc::new(build_color_lut());
        let pipeline = RenderPipeline::new(Arc::clone(&buffer), lut);
        Self {
            buffer,
            pipeline,
            surface: PixelSurface::new(SURFACE_WIDTH, SURFACE_HEIGHT),
            waterfall: Waterfall::new(),
            connection_panel: ConnectionPanel::new(cmd_tx, url),
            device_status: None,
        }
    }

    pub fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::SpectralRow(row) => {
                // Rows still in flight after a disconnect are stale.
                if self.connection_panel.status == LinkStatus::Connected {
                    self.buffer.push(row);
                }
            }
            ClientEvent::StatusSnapshot(status) => {
                self.device_status = Some(status);
            }
            ClientEvent::Opened => {
                self.connection_panel.status = LinkStatus::Connected;
                self.connection_panel.last_error = None;
            }
            ClientEvent::Closed => {
                self.connection_panel.status = LinkStatus::Closed;
                self.buffer.clear();
            }
            ClientEvent::Failed(reason) => {
                self.connection_panel.status = LinkStatus::Failed;
                self.connection_panel.last_error = Some(reason);
                self.buffer.clear();
            }
        }
    }

    /// Caller-initiated disconnect: empty the frame buffer so the next
    /// connect starts from a clean raster feed. Ticks that fire afterwards
    /// see an empty buffer and do nothing.
    pub fn on_disconnect(&mut self) {
        self.buffer.clear();
        self.device_status = None;
    }

    /// One display-refresh tick: drain whatever the client produced and
    /// repaint the widget if anything changed.
    pub fn render_tick(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        self.pipeline.tick(&mut self.surface);
        self.waterfall.update_from(&self.surface);
    }
}
