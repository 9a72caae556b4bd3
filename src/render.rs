//! Scrolling spectrogram renderer.
//!
//! A fixed-cadence tick drains the frame buffer, shifts the existing raster
//! content down by the batch size, and paints the new rows at the top through
//! the color LUT. The surface is abstract so the pipeline is testable without
//! a real display; the eframe shell and the headless render loop both drive
//! the same `tick`.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, Sender};

use crate::buffer::FrameBuffer;
use crate::colormap::{ColorLut, Rgba};
use crate::protocol::SpectralRow;

/// Raster target for the waterfall. Row 0 is the top edge.
pub trait Surface {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Move existing content down by `rows`; whatever scrolls past the bottom
    /// edge is discarded.
    fn shift_down(&mut self, rows: usize);
    /// Overwrite the pixel row at `y`. `pixels` holds exactly `width` entries.
    fn write_row(&mut self, y: usize, pixels: &[Rgba]);
}

/// Owned RGBA raster, the concrete surface behind both the UI texture and
/// the headless tests.
pub struct PixelSurface {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl PixelSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0, 255]; width * height],
        }
    }

    /// Row-major RGBA pixel data, top row first.
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn row(&self, y: usize) -> &[Rgba] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

impl Surface for PixelSurface {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn shift_down(&mut self, rows: usize) {
        let rows = rows.min(self.height);
        if rows == 0 {
            return;
        }
        let offset = rows * self.width;
        let len = self.pixels.len();
        self.pixels.copy_within(..len - offset, offset);
    }

    fn write_row(&mut self, y: usize, pixels: &[Rgba]) {
        let start = y * self.width;
        self.pixels[start..start + self.width].copy_from_slice(&pixels[..self.width]);
    }
}

/// Drains the frame buffer once per tick and paints it onto a surface.
pub struct RenderPipeline {
    buffer: Arc<FrameBuffer>,
    lut: Arc<ColorLut>,
}

impl RenderPipeline {
    pub fn new(buffer: Arc<FrameBuffer>, lut: Arc<ColorLut>) -> Self {
        Self { buffer, lut }
    }

    /// One refresh tick. A no-op when nothing is buffered or the surface has
    /// no area (detached output); rows stay queued until a usable surface is
    /// back.
    pub fn tick(&self, surface: &mut dyn Surface) {
        let width = surface.width();
        let height = surface.height();
        if width == 0 || height == 0 {
            return;
        }
        let mut batch = self.buffer.drain_all();
        batch.retain(|row| !row.bins.is_empty());
        if batch.is_empty() {
            return;
        }

        // Rows beyond the surface height would scroll straight off-screen;
        // keep only the most recent `height`.
        if batch.len() > height {
            let skip = batch.len() - height;
            batch.drain(..skip);
        }

        surface.shift_down(batch.len());
        // Oldest row of the batch lands lowest so time still flows downward.
        let count = batch.len();
        for (i, row) in batch.iter().enumerate() {
            let scanline = self.scanline(row, width);
            surface.write_row(count - 1 - i, &scanline);
        }
    }

    /// Map one spectral row onto `width` pixels by nearest-neighbor index
    /// scaling. Widths that do not divide the bin count alias slightly;
    /// accepted, not corrected.
    fn scanline(&self, row: &SpectralRow, width: usize) -> Vec<Rgba> {
        let bins = &row.bins;
        (0..width)
            .map(|x| self.lut.color(bins[x * bins.len() / width]))
            .collect()
    }
}

/// Fixed-cadence render thread with a synchronous stop handle.
pub struct RenderLoop {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl RenderLoop {
    /// Spawn a thread that ticks `pipeline` against `surface` once per
    /// `period` until stopped.
    pub fn spawn<S>(pipeline: RenderPipeline, surface: Arc<Mutex<S>>, period: Duration) -> Self
    where
        S: Surface + Send + 'static,
    {
        let (stop_tx, stop_rx): (Sender<()>, Receiver<()>) = flume::bounded(1);
        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(period) {
                    Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
                    Err(flume::RecvTimeoutError::Timeout) => {
                        let mut surface =
                            surface.lock().unwrap_or_else(PoisonError::into_inner);
                        pipeline.tick(&mut *surface);
                    }
                }
            }
        });
        Self { stop_tx, handle }
    }

    /// Stop the loop and wait for the thread to exit. A tick scheduled after
    /// this returns can no longer fire.
    pub fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.join();
    }
}
