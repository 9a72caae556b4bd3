use eframe::egui::{ColorImage, Image, Response, TextureHandle, TextureOptions, Ui, Widget};
use eframe::epaint::Color32;

use crate::render::{PixelSurface, Surface};

/// Waterfall display widget.
///
/// The pixel content is produced by the render pipeline into a
/// `PixelSurface`; this widget only converts it to a texture and draws it.
/// The `needs_gpu_upload` flag tracks whether the texture must be re-uploaded,
/// avoiding redundant uploads on frames without new rows.
pub struct Waterfall {
    image: ColorImage,
    needs_gpu_upload: bool,
    /// Cached texture handle to avoid re-uploading on every frame
    texture_handle: Option<TextureHandle>,
}

impl Waterfall {
    pub fn new() -> Self {
        Self {
            image: ColorImage::default(),
            needs_gpu_upload: false,
            texture_handle: None,
        }
    }

    /// Copy the rendered surface into the widget's image buffer.
    pub fn update_from(&mut self, surface: &PixelSurface) {
        let (width, height) = (surface.width(), surface.height());
        if width == 0 || height == 0 {
            return;
        }
        let pixels: Vec<Color32> = surface
            .pixels()
            .iter()
            .map(|&[r, g, b, a]| Color32::from_rgba_unmultiplied(r, g, b, a))
            .collect();
        self.image = ColorImage {
            size: [width, height],
            pixels,
        };
        self.needs_gpu_upload = true;
    }
}

impl Default for Waterfall {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for &mut Waterfall {
    fn ui(self, ui: &mut Ui) -> Response {
        if self.image.pixels.is_empty() {
            ui.label("Waiting for spectrum data...");
            return ui.response();
        }

        // Only upload the texture when new rows were painted
        if self.needs_gpu_upload {
            let texture =
                ui.ctx()
                    .load_texture("waterfall", self.image.clone(), TextureOptions::LINEAR);
            self.texture_handle = Some(texture);
            self.needs_gpu_upload = false;
        }

        if let Some(texture_handle) = &self.texture_handle {
            let available_size = ui.available_size();
            ui.add(Image::new(texture_handle).fit_to_exact_size(available_size));
        }

        ui.response()
    }
}
