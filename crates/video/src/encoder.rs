//! Frame-Kodierung zu Data-URLs
//!
//! [`JpegEncoder`] komprimiert den Canvas-Inhalt mit libjpeg-turbo.
//! Tests koennen ueber [`FrameEncoder`] eigene Kodierer einsetzen.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::trace;
use turbojpeg::{Image, PixelFormat, Subsamp};

use crate::canvas::Canvas;
use crate::error::{VideoError, VideoResult};
use crate::frame::RGB_BPP;

/// MIME-Typ der gesendeten Bilder
pub const JPEG_MIME: &str = "image/jpeg";

/// Kodiert den Inhalt einer Zeichenflaeche als Data-URL
pub trait FrameEncoder: Send {
    /// `qualitaet` liegt in 0.0..=1.0
    fn kodieren(&mut self, canvas: &Canvas, qualitaet: f32) -> VideoResult<String>;
}

/// Baut `data:<mime>;base64,<payload>`
pub fn data_url(mime: &str, daten: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(daten))
}

/// JPEG-Kodierer ueber libjpeg-turbo
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegEncoder;

impl JpegEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Rohes JPEG ohne Data-URL-Huelle
    pub fn jpeg(&self, canvas: &Canvas, qualitaet: f32) -> VideoResult<Vec<u8>> {
        if canvas.breite() == 0 || canvas.hoehe() == 0 {
            return Err(VideoError::UngueltigeGroesse {
                breite: canvas.breite(),
                hoehe: canvas.hoehe(),
            });
        }
        let image = Image {
            pixels: canvas.pixel(),
            width: canvas.breite() as usize,
            pitch: canvas.breite() as usize * RGB_BPP,
            height: canvas.hoehe() as usize,
            format: PixelFormat::RGB,
        };
        let q = (qualitaet.clamp(0.0, 1.0) * 100.0).round() as i32;
        let buf = turbojpeg::compress(image, q, Subsamp::Sub2x2)
            .map_err(|e| VideoError::Kodierung(e.to_string()))?;
        Ok(buf.to_vec())
    }
}

impl FrameEncoder for JpegEncoder {
    fn kodieren(&mut self, canvas: &Canvas, qualitaet: f32) -> VideoResult<String> {
        let jpeg = self.jpeg(canvas, qualitaet)?;
        trace!(
            breite = canvas.breite(),
            hoehe = canvas.hoehe(),
            bytes = jpeg.len(),
            "Frame kodiert"
        );
        Ok(data_url(JPEG_MIME, &jpeg))
    }
}
