// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// QR encoder — turns a payload string into a grayscale raster of the symbol
// using the `qrcode` crate for module layout and `imageproc` for drawing.

use image::{GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect as PixelRect;
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};
use qrplace_core::config::{ErrorCorrection, PlacementConfig};
use qrplace_core::error::QrPlaceError;
use tracing::{debug, instrument};

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// A rendered QR symbol, quiet zone included.
#[derive(Debug, Clone)]
pub struct QrSymbol {
    /// Modules per side, quiet zone included.
    pub modules: u32,
    /// One `box_size`-pixel square per module, black on white.
    pub image: GrayImage,
}

impl QrSymbol {
    pub fn width_px(&self) -> u32 {
        self.image.width()
    }

    /// Size of one module in points when the symbol is drawn `side` points wide.
    pub fn module_pitch(&self, side: f64) -> f64 {
        side / f64::from(self.modules)
    }
}

/// Encodes payloads into QR rasters.
#[derive(Debug, Clone, Copy)]
pub struct QrEncoder {
    level: EcLevel,
    box_size: u32,
    quiet_zone: u32,
}

impl QrEncoder {
    pub fn new(level: ErrorCorrection, box_size: u32, quiet_zone: u32) -> Self {
        let level = match level {
            ErrorCorrection::L => EcLevel::L,
            ErrorCorrection::M => EcLevel::M,
            ErrorCorrection::Q => EcLevel::Q,
            ErrorCorrection::H => EcLevel::H,
        };
        Self {
            level,
            box_size: box_size.max(1),
            quiet_zone,
        }
    }

    pub fn from_config(config: &PlacementConfig) -> Self {
        Self::new(config.error_correction, config.qr_box_size, config.qr_quiet_zone)
    }

    /// Encode `data` into a symbol.
    ///
    /// Fails with `EncodingFailure` for an empty payload or one that exceeds
    /// the capacity of the largest QR version at the configured level.
    #[instrument(skip_all, fields(data_len = data.len(), level = ?self.level))]
    pub fn encode(&self, data: &str) -> Result<QrSymbol, QrPlaceError> {
        if data.is_empty() {
            return Err(QrPlaceError::EncodingFailure(
                "QR payload is empty".to_string(),
            ));
        }

        let code = QrCode::with_error_correction_level(data.as_bytes(), self.level).map_err(
            |err| match err {
                QrError::DataTooLong => QrPlaceError::EncodingFailure(format!(
                    "payload of {} bytes exceeds QR capacity at error-correction level {:?}",
                    data.len(),
                    self.level
                )),
                other => QrPlaceError::EncodingFailure(format!("QR encoding failed: {other}")),
            },
        )?;

        let symbol_width = code.width() as u32;
        let modules = symbol_width + 2 * self.quiet_zone;
        let side = modules * self.box_size;
        let mut image = GrayImage::from_pixel(side, side, LIGHT);

        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }
            let col = index as u32 % symbol_width;
            let row = index as u32 / symbol_width;
            let x = (col + self.quiet_zone) * self.box_size;
            let y = (row + self.quiet_zone) * self.box_size;
            draw_filled_rect_mut(
                &mut image,
                PixelRect::at(x as i32, y as i32).of_size(self.box_size, self.box_size),
                DARK,
            );
        }

        debug!(
            version = ?code.version(),
            modules,
            pixels = side,
            "QR symbol rendered"
        );
        Ok(QrSymbol { modules, image })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> QrEncoder {
        QrEncoder::new(ErrorCorrection::H, 4, 1)
    }

    #[test]
    fn short_url_encodes() {
        let symbol = encoder().encode("https://verify.example/c/123").unwrap();
        // Version 1 is 21 modules; one quiet module on each side.
        assert!(symbol.modules >= 23);
        assert_eq!(symbol.width_px(), symbol.modules * 4);
    }

    #[test]
    fn quiet_zone_is_white_and_finder_is_dark() {
        let symbol = encoder().encode("abc").unwrap();
        assert_eq!(symbol.image.get_pixel(0, 0), &LIGHT);
        // Top-left finder pattern starts right after the quiet zone.
        assert_eq!(symbol.image.get_pixel(4, 4), &DARK);
    }

    #[test]
    fn empty_payload_is_rejected() {
        let err = encoder().encode("").unwrap_err();
        assert!(matches!(err, QrPlaceError::EncodingFailure(_)));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let data = "x".repeat(4000);
        let err = encoder().encode(&data).unwrap_err();
        match err {
            QrPlaceError::EncodingFailure(message) => assert!(message.contains("4000 bytes")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn module_pitch_scales_with_side() {
        let symbol = encoder().encode("abc").unwrap();
        let pitch = symbol.module_pitch(f64::from(symbol.modules) * 2.0);
        assert!((pitch - 2.0).abs() < 1e-9);
    }
}
