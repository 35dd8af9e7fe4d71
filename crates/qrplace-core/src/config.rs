// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service and placement configuration.
//
// The placement pipeline never reads ambient state: callers pass a
// `PlacementConfig` explicitly. Only the server binary reads the environment,
// through `ServiceConfig::from_env`.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{QrPlaceError, Result};

/// Marker searched for when the caller does not supply one.
pub const DEFAULT_MARKER: &str = "[[SIGN_HERE]]";

/// Largest accepted raster size of one QR module, in pixels.
pub const MAX_QR_BOX_SIZE: u32 = 64;

/// Largest accepted quiet zone, in modules.
pub const MAX_QR_QUIET_ZONE: u32 = 16;

/// QR error-correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    L,
    M,
    Q,
    H,
}

/// Tuning knobs for marker placement, region search, and compositing.
/// Lengths are in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Minimum width and height of a placement region.
    pub min_region_size: f64,
    /// Smallest QR side that is still considered scannable.
    pub min_qr_size: f64,
    /// Largest QR side ever drawn, however large the region.
    pub max_qr_size: f64,
    /// Fraction of the region's shorter side used for the QR.
    pub qr_scale: f64,
    /// Padding added around a matched marker's box.
    pub marker_padding: f64,
    /// Distance kept free between a region and the page edge.
    pub page_margin: f64,
    /// Side of one cell of the occupancy grid.
    pub grid_cell_size: f64,
    /// Smallest printed size of one QR module.
    pub min_module_size: f64,
    /// Raster pixels per QR module in the embedded image.
    pub qr_box_size: u32,
    /// Quiet-zone width around the symbol, in modules.
    pub qr_quiet_zone: u32,
    pub error_correction: ErrorCorrection,
    /// First caption line, shown above the certificate identifier.
    pub caption_title: String,
    pub caption_title_font_size: f64,
    pub caption_font_size: f64,
    /// Gap between the QR square and its caption.
    pub caption_gap: f64,
    pub caption_max_lines: usize,
    /// Paint the marker text white before stamping over it.
    pub cover_marker: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_region_size: 96.0,
            min_qr_size: 48.0,
            max_qr_size: 96.0,
            qr_scale: 0.85,
            marker_padding: 4.0,
            page_margin: 10.0,
            grid_cell_size: 8.0,
            min_module_size: 0.6,
            qr_box_size: 8,
            qr_quiet_zone: 1,
            error_correction: ErrorCorrection::H,
            caption_title: "Verified Document".into(),
            caption_title_font_size: 7.0,
            caption_font_size: 6.0,
            caption_gap: 2.0,
            caption_max_lines: 4,
            cover_marker: true,
        }
    }
}

impl PlacementConfig {
    /// Check internal consistency. Called once at startup by the server and
    /// at the top of every pipeline entry point.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("min_region_size", self.min_region_size),
            ("min_qr_size", self.min_qr_size),
            ("max_qr_size", self.max_qr_size),
            ("grid_cell_size", self.grid_cell_size),
            ("min_module_size", self.min_module_size),
            ("caption_font_size", self.caption_font_size),
            ("caption_title_font_size", self.caption_title_font_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(QrPlaceError::InvalidConfig(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }
        for (name, value) in [
            ("marker_padding", self.marker_padding),
            ("page_margin", self.page_margin),
            ("caption_gap", self.caption_gap),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(QrPlaceError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        if !(self.qr_scale > 0.0 && self.qr_scale <= 1.0) {
            return Err(QrPlaceError::InvalidConfig(format!(
                "qr_scale must be in (0, 1], got {}",
                self.qr_scale
            )));
        }
        if self.max_qr_size < self.min_qr_size {
            return Err(QrPlaceError::InvalidConfig(format!(
                "max_qr_size ({}) is below min_qr_size ({})",
                self.max_qr_size, self.min_qr_size
            )));
        }
        if self.min_region_size < self.min_qr_size {
            return Err(QrPlaceError::InvalidConfig(format!(
                "min_region_size ({}) is below min_qr_size ({})",
                self.min_region_size, self.min_qr_size
            )));
        }
        if self.grid_cell_size < 1.0 {
            return Err(QrPlaceError::InvalidConfig(format!(
                "grid_cell_size must be at least 1pt, got {}",
                self.grid_cell_size
            )));
        }
        if self.qr_box_size == 0 || self.qr_box_size > MAX_QR_BOX_SIZE {
            return Err(QrPlaceError::InvalidConfig(format!(
                "qr_box_size must be between 1 and {MAX_QR_BOX_SIZE} pixels, got {}",
                self.qr_box_size
            )));
        }
        if self.qr_quiet_zone > MAX_QR_QUIET_ZONE {
            return Err(QrPlaceError::InvalidConfig(format!(
                "qr_quiet_zone must be at most {MAX_QR_QUIET_ZONE} modules, got {}",
                self.qr_quiet_zone
            )));
        }
        if self.caption_max_lines == 0 {
            return Err(QrPlaceError::InvalidConfig(
                "caption_max_lines must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Cross-origin settings for the HTTP layer. `*` entries mean "any".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: vec!["*".into()],
            allow_credentials: true,
        }
    }
}

/// Settings for the HTTP service binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted request body.
    pub max_upload_bytes: usize,
    /// Marker used when a request omits one.
    pub default_marker: String,
    pub cors: CorsConfig,
    pub placement: PlacementConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            max_upload_bytes: 64 * 1024 * 1024,
            default_marker: DEFAULT_MARKER.into(),
            cors: CorsConfig::default(),
            placement: PlacementConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from the process environment, reading a `.env`
    /// file first when one exists.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            info!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// `QRPLACE_CONFIG` names a JSON file holding a full or partial
    /// `ServiceConfig`; individual variables override it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup("QRPLACE_CONFIG") {
            Some(path) if !path.trim().is_empty() => Self::from_json_file(path.trim())?,
            _ => Self::default(),
        };

        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port.trim().parse().map_err(|err| {
                QrPlaceError::InvalidConfig(format!("PORT '{port}' is not a valid port: {err}"))
            })?;
        }
        if let Some(limit) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = limit.trim().parse().map_err(|err| {
                QrPlaceError::InvalidConfig(format!(
                    "MAX_UPLOAD_BYTES '{limit}' is not a byte count: {err}"
                ))
            })?;
        }
        if let Some(marker) = lookup("DEFAULT_MARKER") {
            config.default_marker = marker;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            config.cors.allowed_origins = split_list(&origins);
        }
        if let Some(methods) = lookup("ALLOWED_METHODS") {
            config.cors.allowed_methods = split_list(&methods);
        }
        if let Some(headers) = lookup("ALLOWED_HEADERS") {
            config.cors.allowed_headers = split_list(&headers);
        }
        if let Some(credentials) = lookup("ALLOW_CREDENTIALS") {
            config.cors.allow_credentials = credentials.trim().eq_ignore_ascii_case("true");
        }

        config.validate()?;
        debug!(?config, "Service configuration resolved");
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Reading configuration file");
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_marker.is_empty() {
            warn!("DEFAULT_MARKER is empty; marker placement is disabled by default");
        }
        if self.max_upload_bytes == 0 {
            return Err(QrPlaceError::InvalidConfig(
                "max_upload_bytes must be greater than zero".into(),
            ));
        }
        self.placement.validate()
    }

    /// `host:port` for binding the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}
