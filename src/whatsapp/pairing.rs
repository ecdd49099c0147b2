//! Pairing helpers: phone-number normalization and QR rendering

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use qrcode::render::svg;
use qrcode::{EcLevel, QrCode};
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

static NON_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]+").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("pairing number has no digits")]
    EmptyPhoneNumber,

    #[error("failed to encode QR code: {0}")]
    QrEncode(String),
}

/// Strip everything but digits: "+62 812-3456" becomes "628123456"
pub fn normalize_phone_number(raw: &str) -> Result<String, PairingError> {
    let digits = NON_DIGITS.replace_all(raw, "").into_owned();
    if digits.is_empty() {
        return Err(PairingError::EmptyPhoneNumber);
    }
    Ok(digits)
}

/// Render a QR payload as a base64-encoded SVG image
pub fn render_qr_svg_base64(data: &str) -> Result<String, PairingError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::M)
        .map_err(|e| PairingError::QrEncode(e.to_string()))?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build();
    Ok(STANDARD.encode(image))
}

/// A rendered QR code ready for the page
#[derive(Debug, Clone)]
pub struct QrImage {
    pub svg_base64: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct QrInner {
    image: Option<QrImage>,
    paired: bool,
}

/// Latest QR code and pairing status, shared between the bot and the page
#[derive(Debug, Clone, Default)]
pub struct QrState {
    inner: Arc<RwLock<QrInner>>,
}

impl QrState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current QR code with a freshly rendered one
    pub async fn update(&self, code: &str) -> Result<(), PairingError> {
        let image = QrImage {
            svg_base64: render_qr_svg_base64(code)?,
            generated_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.image = Some(image);
        inner.paired = false;
        Ok(())
    }

    /// Pairing finished; the QR code is no longer useful
    pub async fn mark_paired(&self) {
        let mut inner = self.inner.write().await;
        inner.image = None;
        inner.paired = true;
    }

    pub async fn current(&self) -> Option<QrImage> {
        self.inner.read().await.image.clone()
    }

    pub async fn is_paired(&self) -> bool {
        self.inner.read().await.paired
    }
}
