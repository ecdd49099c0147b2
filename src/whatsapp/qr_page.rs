//! QR Page
//!
//! Tiny HTTP page that shows the latest pairing QR code. Refresh the page
//! after a new code is logged.

use super::pairing::{QrImage, QrState};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>WhatsApp QR Code</title>
    <style>
        body { display: flex; flex-direction: column; align-items: center; justify-content: center;
               height: 100vh; margin: 0; background-color: #f0f2f5; font-family: Arial, sans-serif; }
        .qr-container { background-color: white; padding: 20px; border-radius: 10px;
                        box-shadow: 0 2px 10px rgba(0,0,0,0.1); text-align: center; }
        h1 { color: #128C7E; margin-bottom: 20px; }
        .status { margin-top: 20px; color: #666; }
        img { max-width: 300px; height: auto; }
    </style>
</head>
<body>
    <div class="qr-container">
        <h1>WhatsApp QR Code</h1>
"#;

const PAGE_TAIL: &str = r#"    </div>
</body>
</html>
"#;

/// Render the page body for the current state
pub fn render_page(image: Option<&QrImage>, paired: bool) -> String {
    let body = match (image, paired) {
        (_, true) => "        <p class=\"status\">Device paired. You can close this page.</p>\n".to_string(),
        (Some(image), false) => format!(
            "        <img src=\"data:image/svg+xml;base64,{}\" alt=\"QR Code\">\n        \
             <p class=\"status\">Scan this QR code with WhatsApp on your phone</p>\n        \
             <p class=\"status\">Generated at {}</p>\n",
            image.svg_base64,
            image.generated_at.format("%H:%M:%S UTC"),
        ),
        (None, false) => "        <p class=\"status\">Waiting for QR code...</p>\n".to_string(),
    };
    format!("{PAGE_HEAD}{body}{PAGE_TAIL}")
}

#[derive(Debug, Serialize)]
struct QrStatus {
    paired: bool,
    qr_available: bool,
    generated_at: Option<String>,
}

async fn index(State(state): State<QrState>) -> impl IntoResponse {
    let image = state.current().await;
    let paired = state.is_paired().await;
    Html(render_page(image.as_ref(), paired))
}

async fn status(State(state): State<QrState>) -> impl IntoResponse {
    let image = state.current().await;
    Json(QrStatus {
        paired: state.is_paired().await,
        qr_available: image.is_some(),
        generated_at: image.map(|i| i.generated_at.to_rfc3339()),
    })
}

pub fn router(state: QrState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/status", get(status))
        .with_state(state)
}

/// Serve the page until the listener fails
pub async fn serve(listen: &str, state: QrState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind QR page on {}", listen))?;
    tracing::info!("QR page available at http://{}", listen);

    axum::serve(listener, router(state))
        .await
        .context("QR page server failed")
}
