//! WhatsApp Agent
//!
//! Agent struct and startup logic: opens the session store, picks the
//! pairing mode, and routes bot events to the command dispatcher.

use super::handler;
use super::pairing::{QrState, normalize_phone_number};
use super::qr_page;
use crate::commands::Dispatcher;
use crate::config::WhatsAppConfig;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use wacore::types::events::Event;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::pair_code::{PairCodeOptions, PlatformId};
use whatsapp_rust_sqlite_storage::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// OS name reported in the device properties
const DEVICE_OS: &str = "Linux";
/// Companion name shown in the phone's linked devices list
const DEVICE_DISPLAY: &str = "Edge (Linux)";

/// How the agent logs in on startup
///
/// The library skips both QR and pair-code login when the stored session is
/// already logged in, so the mode only matters for an unpaired store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingMode {
    /// A session store exists and no number is configured
    Resume,
    /// Link with an 8-character code entered on the phone
    PhoneNumber(String),
    /// Show QR codes on the HTTP page
    QrCode,
}

impl PairingMode {
    /// Pick the mode from whether a session exists and the configured number.
    ///
    /// A configured number always wins: a store left behind by an interrupted
    /// pairing is not a logged-in session.
    pub fn select(session_exists: bool, pairing_number: Option<&str>) -> Result<Self> {
        match pairing_number {
            Some(raw) => Ok(Self::PhoneNumber(
                normalize_phone_number(raw).context("Invalid PAIRING_NUMBER")?,
            )),
            None if session_exists => Ok(Self::Resume),
            None => Ok(Self::QrCode),
        }
    }

    /// Whether QR events should start the QR page
    pub fn serves_qr_page(&self) -> bool {
        !matches!(self, Self::PhoneNumber(_))
    }
}

/// Pair-code request presenting this device as Edge on Linux
pub fn pair_code_options(phone_number: &str) -> PairCodeOptions {
    PairCodeOptions {
        phone_number: phone_number.to_string(),
        platform_id: PlatformId::Edge,
        platform_display: DEVICE_DISPLAY.to_string(),
        ..Default::default()
    }
}

/// Start the QR page unless it is already running.
///
/// `started` is cleared again when the server fails, so the next QR event
/// retries the bind.
fn spawn_qr_page(
    listen: Arc<String>,
    state: QrState,
    started: Arc<AtomicBool>,
) -> Option<tokio::task::JoinHandle<()>> {
    if started.swap(true, Ordering::SeqCst) {
        return None;
    }
    Some(tokio::spawn(async move {
        if let Err(e) = qr_page::serve(&listen, state).await {
            tracing::error!("WhatsApp: {:#}", e);
            started.store(false, Ordering::SeqCst);
        }
    }))
}

/// WhatsApp agent that forwards messages to the command dispatcher
pub struct WhatsAppAgent {
    dispatcher: Dispatcher<Client>,
    config: WhatsAppConfig,
    allowed_phones: HashSet<String>,
    qr_state: QrState,
}

impl WhatsAppAgent {
    pub fn new(
        dispatcher: Dispatcher<Client>,
        config: WhatsAppConfig,
        allowed_phones: Vec<String>,
    ) -> Self {
        Self {
            dispatcher,
            config,
            allowed_phones: allowed_phones.into_iter().collect(),
            qr_state: QrState::new(),
        }
    }

    /// Start as a background task. Returns JoinHandle.
    /// If the stored session is already logged in, reconnects silently.
    pub fn start(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) -> Result<()> {
        let db_path = self.config.session_db.clone();
        let mode = PairingMode::select(db_path.exists(), self.config.pairing_number.as_deref())?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session directory: {:?}", parent))?;
        }

        let backend = Arc::new(
            SqliteStore::new(db_path.to_string_lossy().as_ref())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open session store: {}", e))?,
        );

        tracing::info!(
            "WhatsApp agent starting ({} command(s), mode: {:?})",
            self.dispatcher.registry().len(),
            mode,
        );

        let dispatcher = self.dispatcher;
        let allowed = Arc::new(self.allowed_phones);
        let qr_state = self.qr_state;
        let qr_listen = Arc::new(self.config.qr_listen);
        let qr_server_started = Arc::new(AtomicBool::new(false));
        let serves_qr_page = mode.serves_qr_page();

        let mut builder = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_os_info(Some(DEVICE_OS.to_string()), None);

        if let PairingMode::PhoneNumber(phone_number) = &mode {
            builder = builder.with_pair_code(pair_code_options(phone_number));
        }

        let bot_result = builder
            .on_event(move |event, client| {
                let dispatcher = dispatcher.clone();
                let allowed = allowed.clone();
                let qr_state = qr_state.clone();
                let qr_listen = qr_listen.clone();
                let qr_server_started = qr_server_started.clone();
                async move {
                    match event {
                        Event::PairingQrCode { ref code, .. } => {
                            if !serves_qr_page {
                                tracing::debug!("WhatsApp: QR code ignored, waiting for pair code");
                                return;
                            }
                            spawn_qr_page(qr_listen, qr_state.clone(), qr_server_started);
                            match qr_state.update(code).await {
                                Ok(()) => tracing::info!(
                                    "WhatsApp: new QR code generated - please refresh the page"
                                ),
                                Err(e) => tracing::error!("WhatsApp: {}", e),
                            }
                        }
                        Event::PairingCode { ref code, .. } => {
                            tracing::info!("WhatsApp: pairing code: {}", code);
                        }
                        Event::Connected(_) => {
                            tracing::info!("WhatsApp: connected successfully");
                        }
                        Event::PairSuccess(_) => {
                            qr_state.mark_paired().await;
                            tracing::info!("WhatsApp: pairing successful");
                        }
                        Event::Message(msg, info) => {
                            handler::handle_message(*msg, info, client, dispatcher, allowed).await;
                        }
                        Event::LoggedOut(_) => {
                            tracing::warn!("WhatsApp: logged out");
                        }
                        Event::Disconnected(_) => {
                            tracing::warn!("WhatsApp: disconnected");
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await;

        let mut bot = bot_result.map_err(|e| anyhow::anyhow!("Failed to build bot: {}", e))?;

        let handle = bot
            .run()
            .await
            .map_err(|e| anyhow::anyhow!("WhatsApp agent error: {}", e))?;
        handle.await.context("WhatsApp agent task error")?;
        Ok(())
    }
}
