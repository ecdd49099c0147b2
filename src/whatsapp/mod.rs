//! WhatsApp Integration
//!
//! Runs a WhatsApp Web client and feeds text messages to the command
//! dispatcher. Pairing is done by QR page or phone-number pair code.

mod agent;
mod handler;
pub mod pairing;
pub mod qr_page;

pub use agent::{PairingMode, WhatsAppAgent};
pub use handler::{WhatsAppMessage, extract_text, is_allowed};
pub use whatsapp_rust::client::Client;
