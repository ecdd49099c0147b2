//! hisoka
//!
//! WhatsApp command bot. Incoming text messages are matched against a
//! registry of prefix commands and dispatched to their handlers.

pub mod commands;
pub mod config;
pub mod logging;

#[cfg(feature = "whatsapp")]
pub mod whatsapp;

#[cfg(test)]
mod tests;
