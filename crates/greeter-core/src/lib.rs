//! Core domain + application logic for the welcome auto-responder.
//!
//! This crate is intentionally framework-agnostic. Telegram (or any other
//! messenger) lives behind the `MessagingPort` trait implemented in adapter
//! crates.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod gate;
pub mod logging;
pub mod messaging;
pub mod responder;
pub mod template;

pub use errors::{Error, Result};
