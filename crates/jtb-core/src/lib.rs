//! Core logic for the Jenkins trigger bot.
//!
//! This crate is framework-agnostic. Telegram and Jenkins live behind ports
//! (traits) implemented in adapter crates.

pub mod access;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod ports;

pub use errors::{Error, Result};
