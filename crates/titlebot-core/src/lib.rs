//! Core logic for titlebot: link extraction, title negotiation and dispatch.
//!
//! This crate is transport-agnostic. The chat connection lives behind
//! [`ports::SessionPort`], implemented in adapter crates.

pub mod bot;
pub mod channel;
pub mod config;
pub mod deadline;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod links;
pub mod logging;
pub mod ports;
pub mod title;

pub use errors::{Error, Result};
