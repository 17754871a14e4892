//! Relay link for nodes behind NAT/firewalls.
//!
//! This module provides:
//! - The request multiplexer that turns per-node WebSocket tunnels into
//!   correlated request/response calls
//! - The `/relay/connect` endpoint nodes dial out to, gated by enrollment
//!   tokens

mod hub;
mod ws;

pub use hub::{RelayError, RelayHub};
pub use ws::{relay_handler, RelayState};
