//! Shared types for the parlor realtime party-game server.
//!
//! This crate is transport-agnostic: it knows nothing about sockets,
//! Tokio, or Axum. `parlor-server` wires these types to a concrete
//! runtime and transport.

pub mod config;
pub mod domain;
pub mod error;
pub mod protocol;
