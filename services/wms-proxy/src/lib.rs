//! WMS proxy library.
//!
//! Exposes configuration, state and handlers so the HTTP surface can be
//! exercised in tests without binding a socket.

pub mod config;
pub mod handlers;
pub mod state;
