//! Integration tests for the translation pipeline:
//! - connection actor subscription and keep-alive behavior against a
//!   scripted in-process WebSocket server
//! - playlist recovery flow over a temp directory

pub mod connection_flow;
pub mod playlist_recovery;
