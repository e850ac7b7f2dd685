//! `Taskboard` relay server library.
//!
//! Holds the canonical board state for a set of browser viewers connected
//! over WebSocket: every mutation is applied to the in-memory [`board`]
//! store, recorded in the bounded [`activity`] log, and fanned out to all
//! connected viewers. Exposed as a library for tests and embedding.

pub mod activity;
pub mod board;
pub mod config;
pub mod http;
pub mod persist;
pub mod relay;
pub mod roster;
