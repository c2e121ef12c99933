#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Light-Cycle Arena Server
//!
//! A real-time WebSocket game server for a grid-based light-cycle arena.
//!
//! In-memory only — no database, no cloud services. Run the binary and
//! connect via WebSocket.

/// Bot movement policy for AI-controlled players.
pub mod ai;

/// Per-peer outgoing channels plus lobby/browsing fan-out.
pub mod broadcast;

/// Server configuration and environment variables.
pub mod config;

/// Router-level error taxonomy.
pub mod error;

/// The per-tick simulation state machine.
pub mod game;

/// Grid geometry: obstacle generation, safe spawning, cell math.
pub mod grid;

/// Player name/color assignment.
pub mod identity;

/// The pre-game lobby state machine.
pub mod lobby;

/// Structured logging configuration.
pub mod logging;

/// Process-wide counters, exposed only through log lines.
pub mod metrics;

/// WebSocket message protocol definitions.
pub mod protocol;

/// Replay recording and the opaque key-value replay store.
pub mod replay;

/// Lobby registry, per-lobby actor, and client message dispatch.
pub mod server;

/// Connection/session tracking and reconnection.
pub mod session;

/// WebSocket connection handling.
pub mod websocket;
