//! # Pong Server Library
//!
//! Authoritative simulation core for networked Pong. The server owns the
//! canonical match state, applies player input at fixed ticks and broadcasts
//! snapshots to every connected client.
//!
//! ## Architecture
//!
//! Each match is a [`game::Pong`] value owned by exactly one
//! [`match_actor::MatchActor`] task. Input, termination and ticks all reach
//! the actor through its own queue, so a match is never shared and never
//! locked. Rules are not hardcoded: scoring, resets, eliminations and
//! power-ups are behavior units ([`modifier::Modifier`]) that react to game
//! events and are picked per game mode from the [`registry`].
//!
//! ## Module Organization
//!
//! - `physics`: vectors, balls, rectangles and swept collision tests
//! - `rng`: seedable random source used for every draw in a match
//! - `config`: parameter resolution with dependent transforms
//! - `modifier` / `modifier_manager`: the behavior unit contract, event
//!   dispatch and power-up spawning
//! - `modifiers` / `power_ups`: the built-in units
//! - `game`: arena geometry, settings and the tick loop
//! - `ai`: computer-controlled players
//! - `client_manager`, `match_actor`, `network`: lobby, match task and UDP
//!   transport

pub mod ai;
pub mod client_manager;
pub mod config;
pub mod error;
pub mod game;
pub mod match_actor;
pub mod modifier;
pub mod modifier_manager;
pub mod modifiers;
pub mod network;
pub mod physics;
pub mod power_ups;
pub mod registry;
pub mod rng;
pub mod utils;

pub use error::{GameError, Result};
pub use game::Pong;
