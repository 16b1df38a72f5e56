//! # Atoms Client Library
//!
//! Client-side core for the Atoms multiplayer arena. The server owns the world; this
//! library keeps a local mirror of it, predicts the controlled player's movement, and
//! translates server events into visual and audio effects.
//!
//! ## Architecture Overview
//!
//! ### Authoritative Snapshots
//! Every `gameState` from the server lists all players, resources and projectiles. The
//! [`sync::StateSynchronizer`] diffs each snapshot against the local [`world::WorldState`]
//! and tells the [`render::RenderAdapter`] exactly what appeared, changed or vanished.
//!
//! ### Owned Position
//! The controlled player's position is predicted locally by
//! [`prediction::PredictionEngine`] and is never overwritten by snapshots. Everything
//! else about that player (radius, composition, stability) still follows the server.
//!
//! ### Speculative Collection
//! Touching a resource removes it locally at once and sends a collect intent. There is
//! no rollback: if the server refuses the pickup, the resource comes back with the next
//! snapshot that lists it.
//!
//! ## Module Organization
//!
//! - `transport`: WebSocket channel, decoded messages on unbounded queues
//! - `connection`: join handshake and intent sending, inbound routing
//! - `sync`: snapshot reconciliation and stats push
//! - `prediction`: input sampling, movement and pickups
//! - `events`: hits, deaths, departures and explosions
//! - `engine`: frame-thread owner of all of the above
//! - `rendering`: macroquad scene and HUD used by the binary
//! - `headless`: recording collaborators for tests and tooling
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::config::EngineConfig;
//! use client::engine::{Engine, Frame};
//! use client::headless::{RecordingRenderer, RecordingUi};
//! use client::input::{DeviceClass, InputSource};
//! use client::transport::Channel;
//! use std::time::{Duration, Instant};
//!
//! let (channel, _server) = Channel::in_memory();
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     InputSource::for_device(DeviceClass::Desktop),
//!     RecordingRenderer::default(),
//!     RecordingUi::default(),
//! );
//! engine.attach(channel, "Hydrogen");
//!
//! loop {
//!     let now = Instant::now();
//!     engine.pump(now);
//!     engine.tick(Frame { now, elapsed: Duration::from_millis(16) });
//! }
//! ```

pub mod config;
pub mod connection;
pub mod engine;
pub mod events;
pub mod headless;
pub mod input;
pub mod prediction;
pub mod render;
pub mod rendering;
pub mod stats;
pub mod sync;
pub mod transport;
pub mod world;
