//! # Rubybot - Autonomous Farming Client for Ruby King
//!
//! Rubybot drives the public HTTP API of the Ruby King browser RPG. It
//! explores the world, fights mob groups, keeps potion stock topped up,
//! rests when morale runs out, and walks a level-appropriate farming route
//! across locations, directions, and squares.
//!
//! ## Features
//!
//! - **Game-Loop State Machine**: A tri-state controller (city, combat,
//!   resting) with a combat micro-loop driven by per-action cooldowns.
//! - **Recovery Excursions**: Degraded conditions (low potions, weak hits)
//!   trigger a city round-trip that sells loot and restocks consumables.
//! - **Route Management**: One square per (location, direction) chosen for
//!   the player's level, advanced every ten kills, persisted between runs.
//! - **Polite Transport**: A single serialized request pipeline with a
//!   minimum one-second gap, bounded retries, and permissive JSON parsing.
//! - **Terminal Panels**: Player, combat, cooldown, route, drop, and kill
//!   panels refreshed once per second.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rubybot::config::Config;
//! use rubybot::engine::Engine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Load configuration
//!     let config = Config::load("config.toml").await?;
//!
//!     // Create and run the engine
//!     let mut engine = Engine::new(config).await?;
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`api`] - HTTP transport, endpoint catalog, and wire-payload parsing
//! - [`game`] - Player, mobs, route, and the top-level state machine
//! - [`engine`] - The tick scheduler and its combat/recovery/explore/rest handlers
//! - [`content`] - World map and mob observation database
//! - [`display`] - Terminal panel formatting and session statistics
//! - [`config`] - Configuration management and validation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │     Engine      │ ← Tick scheduler + handlers
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Api Client    │ ← Throttled, retried HTTP transport
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   Game State    │ ← Player / mobs / route / FSM
//! └─────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod content;
pub mod display;
pub mod engine;
pub mod game;
pub mod logutil;
