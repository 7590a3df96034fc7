//! Merge engine, claim/harvest state machine, and session orchestration
//! for the Seedfall merge game.
//!
//! The crate owns every rule of a game. Physics and rendering live
//! elsewhere and talk to it through [`physics::PhysicsWorld`] and
//! [`observer::SessionObserver`]; the remote ledger is reached through
//! [`seedfall_ledger::LedgerBackend`].
//!
//! # Modules
//!
//! - [`claim`] -- Claim/harvest state machine and the in-flight slot.
//! - [`clock`] -- Monotonic millisecond clocks, real and manual.
//! - [`config`] -- Configuration loading from `seedfall-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`SessionError`](error::SessionError).
//! - [`game_over`] -- Terminal condition and the game-over latch.
//! - [`merge`] -- Equal-rank merge rule over collision batches.
//! - [`observer`] -- Callback surface for UIs and loggers.
//! - [`physics`] -- Seams to the rigid-body physics collaborator.
//! - [`rank`] -- Seed yield, radius and score per rank.
//! - [`registry`] -- Generational arena of live discs.
//! - [`runner`] -- Headless async session loop.
//! - [`session`] -- [`SessionController`](session::SessionController),
//!   the single owner of game state.

pub mod claim;
pub mod clock;
pub mod config;
pub mod error;
pub mod game_over;
pub mod merge;
pub mod observer;
pub mod physics;
pub mod rank;
pub mod registry;
pub mod runner;
pub mod session;
