//! Simulation lifecycle core for simctl.
//!
//! This crate owns every status transition a simulation goes through and
//! the checks and side effects around them.
//!
//! # Modules
//!
//! - [`assets`] -- Asset loaders and their completion channel.
//! - [`config`] -- Configuration loading from `simctl-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- [`LifecycleError`] and its [`ErrorKind`].
//! - [`lifecycle`] -- The [`LifecycleController`]: start, stop, and the
//!   delayed deinit sequence.
//! - [`notifier`] -- Broadcast of simulation updates to clients.
//! - [`projection`] -- Mapping between stored simulations and their
//!   request and response shapes.
//! - [`validation`] -- Map and vehicle rules.
//!
//! [`LifecycleError`]: error::LifecycleError
//! [`ErrorKind`]: error::ErrorKind
//! [`LifecycleController`]: lifecycle::LifecycleController

pub mod assets;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notifier;
pub mod projection;
pub mod validation;

pub use error::{ErrorKind, LifecycleError};
pub use lifecycle::{LifecycleController, spawn_asset_listener};
pub use notifier::Notifier;
