//! # Testbed Core
//!
//! Shared types and traits for composing test environments.
//!
//! This crate provides:
//! - `ContextId`, the identity shared by an environment and its infrastructures
//! - `ConfigMap` and the `Configuration` merge contract
//! - The async `Infrastructure` trait and its `ConfigConsumer` /
//!   `ConfigProducer` capabilities
//! - `BlockingInfrastructure` for infrastructures written against blocking APIs

pub mod blocking;
pub mod lifecycle;
pub mod traits;
pub mod types;

pub use blocking::{Blocking, BlockingInfrastructure};
pub use lifecycle::{InfrastructureContext, InfrastructureState};
pub use traits::{AsAny, ConfigConsumer, ConfigProducer, Infrastructure};
pub use types::{ConfigMap, Configuration, ContextId};
