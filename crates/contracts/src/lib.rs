//! # Contracts
//!
//! Shared interface contracts for the fleet live view: entity and route
//! records, stream events, collaborator traits (snapshot, realtime channel,
//! map surface, view sink) and the dashboard configuration.
//! All other crates depend on this crate, never the reverse.
//!
//! ## Identity
//! - Entity and route ids are normalised to strings (`EntityId`)
//! - Store order is snapshot order, upserts appended

mod config;
mod entity;
mod entity_id;
mod error;
mod map;
mod route;
mod sink;
mod snapshot;
mod stream;
mod view;

pub use config::*;
pub use entity::*;
pub use entity_id::{EntityId, RouteId};
pub use error::*;
pub use map::*;
pub use route::*;
pub use sink::*;
pub use snapshot::*;
pub use stream::*;
pub use view::*;
