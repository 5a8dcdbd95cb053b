//! Thin HTTP surface
//!
//! Handlers are glue: deserialize, call the sync layer, serialize. All
//! resilience lives below; a standings read here has no failure mode.

mod routes;

pub use routes::{router, ApiState};
