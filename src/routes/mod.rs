//! HTTP route handlers grouped by resource domain.
//!
//! Each submodule corresponds to a logical area of the API (geofeeds,
//! ranges, the import workflow, publication, activity) and exposes typed
//! Rocket handlers annotated with `#[openapi]` so `rocket_okapi` can
//! derive an OpenAPI document automatically. Handlers deserialize and
//! validate request bodies at this boundary; the core modules under
//! `crate::import` only ever see typed values.

pub mod activity;
pub mod geofeeds;
pub mod health;
pub(crate) mod helpers;
pub mod imports;
pub mod publish;
pub mod ranges;
