//! HTTP API for the station UI
//!
//! Routers are built per concern and merged in `build_router`.

mod health;
mod map;
mod sse;
mod station;

pub use health::health_routes;
pub use map::map_routes;
pub use sse::event_stream;
pub use station::station_routes;
