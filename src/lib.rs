//! MCP tool servers for integer arithmetic and for geocoding with geodesic
//! distance lookup.

pub mod config;
pub mod error;
pub mod geo;
pub mod math;
pub mod transport;


pub use error::{Result, ToolError};
pub use geo::GeoServer;
pub use math::MathServer;
