use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{Implementation, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{distance_between, GeoPoint, Geocoder};
use crate::config::{CredentialProvider, GeoConfig};
use crate::error::ToolError;

pub const SERVER_NAME: &str = "geocalc-mcp-geo";

const INSTRUCTIONS: &str = "Find the cab distance of a location:
1. Find latitude and longitude of for both source and destination location.
2. Calculate the distance between the two coordinates.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LocationRequest {
    #[schemars(description = "place name or address to look up, e.g. \"Eiffel Tower, Paris\"")]
    pub location: String,
}

/// Every field is optional in the schema so that a missing value is reported
/// as an invalid argument naming the field. `0.0` is a valid coordinate.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DistanceRequest {
    #[schemars(description = "latitude of the source in decimal degrees")]
    pub source_latitude: Option<f64>,
    #[schemars(description = "longitude of the source in decimal degrees")]
    pub source_longitude: Option<f64>,
    #[schemars(description = "latitude of the destination in decimal degrees")]
    pub destination_latitude: Option<f64>,
    #[schemars(description = "longitude of the destination in decimal degrees")]
    pub destination_longitude: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CoordinatesRequest {
    #[schemars(description = "latitude in decimal degrees")]
    pub latitude: f64,
    #[schemars(description = "longitude in decimal degrees")]
    pub longitude: f64,
}

fn required(value: Option<f64>, field: &str) -> crate::error::Result<f64> {
    value.ok_or_else(|| {
        ToolError::InvalidArgument(format!(
            "All latitude and longitude values must be provided: {field} is missing."
        ))
    })
}

impl DistanceRequest {
    fn points(&self) -> crate::error::Result<(GeoPoint, GeoPoint)> {
        let source = GeoPoint::new(
            required(self.source_latitude, "source_latitude")?,
            required(self.source_longitude, "source_longitude")?,
        )?;
        let destination = GeoPoint::new(
            required(self.destination_latitude, "destination_latitude")?,
            required(self.destination_longitude, "destination_longitude")?,
        )?;
        Ok((source, destination))
    }
}

fn to_json(value: &impl Serialize) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("failed to encode result: {e}"))
}

fn report(tool: &str, err: ToolError) -> String {
    match &err {
        ToolError::InvalidArgument(_) | ToolError::NotFound(_) => {
            tracing::debug!(tool, "{}", err)
        }
        _ => tracing::warn!(tool, "{}", err),
    }
    err.to_string()
}

#[derive(Debug, Clone)]
pub struct GeoServer {
    geocoder: Geocoder,
    pub(crate) tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GeoServer {
    pub fn new(geocoder: Geocoder) -> Self {
        Self {
            geocoder,
            tool_router: Self::tool_router(),
        }
    }

    pub fn from_config(
        config: GeoConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> crate::error::Result<Self> {
        Ok(Self::new(Geocoder::new(config, credentials)?))
    }

    #[tool(description = "Get latitude and longitude from the given location")]
    pub async fn get_geolocation_lat_long(
        &self,
        Parameters(LocationRequest { location }): Parameters<LocationRequest>,
    ) -> Result<String, String> {
        tracing::debug!(%location, "forward geocode");
        let result = self
            .geocoder
            .search(&location)
            .await
            .map_err(|e| report("get_geolocation_lat_long", e))?;
        to_json(&result)
    }

    #[tool(description = "Get distance between two coordinates")]
    pub fn calculation_distance_by_coordinates(
        &self,
        Parameters(request): Parameters<DistanceRequest>,
    ) -> Result<String, String> {
        let (source, destination) = request
            .points()
            .map_err(|e| report("calculation_distance_by_coordinates", e))?;
        let result = distance_between(source, destination);
        tracing::debug!(distance_km = result.distance_km, "geodesic distance");
        to_json(&result)
    }

    #[tool(description = "Get location from latitude and longitude")]
    pub async fn get_location_from_coordinates(
        &self,
        Parameters(CoordinatesRequest {
            latitude,
            longitude,
        }): Parameters<CoordinatesRequest>,
    ) -> Result<String, String> {
        tracing::debug!(latitude, longitude, "reverse geocode");
        let payload = self
            .geocoder
            .reverse(latitude, longitude)
            .await
            .map_err(|e| report("get_location_from_coordinates", e))?;
        to_json(&payload)
    }
}

#[tool_handler]
impl ServerHandler for GeoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
            ..Default::default()
        }
    }
}
