//! Client for the `geocode.maps.co` forward and reverse endpoints.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GeoPoint;
use crate::config::{CredentialProvider, GeoConfig, API_KEY_ENV};
use crate::error::{Result, ToolError};

const USER_AGENT: &str = concat!("geocalc-mcp/", env!("CARGO_PKG_VERSION"));
const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

/// The service sends coordinates as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Coordinate {
    Text(String),
    Number(f64),
}

impl Coordinate {
    fn to_f64(&self, field: &str) -> Result<f64> {
        match self {
            Coordinate::Number(n) => Ok(*n),
            Coordinate::Text(s) => s.trim().parse().map_err(|_| {
                ToolError::Upstream(format!("geocoder returned a malformed {field}: {s:?}"))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    lat: Coordinate,
    lon: Coordinate,
    display_name: Option<String>,
}

impl TryFrom<Candidate> for GeocodeResult {
    type Error = ToolError;

    fn try_from(candidate: Candidate) -> Result<Self> {
        Ok(Self {
            latitude: candidate.lat.to_f64("lat")?,
            longitude: candidate.lon.to_f64("lon")?,
            display_name: candidate
                .display_name
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: reqwest::Client,
    config: GeoConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl Geocoder {
    pub fn new(config: GeoConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    fn api_key(&self) -> Result<String> {
        match self.credentials.api_key() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ToolError::Configuration(format!(
                "Geolocation API key is not set in the {API_KEY_ENV} environment variable."
            ))),
        }
    }

    /// Resolves a place name to the coordinates of the best candidate.
    pub async fn search(&self, location: &str) -> Result<GeocodeResult> {
        let api_key = self.api_key()?;

        let location = location.trim();
        if location.is_empty() {
            return Err(ToolError::NotFound(
                "No geolocation data found for an empty location.".to_string(),
            ));
        }

        let body = self
            .get_json("search", &[("q", location.to_string()), ("api_key", api_key)])
            .await?;

        let first = match body {
            Value::Array(candidates) => candidates.into_iter().next(),
            Value::Null => None,
            other => {
                return Err(ToolError::Upstream(format!(
                    "unexpected search payload: {other}"
                )))
            }
        };
        let Some(first) = first else {
            return Err(ToolError::NotFound(format!(
                "No geolocation data found for {location:?}."
            )));
        };

        let candidate: Candidate = serde_json::from_value(first)
            .map_err(|e| ToolError::Upstream(format!("malformed search candidate: {e}")))?;
        candidate.try_into()
    }

    /// Returns the service's description of the coordinates unmodified.
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Result<Value> {
        let api_key = self.api_key()?;
        let point = GeoPoint::new(latitude, longitude)?;

        let body = self
            .get_json(
                "reverse",
                &[
                    ("lat", point.latitude().to_string()),
                    ("lon", point.longitude().to_string()),
                    ("api_key", api_key),
                ],
            )
            .await?;

        if is_empty_payload(&body) {
            return Err(ToolError::NotFound(
                "No location data found for the given coordinates.".to_string(),
            ));
        }
        if let Some(message) = error_only_payload(&body) {
            return Err(ToolError::NotFound(message.to_string()));
        }
        Ok(body)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.config.endpoint(path);
        tracing::debug!(%url, "geocoder request");

        // the query carries the api key, so urls are stripped from errors
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ToolError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, %status, "geocoder returned an error status");
            return Err(ToolError::Upstream(format!(
                "Error fetching {path} data: {}",
                status.as_u16()
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                ToolError::Http(e.without_url())
            } else {
                ToolError::Upstream(format!("invalid JSON from geocoder: {}", e.without_url()))
            }
        })
    }
}

fn is_empty_payload(body: &Value) -> bool {
    match body {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// `{"error": "Unable to geocode"}` is what the service answers for open sea.
fn error_only_payload(body: &Value) -> Option<&str> {
    let fields = body.as_object()?;
    if fields.len() != 1 {
        return None;
    }
    fields.get("error")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticCredentials;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    fn geocoder(url: &str, credentials: StaticCredentials) -> Geocoder {
        Geocoder::new(
            GeoConfig::default().with_base_url(url),
            Arc::new(credentials),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_first_candidate() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "London".into()),
                Matcher::UrlEncoded("api_key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"lat": "51.5074456", "lon": "-0.1277653", "display_name": "London, Greater London, England, United Kingdom"},
                    {"lat": "42.9832406", "lon": "-81.243372", "display_name": "London, Ontario, Canada"}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let result = geocoder(&server.url(), StaticCredentials::new("test-key"))
            .search("London")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.latitude, 51.5074456);
        assert_eq!(result.longitude, -0.1277653);
        assert!(result.display_name.starts_with("London, Greater London"));
    }

    #[tokio::test]
    async fn test_search_defaults_display_name() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"lat": 1.5, "lon": "2.25"}]"#)
            .create_async()
            .await;

        let result = geocoder(&server.url(), StaticCredentials::new("k"))
            .search("somewhere")
            .await
            .unwrap();

        assert_eq!(
            result,
            GeocodeResult {
                latitude: 1.5,
                longitude: 2.25,
                display_name: "Unknown Location".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_search_empty_result_is_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = geocoder(&server.url(), StaticCredentials::new("k"))
            .search("zzqxqzzqxq")
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search_blank_location_is_not_found_without_request() {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", Matcher::Any).expect(0).create_async().await;

        let err = geocoder(&server.url(), StaticCredentials::new("k"))
            .search("   ")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("Invalid API key")
            .create_async()
            .await;

        let err = geocoder(&server.url(), StaticCredentials::new("bad"))
            .search("Paris")
            .await
            .unwrap_err();

        match err {
            ToolError::Upstream(message) => assert!(message.contains("401")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_coordinates_are_upstream_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"lat": "north", "lon": "2.0"}]"#)
            .create_async()
            .await;

        let err = geocoder(&server.url(), StaticCredentials::new("k"))
            .search("Paris")
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_request() {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", Matcher::Any).expect(0).create_async().await;
        let geocoder = geocoder(&server.url(), StaticCredentials::none());

        let search = geocoder.search("London").await.unwrap_err();
        let reverse = geocoder
            .reverse(51.5, -0.12)
            .await
            .unwrap_err();

        let out_of_range = geocoder.reverse(95.0, 0.0).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(search, ToolError::Configuration(_)));
        assert!(matches!(out_of_range, ToolError::Configuration(_)));
        assert!(matches!(reverse, ToolError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_blank_credentials_are_missing() {
        let geocoder = geocoder("http://127.0.0.1:9", StaticCredentials::new("  "));
        let err = geocoder.search("London").await.unwrap_err();
        assert!(matches!(err, ToolError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_reverse_passes_payload_through() {
        let payload = json!({
            "place_id": 123,
            "lat": "48.8582599",
            "lon": "2.2945006",
            "display_name": "Eiffel Tower, Paris, France",
            "address": {"city": "Paris", "country_code": "fr"}
        });
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("lat".into(), "48.8583".into()),
                Matcher::UrlEncoded("lon".into(), "2.2945".into()),
                Matcher::UrlEncoded("api_key".into(), "k".into()),
            ]))
            .with_status(200)
            .with_body(payload.to_string())
            .create_async()
            .await;

        let body = geocoder(&server.url(), StaticCredentials::new("k"))
            .reverse(48.8583, 2.2945)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, payload);
    }

    #[tokio::test]
    async fn test_reverse_empty_and_error_payloads_are_not_found() {
        for body in ["{}", "[]", "null", r#"{"error":"Unable to geocode"}"#] {
            let mut server = Server::new_async().await;
            server
                .mock("GET", "/reverse")
                .match_query(Matcher::Any)
                .with_status(200)
                .with_body(body)
                .create_async()
                .await;

            let err = geocoder(&server.url(), StaticCredentials::new("k"))
                .reverse(0.0, -30.0)
                .await
                .unwrap_err();

            assert!(matches!(err, ToolError::NotFound(_)), "body {body}");
        }
    }

    #[tokio::test]
    async fn test_reverse_error_status_is_upstream_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = geocoder(&server.url(), StaticCredentials::new("k"))
            .reverse(10.0, 10.0)
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_request_times_out() {
        // accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let geocoder = Geocoder::new(
            GeoConfig::default()
                .with_base_url(format!("http://{addr}"))
                .with_timeout(Duration::from_millis(200)),
            Arc::new(StaticCredentials::new("secret-key")),
        )
        .unwrap();

        let err = tokio::time::timeout(Duration::from_secs(5), geocoder.search("London"))
            .await
            .expect("request should fail on its own timeout")
            .unwrap_err();

        assert!(err.to_string().starts_with("upstream error"), "{err}");
        match err {
            ToolError::Http(e) => {
                assert!(e.is_timeout());
                assert!(!e.to_string().contains("secret-key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
