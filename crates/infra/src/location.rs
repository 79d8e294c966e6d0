//! Location providers
//!
//! The static provider returns a fixed position and keeps the app fully
//! offline; the IP provider resolves the machine's position from an
//! ipinfo-style JSON endpoint.

use std::time::Duration;

use async_trait::async_trait;
use datacam_core::LocationProvider;
use datacam_domain::{DatacamError, GeoLocation, Result};
use serde::Deserialize;
use tracing::debug;

const DEFAULT_ENDPOINT: &str = "https://ipinfo.io/json";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Provider returning a fixed location.
#[derive(Debug, Clone)]
pub struct StaticLocationProvider {
    location: GeoLocation,
}

impl StaticLocationProvider {
    /// Provider pinned to the given location.
    pub fn new(location: GeoLocation) -> Self {
        Self { location }
    }
}

impl Default for StaticLocationProvider {
    fn default() -> Self {
        Self::new(GeoLocation {
            latitude: 37.7749,
            longitude: -122.4194,
            city: "San Francisco".into(),
            country: "United States".into(),
        })
    }
}

#[async_trait]
impl LocationProvider for StaticLocationProvider {
    async fn current_location(&self) -> Result<GeoLocation> {
        Ok(self.location.clone())
    }
}

/// Shape of an ipinfo-style lookup response. Every field is optional; the
/// provider degrades to `Unknown`/zero coordinates rather than failing on a
/// sparse answer.
#[derive(Debug, Deserialize)]
struct IpLookupResponse {
    city: Option<String>,
    country: Option<String>,
    /// Coordinates as `"lat,lon"`.
    loc: Option<String>,
}

impl From<IpLookupResponse> for GeoLocation {
    fn from(response: IpLookupResponse) -> Self {
        let (latitude, longitude) = response
            .loc
            .as_deref()
            .and_then(|loc| {
                let (lat, lon) = loc.split_once(',')?;
                Some((lat.trim().parse().ok()?, lon.trim().parse().ok()?))
            })
            .unwrap_or((0.0, 0.0));

        Self {
            latitude,
            longitude,
            city: response.city.unwrap_or_else(|| "Unknown".into()),
            country: response.country.unwrap_or_else(|| "Unknown".into()),
        }
    }
}

/// Provider resolving the position of the machine's public IP address.
pub struct IpLocationProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl IpLocationProvider {
    /// Provider against the default ipinfo endpoint.
    ///
    /// # Errors
    /// Returns `Network` when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Provider against a custom endpoint.
    ///
    /// # Errors
    /// Returns `Network` when the HTTP client cannot be constructed.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(|err| DatacamError::Network(format!("building HTTP client failed: {err}")))?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    async fn current_location(&self) -> Result<GeoLocation> {
        debug!(endpoint = %self.endpoint, "resolving location");

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|err| DatacamError::Network(format!("location lookup failed: {err}")))?
            .error_for_status()
            .map_err(|err| DatacamError::Network(format!("location lookup failed: {err}")))?;

        let lookup: IpLookupResponse = response
            .json()
            .await
            .map_err(|err| DatacamError::Network(format!("location response invalid: {err}")))?;

        Ok(lookup.into())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sparse_responses_degrade_to_unknown() {
        let geo: GeoLocation =
            IpLookupResponse { city: None, country: None, loc: None }.into();
        assert_eq!(geo.city, "Unknown");
        assert_eq!(geo.country, "Unknown");
        assert_eq!(geo.latitude, 0.0);
        assert_eq!(geo.longitude, 0.0);
    }

    #[test]
    fn malformed_coordinates_degrade_to_zero() {
        let geo: GeoLocation = IpLookupResponse {
            city: Some("Oslo".into()),
            country: Some("NO".into()),
            loc: Some("not-a-pair".into()),
        }
        .into();
        assert_eq!(geo.city, "Oslo");
        assert_eq!(geo.latitude, 0.0);
    }

    #[tokio::test]
    async fn lookup_parses_an_ipinfo_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": "Oslo",
                "country": "NO",
                "loc": "59.9139,10.7522"
            })))
            .mount(&server)
            .await;

        let provider =
            IpLocationProvider::with_endpoint(format!("{}/json", server.uri())).expect("provider");
        let geo = provider.current_location().await.expect("lookup succeeds");

        assert_eq!(geo.city, "Oslo");
        assert_eq!(geo.country, "NO");
        assert!((geo.latitude - 59.9139).abs() < f64::EPSILON);
        assert!((geo.longitude - 10.7522).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn http_errors_surface_as_network_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = IpLocationProvider::with_endpoint(server.uri()).expect("provider");
        assert!(matches!(
            provider.current_location().await,
            Err(DatacamError::Network(_))
        ));
    }

    #[tokio::test]
    async fn static_provider_returns_its_pinned_location() {
        let provider = StaticLocationProvider::default();
        let geo = provider.current_location().await.expect("always succeeds");
        assert_eq!(geo.city, "San Francisco");
    }
}
