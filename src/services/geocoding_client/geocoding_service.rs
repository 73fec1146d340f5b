use async_trait::async_trait;
use urlencoding::encode;

use super::types::{
    geocoding_service_error::GeocodingServiceError,
    nominatim_search_response::NominatimSearchResponse,
};
use crate::types::geo_point::GeoPoint;

const MAX_RESULTS: usize = 5;

pub struct GeocodeCandidate {
    pub point: GeoPoint,
    pub display_name: String,
    pub confidence: Option<f64>,
}

/// Free-text address lookup. Candidates come back in provider order,
/// best match first; an empty list means no match.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodingServiceError>;
}

#[derive(Clone)]
pub struct GeocodingServiceConfig {
    pub host: String,
    pub user_agent: String,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    config: GeocodingServiceConfig,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(config: GeocodingServiceConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodeCandidate>, GeocodingServiceError> {
        let url = format!(
            "{}/search?q={}&format=json&limit={}",
            self.config.host,
            encode(query),
            MAX_RESULTS
        );

        let resp = self
            .client
            .get(&url)
            .header("user-agent", &self.config.user_agent)
            .send()
            .await
            .map_err(|e| GeocodingServiceError::Internal(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| GeocodingServiceError::Internal(format!("Bad response status: {}", e)))?;

        let body = resp.json::<NominatimSearchResponse>().await.map_err(|e| {
            GeocodingServiceError::Internal(format!("Failed to get response body: {}", e))
        })?;

        body.into_iter()
            .map(|r| {
                let latitude = r.lat.parse::<f64>().map_err(|e| {
                    GeocodingServiceError::Internal(format!("Invalid lat {}: {}", r.lat, e))
                })?;
                let longitude = r.lon.parse::<f64>().map_err(|e| {
                    GeocodingServiceError::Internal(format!("Invalid lon {}: {}", r.lon, e))
                })?;

                Ok(GeocodeCandidate {
                    point: GeoPoint::new(latitude, longitude),
                    display_name: r.display_name,
                    confidence: r.importance,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::geocoding_client::types::nominatim_search_response::NominatimSearchResponseResult;

    fn geocoder_for(server: &mockito::ServerGuard) -> NominatimGeocoder {
        NominatimGeocoder::new(GeocodingServiceConfig {
            host: server.url(),
            user_agent: "dispatch-nav-test".to_string(),
        })
    }

    #[tokio::test]
    async fn returns_candidates_in_provider_order() {
        let mut server = mockito::Server::new_async().await;

        let mock_response: NominatimSearchResponse = vec![
            NominatimSearchResponseResult {
                lat: "-29.95".to_string(),
                lon: "-71.33".to_string(),
                display_name: "123 Main St, Coquimbo".to_string(),
                importance: Some(0.4),
            },
            NominatimSearchResponseResult {
                lat: "-33.45".to_string(),
                lon: "-70.66".to_string(),
                display_name: "123 Main St, Santiago".to_string(),
                importance: Some(0.9),
            },
        ];

        let mock = server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".to_string(), "123 Main St".to_string()),
                mockito::Matcher::UrlEncoded("format".to_string(), "json".to_string()),
            ]))
            .match_header("user-agent", "dispatch-nav-test")
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&mock_response).unwrap())
            .create_async()
            .await;

        let candidates = geocoder_for(&server).geocode("123 Main St").await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].point, GeoPoint::new(-29.95, -71.33));
        assert_eq!(candidates[0].display_name, "123 Main St, Coquimbo");
        assert_eq!(candidates[1].confidence, Some(0.9));
    }

    #[tokio::test]
    async fn empty_array_means_no_match() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let candidates = geocoder_for(&server).geocode("???").await.unwrap();

        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_internal() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = geocoder_for(&server).geocode("123 Main St").await;

        assert!(matches!(result, Err(GeocodingServiceError::Internal(_))));
    }

    #[tokio::test]
    async fn unparseable_coordinates_are_internal() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/search")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"lat":"north","lon":"-71.33","display_name":"x"}]"#)
            .create_async()
            .await;

        let result = geocoder_for(&server).geocode("x").await;

        assert!(matches!(result, Err(GeocodingServiceError::Internal(_))));
    }
}
