use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct NominatimSearchResponseResult {
    pub lat: String,
    pub lon: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
}

/// Nominatim answers `/search` with a bare JSON array in provider order.
pub type NominatimSearchResponse = Vec<NominatimSearchResponseResult>;
