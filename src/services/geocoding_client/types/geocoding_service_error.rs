#[derive(Debug)]
pub enum GeocodingServiceError {
    Internal(String),
}

impl std::fmt::Display for GeocodingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            GeocodingServiceError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}
