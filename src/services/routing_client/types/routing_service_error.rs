#[derive(Debug)]
pub enum RoutingServiceError {
    NoRoute(String),
    Internal(String),
}

impl std::fmt::Display for RoutingServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RoutingServiceError::NoRoute(code) => write!(f, "No route found: {}", code),
            RoutingServiceError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}
