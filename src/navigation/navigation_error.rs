use serde::Serialize;

/// Failures surfaced by the navigation engine.
///
/// `PermissionDenied`, `Unavailable` and `AddressNotFound` end a session.
/// `LookupFailed` is retryable by the caller and `RouteUnavailable` only
/// degrades the display of an active session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NavigationError {
    PermissionDenied,
    Unavailable(String),
    AddressNotFound(String),
    LookupFailed(String),
    RouteUnavailable(String),
}

impl NavigationError {
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NavigationError::PermissionDenied
                | NavigationError::Unavailable(_)
                | NavigationError::AddressNotFound(_)
        )
    }
}

impl std::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            NavigationError::PermissionDenied => write!(f, "Location permission denied"),
            NavigationError::Unavailable(e) => write!(f, "Location unavailable: {}", e),
            NavigationError::AddressNotFound(a) => write!(f, "Address not found: {}", a),
            NavigationError::LookupFailed(e) => write!(f, "Address lookup failed: {}", e),
            NavigationError::RouteUnavailable(e) => write!(f, "Route unavailable: {}", e),
        }
    }
}

impl std::error::Error for NavigationError {}
