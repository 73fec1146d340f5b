use urlencoding::encode;

use super::address_resolver::normalize_address;

const DIRECTIONS_BASE_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Hand-off link for turn-by-turn guidance in an external maps app.
pub fn directions_link(address: &str) -> String {
    format!(
        "{}&destination={}",
        DIRECTIONS_BASE_URL,
        encode(&normalize_address(address))
    )
}
