pub mod geocoding_service_error;
pub mod nominatim_search_response;
