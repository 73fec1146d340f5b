pub mod geocoding_client;
pub mod routing_client;
