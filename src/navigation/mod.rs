pub mod address_resolver;
pub mod directions;
pub mod location_source;
pub mod map_view_controller;
pub mod navigation_error;
pub mod navigation_session;
pub mod navigator;
pub mod position_tracker;
pub mod render_surface;
pub mod route_engine;

#[cfg(test)]
pub mod test_support;
