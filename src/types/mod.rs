pub mod app_state;
pub mod geo_point;
pub mod position_fix;
pub mod route_line;
