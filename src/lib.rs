pub mod app;
pub mod middlewares;
pub mod navigation;
pub mod routes;
pub mod services;
pub mod types;
pub mod utils;
