use axum::{
    routing::{get, post, put},
    Router,
};

use crate::types::app_state::AppState;

mod delete_navigation;
mod get_device_watch_options;
mod get_directions_link;
mod get_map_view;
mod get_navigation;
mod post_device_error;
mod post_device_position;
mod post_navigation;
mod put_map_fullscreen;

pub fn apply_routes(app: Router<AppState>) -> Router<AppState> {
    app.route(
        "/navigation",
        post(post_navigation::post_navigation)
            .get(get_navigation::get_navigation)
            .delete(delete_navigation::delete_navigation),
    )
    .route(
        "/device/position",
        post(post_device_position::post_device_position),
    )
    .route("/device/error", post(post_device_error::post_device_error))
    .route(
        "/device/watch-options",
        get(get_device_watch_options::get_device_watch_options),
    )
    .route("/map", get(get_map_view::get_map_view))
    .route(
        "/map/fullscreen",
        put(put_map_fullscreen::put_map_fullscreen),
    )
    .route(
        "/directions-link",
        get(get_directions_link::get_directions_link),
    )
}
