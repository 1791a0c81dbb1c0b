#[allow(clippy::module_inception)]
pub mod routes;

pub use routes::{RouteInfo, build_app, route_info};
