pub mod handlers;
pub mod models;

pub use handlers::api_routes;
