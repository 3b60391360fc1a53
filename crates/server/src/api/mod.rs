pub mod files;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod uploads;

pub use routes::create_router;
