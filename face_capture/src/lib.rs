mod routes;
mod server;
mod stream;

pub mod app;
pub mod camera;
pub mod config;
pub mod enrollment;
pub mod frame;
pub mod inference;
pub mod render;
pub mod session;
pub mod telemetry;

pub use app::start_app;
