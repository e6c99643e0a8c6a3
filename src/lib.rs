pub mod app;
pub mod config;
pub mod database;
pub mod http;
pub mod logging;
pub mod model;
pub mod repo;
pub mod server;
pub mod util;

pub use app::App;
