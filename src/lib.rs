pub mod app;
pub mod common;
pub mod config;
pub mod docs;
pub mod infrastructure;
pub mod modules;
pub mod routes;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod vast;
pub mod workers;
