// Library target shared by the binary, the integration tests and the criterion benches.

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod library;
pub mod logging;
pub mod player;
pub mod store;
pub mod ui;
