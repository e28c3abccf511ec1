pub mod app;
pub mod banner;
pub mod cli;
pub mod config;
pub mod fmt;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod signals;
pub mod utils;
