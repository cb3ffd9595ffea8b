//! Process utilities.

pub mod signal;

pub use signal::install_shutdown_handler;
