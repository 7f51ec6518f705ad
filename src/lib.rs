//! Timed, proctored mock-test sessions in the terminal

pub mod answers;
pub mod anticheat;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod loader;
pub mod question;
pub mod results;
pub mod runner;
pub mod session;
pub mod setup;
pub mod status_bar;
pub mod store;
pub mod timer;
pub mod tui;
