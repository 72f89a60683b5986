pub mod api;
pub mod board;
pub mod embedded;
pub mod errors;
pub mod hub;
pub mod logging;
pub mod persistence;
pub mod server;
pub mod ws;
