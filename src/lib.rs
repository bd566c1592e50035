pub mod area;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod geo;
pub mod history;
pub mod search;
pub mod server;
pub mod store;
pub mod text;
