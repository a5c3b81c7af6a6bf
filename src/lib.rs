pub mod types;
pub mod config;
pub mod error;
pub mod data;
pub mod geocode;
pub mod processing;
pub mod view;
pub mod render;
pub mod html;
pub mod export;
pub mod session;
pub mod server;
