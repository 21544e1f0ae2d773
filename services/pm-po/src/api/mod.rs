//! HTTP API

pub mod dto;
pub mod error;
pub mod routes;

pub use routes::{AppState, router};
