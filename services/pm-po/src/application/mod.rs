//! 应用层

pub mod commands;
pub mod handler;
pub mod supplier_resolver;

pub use commands::*;
pub use handler::*;
pub use supplier_resolver::*;
