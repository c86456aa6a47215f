//! CLI command modules.

pub mod http;
pub mod links;
pub mod names;
pub mod status;
