//! p2plink-core: name codec, status codes, link handles and configuration.
//! All other p2plink crates depend on this one.

pub mod config;
pub mod handle;
pub mod name;
pub mod status;

pub use name::{decode_name, encode_name};
pub use status::{FailureReason, Status};
