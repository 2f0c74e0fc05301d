pub mod backend;
pub mod config;
pub mod decode;
pub mod error;
pub mod message;
pub mod observability;
pub mod params;
pub mod rewrite;
pub mod routing;
pub mod state;

pub(crate) mod json_scan;
mod util;
