//! Servant Library
//!
//! Administrative HTTP API for IIS sites: host status, site lifecycle
//! and zipped bundle deploys.

pub mod api;
pub mod config;
pub mod deploy;
pub mod host;
pub mod site;

pub use config::Config;
pub use site::{SiteManager, SiteRegistry};
