//! Browsable directory listing over an S3 bucket.
//!
//! Listing pages are rendered from a delimited bucket listing, cached per
//! path and optionally gated by a shared password.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
