//! HTTP handlers: the listing view with its login form, plus health probes.

pub mod health_handlers;
pub mod listing_handlers;
