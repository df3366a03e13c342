//! Presentation helpers: value formatting and HTML page templates.

pub mod format;
pub mod templates;
