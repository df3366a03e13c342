//! Core data models for the bucket listing.
//!
//! `listing` holds what the storage backend reports; `entity` holds the
//! display-ready rows built from it.

pub mod entity;
pub mod listing;
