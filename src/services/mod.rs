//! Service layer: storage access, caching, the access gate and the listing
//! pipeline that ties them together.

pub mod access_gate;
pub mod cache;
pub mod listing_service;
pub mod storage_service;
