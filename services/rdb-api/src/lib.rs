//! aq2rdb service library
//!
//! Retrieves a time series from AQUARIUS Publish, with site metadata from
//! NWIS Web Services, and renders it as an NWIS RDB file.

pub mod config;
pub mod handlers;
pub mod pipeline;
pub mod request;
pub mod state;
