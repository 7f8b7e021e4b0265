//! HTTP request handlers for the WPS API.

pub mod health;
pub mod wps;
