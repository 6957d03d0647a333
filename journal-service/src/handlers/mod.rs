//! HTTP handlers for the journal service.

pub mod admin;
pub mod auth;
pub mod chart;
pub mod feature_flags;
pub mod journal;
pub mod profile;
pub mod strategy;
