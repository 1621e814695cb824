//! Tiergate - tiered rate limiting for HTTP services.
//!
//! Decides whether a request from an identity (user or client IP) to an
//! endpoint may proceed, using a fixed-window counter or a sliding-window
//! log kept in a shared counter store. Limits come from per-tier defaults
//! and per-endpoint overrides; administrators bypass limiting entirely and
//! store outages fail open.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
