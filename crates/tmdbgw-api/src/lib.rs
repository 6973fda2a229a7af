//! API library for tmdbgw.
//!
//! Provides the rate-governed TMDB client and the bearer token gate guarding
//! the gateway endpoint.

/// Bearer token authentication.
pub mod auth;

/// TMDB API client.
pub mod tmdb;
