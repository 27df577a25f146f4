//! Access to the hosted backend: row API and realtime change feed.
//!
//! The backend is an external collaborator — a hosted relational store
//! with a PostgREST-style row API and a Phoenix-style change feed. This
//! module is the only place that knows wire shapes; everything above it
//! works with the typed rows in `crate::types`.

pub mod client;
pub mod realtime;

pub use client::BackendClient;
pub use realtime::{RealtimeClient, Subscription};
