// src/webhook/mod.rs

//! Authenticated HTTP trigger source.
//!
//! Handlers only authenticate and signal the [`crate::engine::TriggerCoordinator`];
//! they never wait for a cycle.

pub mod auth;
pub mod server;

pub use auth::{sign, verify, WebhookAuth, SIGNATURE_HEADER};
pub use server::{router, serve_on, WebhookState};
