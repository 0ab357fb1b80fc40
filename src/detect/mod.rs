// src/detect/mod.rs

//! Change detection.
//!
//! - [`digest`] resolves desired vs running digests through the
//!   orchestrator.
//! - [`detector`] applies the selection policy, refreshes images once per
//!   cycle and produces one [`UpdateDecision`] per active workload.
//!
//! Comparison is on content digests, never on tags.

pub mod detector;
pub mod digest;

pub use detector::{ChangeDetector, DecisionReason, Detection, UpdateDecision};
pub use digest::{normalize_digest, DigestPair, DigestResolver};
