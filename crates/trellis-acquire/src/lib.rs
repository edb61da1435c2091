//! # trellis-acquire
//!
//! The acquisition coordinator: dispatches a template identifier to its
//! transport (registry or git), enforces cache policy, runs the validation
//! pipeline, and commits validated artifacts to the cache. The contract
//! callers care about: a returned path always points at a validated,
//! integrity-tracked cache entry, and failed acquisitions leave no partial
//! state behind.

pub mod coordinator;

pub use coordinator::{AcquireOptions, Acquisition, AcquisitionCoordinator};
