//! # trellis-validate
//!
//! Validation pipeline for template artifacts: five order-stable checks
//! (schema, security, structure, dependency, version) that all run to
//! completion so a caller sees every problem in one verdict. The pipeline
//! honors a deadline and caches verdicts by content checksum.

pub mod checks;
pub mod pipeline;

pub use pipeline::{TemplateValidator, RULE_SET_VERSION};
