//! # trellis-registry
//!
//! npm-convention registry client: packument retrieval, dist-tag and exact
//! version resolution, authenticated tarball download, and safe extraction.

pub mod source;

pub use source::{extract_tarball, FetchedPackage, RegistrySource};
