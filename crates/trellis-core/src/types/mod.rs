//! Type definitions shared across the Trellis crates

pub mod registry;
pub mod source;
pub mod template;
pub mod validation;

pub use registry::{GitRef, GitRepositoryRef, RegistryAuth, RegistryConfig};
pub use source::TemplateSource;
pub use template::{TemplatePackage, TemplateType, VariableSpec};
pub use validation::{CheckMetadata, ValidationIssue, ValidationResult};
