//! Template package identity and the closed set of supported project kinds

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Supported project template kinds
///
/// A closed enum rather than a free-form string so the structure check can
/// match exhaustively over the required-files and required-deps tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateType {
    Web,
    Api,
    Cli,
    Library,
    Monorepo,
    Plugin,
}

impl TemplateType {
    /// All supported kinds, in declaration order
    pub const ALL: [TemplateType; 6] = [
        TemplateType::Web,
        TemplateType::Api,
        TemplateType::Cli,
        TemplateType::Library,
        TemplateType::Monorepo,
        TemplateType::Plugin,
    ];

    /// Files and directories that must exist in an artifact of this kind,
    /// relative to the artifact root. The manifest itself is always required
    /// and checked separately.
    pub fn required_files(&self) -> &'static [&'static str] {
        match self {
            TemplateType::Web => &["src", "public"],
            TemplateType::Api => &["src"],
            TemplateType::Cli => &["src"],
            TemplateType::Library => &["src"],
            TemplateType::Monorepo => &["packages"],
            TemplateType::Plugin => &["src"],
        }
    }

    /// Dependencies the manifest must declare for this kind
    pub fn required_dependencies(&self) -> &'static [&'static str] {
        match self {
            // Plugin templates extend the host tool and must declare its API
            TemplateType::Plugin => &["trellis-plugin-api"],
            TemplateType::Web
            | TemplateType::Api
            | TemplateType::Cli
            | TemplateType::Library
            | TemplateType::Monorepo => &[],
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TemplateType::Web => "web",
            TemplateType::Api => "api",
            TemplateType::Cli => "cli",
            TemplateType::Library => "library",
            TemplateType::Monorepo => "monorepo",
            TemplateType::Plugin => "plugin",
        };
        write!(f, "{}", s)
    }
}

/// One install-time variable declared by a template's config schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Human-readable prompt or description
    #[serde(default)]
    pub description: Option<String>,

    /// Value kind: "string", "boolean", "number", or "choice"
    #[serde(default = "VariableSpec::default_kind")]
    pub kind: String,

    /// Default value, rendered as a string
    #[serde(default)]
    pub default: Option<String>,

    /// Allowed values for "choice" variables
    #[serde(default)]
    pub choices: Vec<String>,

    /// Whether the installer must supply a value
    #[serde(default)]
    pub required: bool,
}

impl VariableSpec {
    fn default_kind() -> String {
        "string".to_string()
    }
}

/// Identity and declared contents of one template version
///
/// Parsed from `template.yaml` at the artifact root. Represents remote
/// truth: immutable once validated, never deleted locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePackage {
    /// Unique, transport-addressable identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Semantic version string
    pub version: String,

    /// Project kind
    #[serde(rename = "type")]
    pub template_type: TemplateType,

    /// Install-time variable schema
    #[serde(default)]
    pub config_schema: BTreeMap<String, VariableSpec>,

    /// Runtime dependencies (name -> version range)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies (name -> version range)
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,

    /// Host tool version ranges this template supports
    #[serde(default)]
    pub supported_versions: Vec<String>,

    /// Declared file paths, relative to the artifact root
    #[serde(default)]
    pub files: Vec<String>,

    /// Install-lifecycle scripts (name -> shell command)
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    /// Source repository URL
    #[serde(default)]
    pub repository: Option<String>,

    /// Project homepage URL
    #[serde(default)]
    pub homepage: Option<String>,
}

impl TemplatePackage {
    /// Cache key fragment for this package: `{id}@{version}`
    pub fn coordinate(&self) -> String {
        format!("{}@{}", self.id, self.version)
    }
}
