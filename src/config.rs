//! # Package-Set Description Schema and Parsing
//!
//! This module defines the data structures for `pkgset.yaml`, the
//! description file every package set (including the workspace root)
//! carries, and the logic for parsing it.
//!
//! A description names the set, states whether it participates in
//! automatic transitive import discovery, declares its imports (remote
//! repositories or local directories), and lists the OS-dependency and
//! build-recipe files it contributes. The resolver only interprets the
//! name and the import declarations; OS-dependency and recipe files are
//! carried through untouched for the downstream build pipeline.
//!
//! The workspace root's description may additionally carry an
//! `overrides:` section, see [`crate::overrides`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::overrides::OverrideRule;
use crate::source::SourceDescriptor;

/// Name of the description file inside a package set directory.
pub const DESCRIPTION_FILE: &str = "pkgset.yaml";

fn default_true() -> bool {
    true
}

/// A single import declaration inside a description file.
///
/// Exactly one of `url` (with an optional `ref`) or `path` must be given:
/// `url` declares a remote Git source, `path` a local directory relative
/// to the declaring set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ImportDecl {
    /// The URL of a remote Git repository to import.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// The Git reference (branch, tag, or commit) to use. Defaults to
    /// `main` when a URL is given without one.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// A local directory, relative to the declaring set's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Skip updating this import when a checkout already exists.
    #[serde(default)]
    pub checkout_only: bool,
}

impl ImportDecl {
    /// Convert the declaration into a [`SourceDescriptor`], validating
    /// that the `url`/`path` combination makes sense.
    pub fn descriptor(&self) -> Result<SourceDescriptor> {
        match (&self.url, &self.path) {
            (Some(url), None) => Ok(SourceDescriptor::git(
                url.clone(),
                self.rev.clone().unwrap_or_else(|| "main".to_string()),
            )),
            (None, Some(path)) => {
                if self.rev.is_some() {
                    return Err(Error::ConfigParse {
                        message: format!(
                            "import '{}' combines 'path' with 'ref'",
                            path.display()
                        ),
                        hint: Some("'ref' only applies to 'url' imports".to_string()),
                    });
                }
                Ok(SourceDescriptor::local(path.clone()))
            }
            (Some(url), Some(_)) => Err(Error::ConfigParse {
                message: format!("import '{}' declares both 'url' and 'path'", url),
                hint: Some("declare either a remote 'url' or a local 'path', not both".to_string()),
            }),
            (None, None) => Err(Error::ConfigParse {
                message: "import declares neither 'url' nor 'path'".to_string(),
                hint: Some("every import needs a 'url' or a 'path'".to_string()),
            }),
        }
    }

}

/// A parsed `pkgset.yaml` description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SetDescription {
    /// The set's logical name. Distinct from the repository identity:
    /// two different repositories may (conflictingly) declare the same
    /// name.
    pub name: String,
    /// Whether this set participates in automatic transitive import
    /// discovery. When false on the root, resolution covers only the
    /// root itself.
    #[serde(default = "default_true")]
    pub auto_import: bool,
    /// Declared imports, in order. Order matters for the root: it
    /// determines the positional edges of the dependency graph.
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    /// OS-dependency files contributed by this set. Opaque to the
    /// resolver.
    #[serde(default)]
    pub os_dependencies: Vec<PathBuf>,
    /// Build-recipe files contributed by this set. Opaque to the
    /// resolver.
    #[serde(default)]
    pub recipes: Vec<PathBuf>,
    /// Source rewrite rules. Only honored on the workspace root's
    /// description; overrides are always evaluated relative to the
    /// top-level configuration.
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
}

/// Parse a description from a YAML string.
pub fn parse(yaml_content: &str) -> Result<SetDescription> {
    let description: SetDescription =
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: Some(format!(
                "check the {} syntax: 'name' is required; imports need a 'url' or 'path'",
                DESCRIPTION_FILE
            )),
        })?;
    if description.name.trim().is_empty() {
        return Err(Error::ConfigParse {
            message: "package set 'name' must not be empty".to_string(),
            hint: None,
        });
    }
    Ok(description)
}

/// Load and parse the description file from a package set directory.
pub fn load(dir: &Path) -> Result<SetDescription> {
    let path = dir.join(DESCRIPTION_FILE);
    let content = std::fs::read_to_string(&path).map_err(|e| Error::ConfigParse {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: Some(format!(
            "every package set directory must contain a {}",
            DESCRIPTION_FILE
        )),
    })?;
    parse(&content)
}

/// Load only the logical name from a package set directory.
///
/// Requires the set's content to be present on disk, so for remote sets
/// this is only meaningful after a fetch.
pub fn load_name(dir: &Path) -> Result<String> {
    Ok(load(dir)?.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let description = parse("name: base\n").unwrap();
        assert_eq!(description.name, "base");
        assert!(description.auto_import);
        assert!(description.imports.is_empty());
        assert!(description.os_dependencies.is_empty());
        assert!(description.recipes.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let yaml = r#"
name: platform
auto-import: false
imports:
  - url: https://github.com/example/base-sets.git
    ref: v3
  - path: ../vendor-sets
    checkout-only: true
os-dependencies:
  - osdeps/debian.yaml
recipes:
  - recipes/toolchain.yaml
"#;
        let description = parse(yaml).unwrap();
        assert_eq!(description.name, "platform");
        assert!(!description.auto_import);
        assert_eq!(description.imports.len(), 2);
        assert!(description.imports[1].checkout_only);
        assert_eq!(description.os_dependencies.len(), 1);
        assert_eq!(description.recipes.len(), 1);
    }

    #[test]
    fn test_parse_missing_name() {
        let result = parse("imports: []\n");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Configuration parsing error"));
    }

    #[test]
    fn test_parse_empty_name() {
        let result = parse("name: \"  \"\n");
        assert!(result.unwrap_err().to_string().contains("must not be empty"));
    }

    #[test]
    fn test_parse_rejects_unknown_fields() {
        let result = parse("name: base\nunknown-field: 1\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_import_decl_url() {
        let decl: ImportDecl =
            serde_yaml::from_str("url: https://example.com/sets.git\nref: v1\n").unwrap();
        let descriptor = decl.descriptor().unwrap();
        assert!(!descriptor.is_local());
        assert!(descriptor.identity().contains("example.com/sets"));
    }

    #[test]
    fn test_import_decl_url_defaults_ref_to_main() {
        let decl: ImportDecl = serde_yaml::from_str("url: https://example.com/sets.git\n").unwrap();
        let descriptor = decl.descriptor().unwrap();
        assert!(descriptor.identity().ends_with("#main"));
    }

    #[test]
    fn test_import_decl_path() {
        let decl: ImportDecl = serde_yaml::from_str("path: ../other\n").unwrap();
        assert!(decl.descriptor().unwrap().is_local());
    }

    #[test]
    fn test_import_decl_both_url_and_path() {
        let decl: ImportDecl =
            serde_yaml::from_str("url: https://example.com/sets.git\npath: ../other\n").unwrap();
        let err = decl.descriptor().unwrap_err();
        assert!(err.to_string().contains("both 'url' and 'path'"));
    }

    #[test]
    fn test_import_decl_neither() {
        let decl: ImportDecl = serde_yaml::from_str("checkout-only: true\n").unwrap();
        assert!(decl.descriptor().is_err());
    }

    #[test]
    fn test_import_decl_path_with_ref() {
        let decl: ImportDecl = serde_yaml::from_str("path: ../other\nref: v1\n").unwrap();
        let err = decl.descriptor().unwrap_err();
        assert!(err.to_string().contains("'path' with 'ref'"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("cannot read"));
        assert!(err.to_string().contains(DESCRIPTION_FILE));
    }

    #[test]
    fn test_load_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DESCRIPTION_FILE), "name: base\n").unwrap();
        assert_eq!(load_name(dir.path()).unwrap(), "base");
    }
}
