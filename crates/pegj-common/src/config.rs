//! Compiler options.
//!
//! Options are read from a TOML file whose keys are all optional:
//!
//! ```toml
//! package = "com.example.calc"
//! class-name = "CalcParser"
//! base-class-name = "com.example.BaseState"
//! use-fully-qualified-names = false
//! allowed-start-rules = ["start", "expr"]
//! default-action-return-type = "Object"
//! indent = 4
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_PACKAGE: &str = "org.pegjs.parser.generated";
pub const DEFAULT_CLASS_NAME: &str = "Parser";
pub const DEFAULT_ACTION_RETURN_TYPE: &str = "Object";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Options {
    /// Package of the generated class; `None` emits no package declaration.
    pub package: Option<String>,
    pub class_name: String,
    /// Superclass of the generated parser; the runtime `State` when absent.
    pub base_class_name: Option<String>,
    /// Spell every runtime type with its fully qualified name instead of
    /// emitting an import list.
    pub use_fully_qualified_names: bool,
    /// Rules the generated parser may start from. The first one is the
    /// default; an empty list means "the first rule of the grammar".
    pub allowed_start_rules: Vec<String>,
    /// Type of actions without a `@Return` annotation. `None` makes such
    /// actions a fatal error.
    pub default_action_return_type: Option<String>,
    /// Spaces per indentation level in the generated source.
    pub indent: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            package: Some(DEFAULT_PACKAGE.to_string()),
            class_name: DEFAULT_CLASS_NAME.to_string(),
            base_class_name: None,
            use_fully_qualified_names: false,
            allowed_start_rules: Vec::new(),
            default_action_return_type: Some(DEFAULT_ACTION_RETURN_TYPE.to_string()),
            indent: 2,
        }
    }
}

impl Options {
    /// Read and parse options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Options, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse options from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Options, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The effective start rules: the configured list, or the first rule of
    /// the grammar when none are configured.
    pub fn start_rules<'a>(&'a self, first_rule: Option<&'a str>) -> Vec<&'a str> {
        if self.allowed_start_rules.is_empty() {
            first_rule.into_iter().collect()
        } else {
            self.allowed_start_rules.iter().map(String::as_str).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_options() {
        let toml = r#"
package = "com.example.calc"
class-name = "CalcParser"
base-class-name = "com.example.BaseState"
use-fully-qualified-names = true
allowed-start-rules = ["start", "expr"]
default-action-return-type = "Integer"
indent = 4
"#;
        let options = Options::from_toml_str(toml).unwrap();
        assert_eq!(options.package.as_deref(), Some("com.example.calc"));
        assert_eq!(options.class_name, "CalcParser");
        assert_eq!(options.base_class_name.as_deref(), Some("com.example.BaseState"));
        assert!(options.use_fully_qualified_names);
        assert_eq!(options.allowed_start_rules, vec!["start", "expr"]);
        assert_eq!(options.default_action_return_type.as_deref(), Some("Integer"));
        assert_eq!(options.indent, 4);
    }

    #[test]
    fn parse_empty_options_uses_defaults() {
        let options = Options::from_toml_str("").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.package.as_deref(), Some(DEFAULT_PACKAGE));
        assert_eq!(options.class_name, "Parser");
        assert_eq!(options.default_action_return_type.as_deref(), Some("Object"));
    }

    #[test]
    fn unknown_value_type_is_an_error() {
        let err = Options::from_toml_str("indent = \"wide\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn start_rules_default_to_first_rule() {
        let options = Options::default();
        assert_eq!(options.start_rules(Some("top")), vec!["top"]);
        assert!(options.start_rules(None).is_empty());

        let options = Options {
            allowed_start_rules: vec!["b".into(), "a".into()],
            ..Options::default()
        };
        assert_eq!(options.start_rules(Some("top")), vec!["b", "a"]);
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pegj.toml");
        std::fs::write(&path, "class-name = \"Json\"\n").unwrap();
        let options = Options::from_file(&path).unwrap();
        assert_eq!(options.class_name, "Json");

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Options::from_file(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
