use std::fmt;
use std::path::PathBuf;

use crate::span::Location;

/// An error raised while loading the grammar AST handed over by the front-end.
#[derive(Debug)]
pub enum AstError {
    /// The JSON document does not describe a grammar.
    Decode(serde_json::Error),
    /// Two rules share the same name.
    DuplicateRule { name: String, location: Location },
    /// A `rule_ref` names a rule the grammar does not declare.
    UnknownRule { name: String, location: Location },
}

impl AstError {
    /// Source location of the offending node, if the error has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            AstError::Decode(_) => None,
            AstError::DuplicateRule { location, .. } | AstError::UnknownRule { location, .. } => {
                Some(*location)
            }
        }
    }
}

impl fmt::Display for AstError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstError::Decode(e) => write!(f, "malformed grammar AST: {}", e),
            AstError::DuplicateRule { name, .. } => {
                write!(f, "rule `{}` is defined more than once", name)
            }
            AstError::UnknownRule { name, .. } => {
                write!(f, "referenced rule `{}` does not exist", name)
            }
        }
    }
}

impl std::error::Error for AstError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AstError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AstError {
    fn from(e: serde_json::Error) -> Self {
        AstError::Decode(e)
    }
}

/// An error raised while loading compiler options from a TOML file.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Parse(e) => write!(f, "failed to parse options: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}
