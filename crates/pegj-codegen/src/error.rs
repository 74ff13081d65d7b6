//! Code generation errors.

use std::fmt;

use pegj_common::Location;
use pegj_typeck::TypeError;

/// An error that stops lowering of a type-checked grammar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerateError {
    /// A configured start rule is not declared by the grammar.
    UnknownStartRule(String),
    /// The grammar has no rules, so there is nothing to start from.
    NoStartRules,
    /// Two start rules map to the same entry-point constant.
    EntryPointClash {
        constant: String,
        first: String,
        second: String,
    },
    /// A range boundary refers to a label that is not in scope.
    UnboundLabel { label: String, location: Location },
    /// The type table has no type for a node.
    Untyped {
        kind: &'static str,
        location: Location,
    },
}

impl GenerateError {
    pub fn location(&self) -> Option<Location> {
        match self {
            GenerateError::UnboundLabel { location, .. }
            | GenerateError::Untyped { location, .. } => Some(*location),
            GenerateError::UnknownStartRule(_)
            | GenerateError::NoStartRules
            | GenerateError::EntryPointClash { .. } => None,
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::UnknownStartRule(name) => {
                write!(f, "start rule `{}` is not defined", name)
            }
            GenerateError::NoStartRules => write!(f, "grammar has no rules to start from"),
            GenerateError::EntryPointClash {
                constant,
                first,
                second,
            } => write!(
                f,
                "start rules `{}` and `{}` both map to entry point `{}`",
                first, second, constant
            ),
            GenerateError::UnboundLabel { label, .. } => {
                write!(f, "range boundary refers to unbound label `{}`", label)
            }
            GenerateError::Untyped { kind, .. } => {
                write!(f, "no inferred type for `{}` node", kind)
            }
        }
    }
}

impl std::error::Error for GenerateError {}

/// Failure of the full pipeline: type inference, then lowering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    /// Type inference failed; the errors were also reported to the sink.
    Type(Vec<TypeError>),
    Generate(GenerateError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Type(errors) => match errors.as_slice() {
                [single] => write!(f, "type inference failed: {}", single),
                many => write!(f, "type inference failed with {} errors", many.len()),
            },
            CompileError::Generate(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Type(errors) => errors
                .first()
                .map(|e| e as &(dyn std::error::Error + 'static)),
            CompileError::Generate(err) => Some(err),
        }
    }
}

impl From<GenerateError> for CompileError {
    fn from(err: GenerateError) -> Self {
        CompileError::Generate(err)
    }
}
