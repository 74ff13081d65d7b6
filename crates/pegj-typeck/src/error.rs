//! Type inference errors.

use std::fmt;

use pegj_common::Location;

/// An error found while assigning return types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeError {
    /// An action has no `@Return` annotation and no default type is configured.
    MissingReturnType { location: Location },
    /// Propagation reached an action that seeding never typed.
    ActionTypeUndefined { location: Location },
    /// A rule reference names a rule the grammar does not declare.
    UnknownRule { name: String, location: Location },
    /// Rule types were still changing after the sweep cap.
    Diverged { sweeps: usize, rules: Vec<String> },
}

impl TypeError {
    /// Source location to point a diagnostic at, if the error has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            TypeError::MissingReturnType { location }
            | TypeError::ActionTypeUndefined { location }
            | TypeError::UnknownRule { location, .. } => Some(*location),
            TypeError::Diverged { .. } => None,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::MissingReturnType { .. } => {
                write!(f, "missing default return type for action result")
            }
            TypeError::ActionTypeUndefined { .. } => {
                write!(f, "type of action result is undefined")
            }
            TypeError::UnknownRule { name, .. } => {
                write!(f, "reference to undefined rule `{}`", name)
            }
            TypeError::Diverged { sweeps, rules } => {
                write!(
                    f,
                    "rule types did not stabilize after {} sweeps (still changing: {})",
                    sweeps,
                    rules.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for TypeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let loc = Location::from_offsets(3, 7);
        assert_eq!(
            TypeError::MissingReturnType { location: loc }.to_string(),
            "missing default return type for action result"
        );
        let err = TypeError::Diverged {
            sweeps: 12,
            rules: vec!["list".into(), "item".into()],
        };
        assert_eq!(
            err.to_string(),
            "rule types did not stabilize after 12 sweeps (still changing: list, item)"
        );
        assert!(err.location().is_none());
        assert_eq!(
            TypeError::UnknownRule { name: "x".into(), location: loc }.location(),
            Some(loc)
        );
    }
}
