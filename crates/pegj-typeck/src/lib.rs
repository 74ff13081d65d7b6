//! Return-type inference for pegj grammars.
//!
//! Every expression node gets a semantic return type before code generation
//! so that rule subroutines, entry points, and hoisted action signatures are
//! declared with the right types.
//!
//! - [`ty`]: the type lattice
//! - [`infer`]: seeding, propagation, and the fixpoint driver
//! - [`error`]: type errors

pub mod error;
pub mod infer;
pub mod ty;

use pegj_common::{DiagnosticSink, Grammar};
use tracing::{debug, instrument, warn};

pub use crate::error::TypeError;
pub use crate::infer::{RuleType, TypeTable};
pub use crate::ty::Ty;

use crate::infer::Inferencer;

/// The result of type inference over one grammar.
#[derive(Debug)]
pub struct TypeckResult {
    /// Types of every rule and expression node.
    pub types: TypeTable,
    /// Errors found. Any error makes the table unusable for lowering.
    pub errors: Vec<TypeError>,
}

impl TypeckResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Upper bound on re-inference sweeps for a grammar with `rules` rules.
pub fn sweep_cap(rules: usize) -> usize {
    2 * rules + 8
}

/// Infer the return type of every node of `grammar`.
///
/// `default_return_type` types actions that carry no `@Return` annotation;
/// with `None` such actions are errors. Every error and every seeding
/// decision is also reported through `sink`.
#[instrument(level = "debug", skip_all, fields(rules = grammar.rules.len()))]
pub fn check(
    grammar: &Grammar,
    default_return_type: Option<&str>,
    sink: &mut dyn DiagnosticSink,
) -> TypeckResult {
    let mut inf = Inferencer::new(grammar, sink);

    inf.seed(default_return_type);
    if !inf.errors.is_empty() {
        let (types, errors) = inf.finish(0);
        return TypeckResult { types, errors };
    }

    inf.resolve_all();

    let cap = sweep_cap(grammar.rules.len());
    let mut sweeps = 0;
    let mut changed = inf.take_changed();
    while changed {
        if sweeps == cap {
            let rules = inf.sweep();
            warn!(sweeps, "type fixpoint did not converge");
            inf.report(TypeError::Diverged { sweeps, rules });
            break;
        }
        sweeps += 1;
        changed = !inf.sweep().is_empty();
    }
    debug!(sweeps, "type fixpoint reached");

    let (types, errors) = inf.finish(sweeps);
    TypeckResult { types, errors }
}
