//! Java code generation for pegj grammars.
//!
//! Turns a type-checked grammar into one Java compilation unit: a
//! recursive-descent parser class with one subroutine per rule, running on
//! the `org.pegjs.java` runtime.
//!
//! - [`stack`]: compile-time allocation of Java locals
//! - [`escape`]: Java string and regex class escaping
//! - [`imports`]: runtime class names and their spelling
//! - [`registry`]: deduplicated constants and hoisted user code
//! - [`lower`]: per-rule lowering of expressions to statements
//! - [`emit`]: statement trees and the pretty printer
//! - [`assemble`]: layout of the whole compilation unit

pub mod assemble;
pub mod emit;
pub mod error;
pub mod escape;
pub mod imports;
pub mod lower;
pub mod registry;
pub mod stack;

use pegj_common::{DiagnosticSink, Grammar, Options};
use tracing::{info, instrument};

pub use crate::assemble::generate;
pub use crate::error::{CompileError, GenerateError};

/// Run type inference and lower `grammar` to Java source.
///
/// Type errors have already been reported through `sink` when
/// [`CompileError::Type`] is returned. Generation errors are reported there
/// too before being returned.
#[instrument(level = "debug", skip_all, fields(class = %options.class_name))]
pub fn compile(
    grammar: &Grammar,
    options: &Options,
    sink: &mut dyn DiagnosticSink,
) -> Result<String, CompileError> {
    let typeck = pegj_typeck::check(
        grammar,
        options.default_action_return_type.as_deref(),
        sink,
    );
    if !typeck.is_ok() {
        return Err(CompileError::Type(typeck.errors));
    }

    match generate(grammar, &typeck.types, options) {
        Ok(source) => {
            info!(
                rules = grammar.rules.len(),
                sweeps = typeck.types.sweeps(),
                bytes = source.len(),
                "generated parser"
            );
            Ok(source)
        }
        Err(err) => {
            sink.emit_error(err.to_string(), err.location());
            Err(err.into())
        }
    }
}
