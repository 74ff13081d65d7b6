//! Shared types for the pegj compiler.
//!
//! - [`ast`]: the grammar AST produced by the front-end, with stable node ids
//! - [`span`]: source locations
//! - [`config`]: compiler options and their TOML loader
//! - [`diagnostics`]: the diagnostics sink and its renderers
//! - [`error`]: loading errors

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod span;

pub use ast::{Expr, ExprKind, Grammar, NodeId, Rule};
pub use config::Options;
pub use diagnostics::{Diagnostic, DiagnosticSink, Diagnostics, Severity};
pub use span::Location;
