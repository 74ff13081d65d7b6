//! Emission assembly.
//!
//! Lowering produces [`Stmt`] trees: plain lines, blank lines, braced blocks
//! and conditionals. [`render`] turns them into the document IR of [`ir`]
//! and prints it with [`printer`].

pub mod ir;
pub mod printer;

use self::ir::{concat, hardline, indent, lines, text, Doc};
pub use self::printer::PrintConfig;

/// A statement of generated code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// One line of code (or a verbatim user-code fragment).
    Line(String),
    /// An empty line.
    Blank,
    /// `header`, the indented body, then `footer`. An empty footer is
    /// omitted so the block can run into a following clause (`} catch ...`).
    Block {
        header: String,
        body: Vec<Stmt>,
        footer: String,
    },
    /// `if (cond) { ... }` with an optional `else` branch.
    If {
        cond: String,
        then: Vec<Stmt>,
        otherwise: Option<Vec<Stmt>>,
    },
}

impl Stmt {
    pub fn line(s: impl Into<String>) -> Stmt {
        Stmt::Line(s.into())
    }

    pub fn block(header: impl Into<String>, body: Vec<Stmt>, footer: impl Into<String>) -> Stmt {
        Stmt::Block {
            header: header.into(),
            body,
            footer: footer.into(),
        }
    }

    pub fn if_then(cond: impl Into<String>, then: Vec<Stmt>) -> Stmt {
        Stmt::If {
            cond: cond.into(),
            then,
            otherwise: None,
        }
    }

    pub fn if_else(cond: impl Into<String>, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Stmt {
        Stmt::If {
            cond: cond.into(),
            then,
            otherwise: Some(otherwise),
        }
    }

    fn to_doc(&self) -> Doc {
        match self {
            Stmt::Line(s) => text(s.as_str()),
            Stmt::Blank => Doc::Empty,
            Stmt::Block {
                header,
                body,
                footer,
            } => {
                let mut parts = vec![text(header.as_str()), body_doc(body)];
                if !footer.is_empty() {
                    parts.push(hardline());
                    parts.push(text(footer.as_str()));
                }
                concat(parts)
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let mut parts = vec![text(format!("if ({}) {{", cond)), body_doc(then)];
                if let Some(otherwise) = otherwise {
                    parts.push(hardline());
                    parts.push(text("} else {"));
                    parts.push(body_doc(otherwise));
                }
                parts.push(hardline());
                parts.push(text("}"));
                concat(parts)
            }
        }
    }
}

fn body_doc(body: &[Stmt]) -> Doc {
    if body.is_empty() {
        return Doc::Empty;
    }
    indent(concat(vec![hardline(), to_doc(body)]))
}

/// Lower a statement list to the document IR.
pub fn to_doc(stmts: &[Stmt]) -> Doc {
    lines(stmts.iter().map(Stmt::to_doc))
}

/// Render statements as source text.
pub fn render(stmts: &[Stmt], config: &PrintConfig) -> String {
    printer::print(&to_doc(stmts), config)
}
