//! Document IR for generated source text.
//!
//! Statements are lowered to this layout IR before printing. The IR only
//! knows about text, forced line breaks and indentation; all control-flow
//! shape lives in the statement IR one level up.

/// A document node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Doc {
    /// Literal text emitted verbatim.
    Text(String),
    /// A newline. Indentation is written lazily before the next text, so
    /// empty lines carry no trailing spaces.
    Hardline,
    /// Increase indentation for the child by the configured indent size.
    Indent(Box<Doc>),
    /// A sequence of nodes rendered in order.
    Concat(Vec<Doc>),
    /// Produces no output.
    Empty,
}

// ── Helper constructors ─────────────────────────────────────────────────

pub fn text(s: impl Into<String>) -> Doc {
    Doc::Text(s.into())
}

pub fn hardline() -> Doc {
    Doc::Hardline
}

pub fn indent(doc: Doc) -> Doc {
    Doc::Indent(Box::new(doc))
}

pub fn concat(parts: Vec<Doc>) -> Doc {
    Doc::Concat(parts)
}

/// Join `parts` with hard line breaks.
pub fn lines(parts: impl IntoIterator<Item = Doc>) -> Doc {
    let mut out = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(hardline());
        }
        out.push(part);
    }
    concat(out)
}
