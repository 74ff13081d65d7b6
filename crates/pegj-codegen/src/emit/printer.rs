//! Printer for the document IR.

use crate::emit::ir::Doc;

/// Output layout settings.
#[derive(Debug, Clone)]
pub struct PrintConfig {
    /// Number of spaces per indentation level. Default: 2.
    pub indent_size: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self { indent_size: 2 }
    }
}

/// A command on the printer's work stack.
#[derive(Debug)]
struct PrintCmd<'a> {
    indent: usize,
    doc: &'a Doc,
}

/// Render a document as text ending in exactly one newline.
pub fn print(doc: &Doc, config: &PrintConfig) -> String {
    let mut out = String::new();
    let mut at_line_start = true;
    let mut stack: Vec<PrintCmd> = vec![PrintCmd { indent: 0, doc }];

    while let Some(cmd) = stack.pop() {
        match cmd.doc {
            Doc::Empty => {}

            Doc::Text(s) => {
                if s.is_empty() {
                    continue;
                }
                if at_line_start {
                    out.extend(std::iter::repeat(' ').take(cmd.indent));
                    at_line_start = false;
                }
                out.push_str(s);
            }

            Doc::Hardline => {
                out.push('\n');
                at_line_start = true;
            }

            Doc::Indent(child) => {
                stack.push(PrintCmd {
                    indent: cmd.indent + config.indent_size,
                    doc: child,
                });
            }

            Doc::Concat(parts) => {
                // Reverse so the first part is printed first.
                for part in parts.iter().rev() {
                    stack.push(PrintCmd {
                        indent: cmd.indent,
                        doc: part,
                    });
                }
            }
        }
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
