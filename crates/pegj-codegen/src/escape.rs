//! Escaping for Java source text.

use std::fmt::Write;

/// Escape `s` for use inside a Java string literal.
///
/// Control characters and everything outside ASCII become `\uXXXX` escapes,
/// characters beyond the BMP as a surrogate pair.
pub fn java_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || (c as u32) >= 0x80 => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04X}", unit);
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Escape a character for use inside a regex bracket expression.
pub fn regex_class_char(c: char) -> String {
    match c {
        '\\' | '[' | ']' | '^' | '-' => format!("\\{}", c),
        c => c.to_string(),
    }
}

/// `camelCase` / `snake_case` to `UPPER_SNAKE_CASE`.
pub fn upper_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut in_upper_run = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if !in_upper_run && !out.is_empty() {
                out.push('_');
            }
            in_upper_run = true;
        } else {
            in_upper_run = false;
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}
