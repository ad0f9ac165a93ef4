//! Writer emitting Xcode's pbxproj layout: tab indentation, one entry per
//! line, annotations next to their strings.

use crate::value::{PbxString, PbxValue};

pub(crate) fn write(root: &PbxValue) -> String {
    let mut out = String::from("// !$*UTF8*$!\n");
    write_value(&mut out, root, 0);
    out.push('\n');
    out
}

fn write_value(out: &mut String, value: &PbxValue, indent: usize) {
    match value {
        PbxValue::String(s) => write_string(out, s),
        PbxValue::Dict(dict) => {
            out.push_str("{\n");
            for (key, v) in dict.iter() {
                push_tabs(out, indent + 1);
                write_string(out, key);
                out.push_str(" = ");
                write_value(out, v, indent + 1);
                out.push_str(";\n");
            }
            push_tabs(out, indent);
            out.push('}');
        }
        PbxValue::Array(items) => {
            out.push_str("(\n");
            for item in items {
                push_tabs(out, indent + 1);
                write_value(out, item, indent + 1);
                out.push_str(",\n");
            }
            push_tabs(out, indent);
            out.push(')');
        }
    }
}

fn write_string(out: &mut String, s: &PbxString) {
    if needs_quotes(&s.value) {
        out.push('"');
        for c in s.value.chars() {
            match c {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                other => out.push(other),
            }
        }
        out.push('"');
    } else {
        out.push_str(&s.value);
    }
    if let Some(ann) = &s.annotation {
        out.push_str(" /* ");
        out.push_str(ann);
        out.push_str(" */");
    }
}

/// Bare tokens are restricted to the character set Xcode itself leaves
/// unquoted. Anything else, the empty string, and tokens that would lex as a
/// comment opener get quoted.
fn needs_quotes(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.starts_with("//") || s.starts_with("/*") {
        return true;
    }
    !s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '/'))
}

fn push_tabs(out: &mut String, n: usize) {
    for _ in 0..n {
        out.push('\t');
    }
}
