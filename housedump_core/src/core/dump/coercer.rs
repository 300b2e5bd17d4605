use std::borrow::Cow;

use smallvec::SmallVec;

use crate::core::scalar::{parse_number, Scalar};

use super::scan::{CharClass, ScanState};

/// Scalars of one tuple. Rows in a house dump have fifteen fields, so they stay inline.
pub type ScalarRow = SmallVec<[Scalar; 16]>;

/// Splits a tuple interior on top-level commas and trims each field.
///
/// An interior that is empty or whitespace yields no fields at all.
pub fn split_fields(interior: &str) -> SmallVec<[&str; 16]> {
    let mut fields = SmallVec::new();
    if interior.trim().is_empty() {
        return fields;
    }

    let mut state = ScanState::new();
    let mut field_start = 0;

    for (pos, ch) in interior.char_indices() {
        if state.classify(ch) == CharClass::Separator {
            fields.push(interior[field_start..pos].trim());
            field_start = pos + ch.len_utf8();
        }
    }
    fields.push(interior[field_start..].trim());

    fields
}

/// Maps one field's text to a scalar: `NULL`, a quoted string, a number, or the raw text.
pub fn coerce_field(field: &str) -> Scalar {
    let field = field.trim();

    if field.eq_ignore_ascii_case("NULL") {
        return Scalar::Null;
    }

    if field.len() >= 2 && field.starts_with('\'') && field.ends_with('\'') {
        return Scalar::Text(unescape_quoted(&field[1..field.len() - 1]));
    }

    match parse_number(field) {
        Some(n) => Scalar::Number(n),
        None => Scalar::Text(field.to_string()),
    }
}

/// Coerces every field of a tuple interior (the text between the outer parentheses).
pub fn coerce_interior(interior: &str) -> ScalarRow {
    split_fields(interior).into_iter().map(coerce_field).collect()
}

/// Coerces a raw tuple literal as emitted by the tokenizer.
pub fn coerce_tuple(raw: &str) -> ScalarRow {
    let wrapped = ensure_wrapped(raw);
    coerce_interior(&wrapped[1..wrapped.len() - 1])
}

/// Makes sure a tuple literal is enclosed in parentheses.
pub fn ensure_wrapped(raw: &str) -> Cow<'_, str> {
    let raw = raw.trim();
    match (raw.starts_with('('), raw.ends_with(')') && raw.len() > 1) {
        (true, true) => Cow::Borrowed(raw),
        (true, false) => Cow::Owned(format!("{})", raw)),
        (false, true) => Cow::Owned(format!("({}", raw)),
        (false, false) => Cow::Owned(format!("({})", raw)),
    }
}

fn unescape_quoted(body: &str) -> String {
    if !body.contains('\\') {
        return body.to_string();
    }

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some(&next) if next == '\'' || next == '\\' => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push(ch),
            }
        } else {
            out.push(ch);
        }
    }

    out
}
