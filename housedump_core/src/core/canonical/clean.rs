use crate::core::scalar::Scalar;

/// Zero-width marks, byte order marks, ASCII control characters and the ideographic space.
#[inline]
pub fn is_invisible(ch: char) -> bool {
    matches!(ch, '\u{FEFF}' | '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{3000}')
        || ch.is_ascii_control()
}

/// CJK unified ideographs, the range district names are written in.
#[inline]
pub fn is_cjk(ch: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&ch)
}

pub fn clean_text(text: &str) -> String {
    let cleaned: String = text.chars().filter(|c| !is_invisible(*c)).collect();
    let trimmed = cleaned.trim();
    if trimmed.len() == cleaned.len() {
        cleaned
    } else {
        trimmed.to_string()
    }
}

/// Cleans a text value; text that cleans to nothing becomes NULL. Numbers pass through.
pub fn clean_scalar(value: &Scalar) -> Scalar {
    match value {
        Scalar::Text(text) => {
            let cleaned = clean_text(text);
            if cleaned.is_empty() {
                Scalar::Null
            } else {
                Scalar::Text(cleaned)
            }
        }
        other => other.clone(),
    }
}

/// Lookup key for romanized names: no whitespace, `-` or `_`, lowercase.
pub fn romanized_key(text: &str) -> String {
    text.chars()
        .filter(|c| !(c.is_whitespace() || *c == '-' || *c == '_'))
        .flat_map(char::to_lowercase)
        .collect()
}
