use std::iter::FusedIterator;
use std::str::CharIndices;

use super::scan::{CharClass, ScanState};

/// Splits the text after `VALUES` into raw `(...)` tuple literals.
///
/// The scan is a single forward pass over borrowed text; each yielded item is a
/// slice of the source that starts with `(` and ends with its matching `)`.
/// Text between tuples at depth 0 (separating commas, whitespace, stray `)`) is
/// skipped. The scan stops at the statement's terminating `;`. A tuple still
/// open when the input runs out is dropped and reported through [`TupleTokenizer::dangling`].
pub struct TupleTokenizer<'a> {
    source: &'a str,
    chars: CharIndices<'a>,
    state: ScanState,
    start: Option<usize>,
    end: usize,
    finished: bool,
    dangling: bool,
}

impl<'a> TupleTokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices(),
            state: ScanState::new(),
            start: None,
            end: 0,
            finished: false,
            dangling: false,
        }
    }

    /// Whether a partial tuple was discarded at end of input.
    pub fn dangling(&self) -> bool {
        self.dangling
    }

    /// Bytes consumed from the source, including the terminating `;` if one was found.
    pub fn consumed(&self) -> usize {
        self.end
    }

    fn finish(&mut self, end: usize) {
        self.finished = true;
        self.end = end;
        self.dangling = self.start.take().is_some();
    }
}

impl<'a> Iterator for TupleTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        while let Some((pos, ch)) = self.chars.next() {
            match self.state.classify(ch) {
                CharClass::Open if self.state.depth() == 1 => {
                    self.start = Some(pos);
                }
                CharClass::Close if self.state.depth() == 0 => {
                    if let Some(start) = self.start.take() {
                        return Some(&self.source[start..pos + ch.len_utf8()]);
                    }
                }
                CharClass::Terminator => {
                    self.finish(pos + ch.len_utf8());
                    return None;
                }
                _ => {}
            }
        }

        self.finish(self.source.len());
        None
    }
}

impl FusedIterator for TupleTokenizer<'_> {}

/// Convenience wrapper collecting every tuple of a `VALUES` blob.
pub fn split_tuples(values: &str) -> Vec<&str> {
    TupleTokenizer::new(values).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_simple_tuples() {
        let tuples = split_tuples("(1,'a'),(2,'b'), (3,'c');");
        assert_eq!(tuples, vec!["(1,'a')", "(2,'b')", "(3,'c')"]);
    }

    #[test]
    fn test_quoted_parens_and_commas() {
        let tuples = split_tuples("('a,(b)',1),('x)y',2)");
        assert_eq!(tuples, vec!["('a,(b)',1)", "('x)y',2)"]);
    }

    #[test]
    fn test_escaped_quotes() {
        let tuples = split_tuples(r"('it\'s (fine)',1),('back\\',2)");
        assert_eq!(tuples, vec![r"('it\'s (fine)',1)", r"('back\\',2)"]);
    }

    #[test]
    fn test_nested_parens() {
        let tuples = split_tuples("(1,(2,(3))),(4)");
        assert_eq!(tuples, vec!["(1,(2,(3)))", "(4)"]);
    }

    #[test]
    fn test_cjk_content() {
        let tuples = split_tuples("('新北市','板橋區（江子翠）',1),('三重區',2)\n;");
        assert_eq!(tuples, vec!["('新北市','板橋區（江子翠）',1)", "('三重區',2)"]);
    }

    #[test]
    fn test_stops_at_terminator() {
        let mut tokenizer = TupleTokenizer::new("(1),(2);(3)");
        assert_eq!(tokenizer.by_ref().count(), 2);
        assert_eq!(tokenizer.consumed(), 8);
        assert!(!tokenizer.dangling());
        assert_eq!(tokenizer.next(), None);
    }

    #[test]
    fn test_semicolon_inside_tuple_is_data() {
        let tuples = split_tuples("('a;b'),(c;d)");
        assert_eq!(tuples, vec!["('a;b')", "(c;d)"]);
    }

    #[test]
    fn test_truncated_tail_is_dropped() {
        let mut tokenizer = TupleTokenizer::new("(1,'ok'),(2,'cut off");
        let tuples: Vec<&str> = tokenizer.by_ref().collect();
        assert_eq!(tuples, vec!["(1,'ok')"]);
        assert!(tokenizer.dangling());
    }

    #[test]
    fn test_unbalanced_parens_at_end_are_dropped() {
        let mut tokenizer = TupleTokenizer::new("(1),(2,(3)");
        let tuples: Vec<&str> = tokenizer.by_ref().collect();
        assert_eq!(tuples, vec!["(1)"]);
        assert!(tokenizer.dangling());
    }

    #[test]
    fn test_stray_close_is_ignored() {
        let tuples = split_tuples(") (1),) (2)");
        assert_eq!(tuples, vec!["(1)", "(2)"]);
    }

    #[test]
    fn test_empty_input() {
        let mut tokenizer = TupleTokenizer::new("");
        assert_eq!(tokenizer.next(), None);
        assert!(!tokenizer.dangling());
    }

    fn random_field(rng: &mut StdRng) -> String {
        match rng.random_range(0..5) {
            0 => "NULL".to_string(),
            1 => rng.random_range(-1000..1000).to_string(),
            2 => format!("{:.3}", rng.random_range(0.0..1e6)),
            3 => {
                let pieces = ["a", ",", "(", ")", "\\'", "\\\\", "區", " ", ";"];
                let text: String = (0..rng.random_range(0..8))
                    .map(|_| pieces[rng.random_range(0..pieces.len())])
                    .collect();
                format!("'{}'", text)
            }
            _ => format!("({},{})", rng.random_range(0..9), rng.random_range(0..9)),
        }
    }

    #[test]
    fn test_tuple_count_matches_generated_groups() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let groups = rng.random_range(0..20);
            let tuples: Vec<String> = (0..groups)
                .map(|_| {
                    let fields: Vec<String> =
                        (0..rng.random_range(1..10)).map(|_| random_field(&mut rng)).collect();
                    format!("({})", fields.join(","))
                })
                .collect();
            let blob = format!("{};", tuples.join(",\n"));
            let parsed = split_tuples(&blob);
            assert_eq!(parsed.len(), groups, "blob: {blob}");
            assert_eq!(parsed, tuples.iter().map(|t| t.as_str()).collect::<Vec<_>>());
        }
    }
}
