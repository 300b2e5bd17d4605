/// What a character means to the scanner, given everything seen before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Ordinary text, quoted content, or the character after a backslash.
    Literal,
    /// A backslash opening a one-shot escape.
    Escape,
    /// A single quote that toggled the quote state.
    Quote,
    /// `(` outside quotes.
    Open,
    /// `)` outside quotes closing an open parenthesis.
    Close,
    /// `)` outside quotes with nothing open.
    StrayClose,
    /// `,` at depth 0 outside quotes.
    Separator,
    /// `;` at depth 0 outside quotes.
    Terminator,
}

/// Quote, escape and parenthesis tracking for MySQL style literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanState {
    depth: usize,
    in_quote: bool,
    escaped: bool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline(always)]
    pub fn classify(&mut self, ch: char) -> CharClass {
        if self.escaped {
            self.escaped = false;
            return CharClass::Literal;
        }

        match ch {
            '\\' => {
                self.escaped = true;
                CharClass::Escape
            }
            '\'' => {
                self.in_quote = !self.in_quote;
                CharClass::Quote
            }
            _ if self.in_quote => CharClass::Literal,
            '(' => {
                self.depth += 1;
                CharClass::Open
            }
            ')' => {
                if self.depth == 0 {
                    CharClass::StrayClose
                } else {
                    self.depth -= 1;
                    CharClass::Close
                }
            }
            ',' if self.depth == 0 => CharClass::Separator,
            ';' if self.depth == 0 => CharClass::Terminator,
            _ => CharClass::Literal,
        }
    }
}

/// Byte offset of the first `;` that ends a statement, scanning quote and paren aware.
pub fn find_terminator(text: &str) -> Option<usize> {
    let mut state = ScanState::new();
    text.char_indices()
        .find(|(_, ch)| state.classify(*ch) == CharClass::Terminator)
        .map(|(pos, _)| pos)
}
