use crate::format::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub line: usize,
    pub offset: usize,
    pub text: &'a [u8],
}

impl Token<'_> {
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            offset: self.offset,
        }
    }
}

/// Splits lines on spaces and tabs. Offsets are 1-based byte columns.
pub struct Tokenizer<'a> {
    source: &'a [u8],
    rest: &'a [u8],
    line: &'a [u8],
    line_no: usize,
    cursor: usize,
    end: Option<Position>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        let mut tokenizer = Self {
            source,
            rest: source,
            line: &[],
            line_no: 0,
            cursor: 0,
            end: None,
        };
        tokenizer.skip_blanks();
        tokenizer
    }

    pub fn at_end(&self) -> bool {
        self.end.is_some()
    }

    /// Coordinates one past the last consumed column of the last line.
    pub fn end_position(&self) -> Position {
        self.end.unwrap_or(Position {
            line: self.line_no,
            offset: self.cursor + 1,
        })
    }

    pub fn next_token(&mut self) -> Option<Token<'a>> {
        if self.at_end() {
            return None;
        }
        let line = self.line;
        let start = self.cursor;
        let len = line[start..]
            .iter()
            .position(|&b| is_blank(b))
            .unwrap_or(line.len() - start);
        self.cursor = start + len;
        let token = Token {
            line: self.line_no,
            offset: start + 1,
            text: &line[start..self.cursor],
        };
        self.skip_blanks();
        Some(token)
    }

    pub fn rewind(&mut self) {
        assert!(self.at_end(), "rewind requested before the input was exhausted");
        *self = Self::new(self.source);
    }

    fn skip_blanks(&mut self) {
        loop {
            while self.cursor < self.line.len() && is_blank(self.line[self.cursor]) {
                self.cursor += 1;
            }
            if self.cursor < self.line.len() {
                return;
            }
            match self.next_line() {
                Some(line) => {
                    self.line = line;
                    self.line_no += 1;
                    self.cursor = 0;
                }
                None => {
                    self.end = Some(Position {
                        line: self.line_no,
                        offset: self.cursor + 1,
                    });
                    return;
                }
            }
        }
    }

    // A trailing newline does not open another line.
    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.rest.is_empty() {
            return None;
        }
        let rest = self.rest;
        let (line, tail) = match rest.iter().position(|&b| b == b'\n') {
            Some(nl) => (&rest[..nl], &rest[nl + 1..]),
            None => (rest, &rest[rest.len()..]),
        };
        self.rest = tail;
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}
