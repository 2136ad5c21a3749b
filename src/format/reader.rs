use crate::format::tokenizer::{Token, Tokenizer};
use crate::format::{ParseError, ParseErrorKind};
use crate::linker::Limits;
use crate::resolver::AddressingMode;

/// Numbers must stay below 2^30.
const NUMBER_LIMIT: u64 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountBound {
    Definitions,
    Uses,
    Instructions { used: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition<'a> {
    pub name: &'a str,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mode: AddressingMode,
    pub word: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRecord<'a> {
    pub definitions: Vec<Definition<'a>>,
    pub uses: Vec<&'a str>,
    pub instructions: Vec<Instruction>,
}

impl ModuleRecord<'_> {
    pub fn size(&self) -> usize {
        self.instructions.len()
    }
}

/// Structural readers over the token stream.
///
/// Every reader takes a `validate` flag. With `validate` unset the token is
/// taken at face value, which is only sound once an earlier validating
/// traversal has accepted the same input.
pub struct Reader<'a> {
    tokens: Tokenizer<'a>,
    limits: Limits,
}

impl<'a> Reader<'a> {
    pub fn new(source: &'a [u8], limits: Limits) -> Self {
        Self {
            tokens: Tokenizer::new(source),
            limits,
        }
    }

    pub fn at_end(&self) -> bool {
        self.tokens.at_end()
    }

    pub fn rewind(&mut self) {
        self.tokens.rewind();
    }

    pub fn read_module(
        &mut self,
        validate: bool,
        used: usize,
    ) -> Result<ModuleRecord<'a>, ParseError> {
        let def_count = self.read_number(validate, Some(CountBound::Definitions))?;
        let mut definitions = Vec::new();
        for _ in 0..def_count {
            let name = self.read_symbol(validate)?;
            let offset = self.read_number(validate, None)?;
            definitions.push(Definition { name, offset });
        }

        let use_count = self.read_number(validate, Some(CountBound::Uses))?;
        let mut uses = Vec::new();
        for _ in 0..use_count {
            uses.push(self.read_symbol(validate)?);
        }

        let inst_count = if validate {
            self.read_number(true, Some(CountBound::Instructions { used }))?
        } else {
            self.read_number(true, None)?
        };
        let mut instructions = Vec::new();
        for _ in 0..inst_count {
            let mode = self.read_mode(validate)?;
            let word = self.read_number(validate, None)?;
            instructions.push(Instruction { mode, word });
        }

        Ok(ModuleRecord {
            definitions,
            uses,
            instructions,
        })
    }

    pub fn read_number(
        &mut self,
        validate: bool,
        bound: Option<CountBound>,
    ) -> Result<u32, ParseError> {
        let token = self.take(ParseErrorKind::NumExpected)?;
        let malformed = || ParseError::new(ParseErrorKind::NumExpected, token.position());
        let text = std::str::from_utf8(token.text).map_err(|_| malformed())?;
        if !validate {
            return text.parse().map_err(|_| malformed());
        }

        let value = parse_number(text).ok_or_else(malformed)?;
        let exceeded = match bound {
            None => None,
            Some(CountBound::Definitions) => (to_usize(value) > self.limits.max_list_entries)
                .then_some(ParseErrorKind::TooManyDefInModule),
            Some(CountBound::Uses) => (to_usize(value) > self.limits.max_list_entries)
                .then_some(ParseErrorKind::TooManyUseInModule),
            Some(CountBound::Instructions { used }) => {
                (to_usize(value).saturating_add(used) > self.limits.instruction_budget())
                    .then_some(ParseErrorKind::TooManyInstr)
            }
        };
        match exceeded {
            Some(kind) => Err(ParseError::new(kind, token.position())),
            None => Ok(value),
        }
    }

    pub fn read_symbol(&mut self, validate: bool) -> Result<&'a str, ParseError> {
        let token = self.take(ParseErrorKind::SymExpected)?;
        let malformed = ParseError::new(ParseErrorKind::SymExpected, token.position());
        if validate {
            let well_formed = match token.text.split_first() {
                Some((first, rest)) => {
                    first.is_ascii_alphabetic() && rest.iter().all(u8::is_ascii_alphanumeric)
                }
                None => false,
            };
            if !well_formed {
                return Err(malformed);
            }
            if token.text.len() > self.limits.max_symbol_len {
                return Err(ParseError::new(ParseErrorKind::SymTooLong, token.position()));
            }
        }
        std::str::from_utf8(token.text).map_err(|_| malformed)
    }

    pub fn read_mode(&mut self, validate: bool) -> Result<AddressingMode, ParseError> {
        let token = self.take(ParseErrorKind::AddrExpected)?;
        let letter = match token.text {
            [letter] => Some(*letter),
            [first, ..] if !validate => Some(*first),
            _ => None,
        };
        letter
            .and_then(AddressingMode::from_letter)
            .ok_or_else(|| ParseError::new(ParseErrorKind::AddrExpected, token.position()))
    }

    fn take(&mut self, kind: ParseErrorKind) -> Result<Token<'a>, ParseError> {
        let end = self.tokens.end_position();
        self.tokens
            .next_token()
            .ok_or_else(|| ParseError::new(kind, end))
    }
}

/// Decimal literal below 2^30.
fn parse_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let significant = match text.trim_start_matches('0') {
        "" => "0",
        digits => digits,
    };
    if significant.len() > 10 || (significant.len() == 10 && !significant.starts_with('1')) {
        return None;
    }
    let value = significant.parse::<u64>().ok()?;
    if value >= NUMBER_LIMIT {
        return None;
    }
    u32::try_from(value).ok()
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::{parse_number, CountBound, Definition, Instruction, Reader};
    use crate::format::{ParseErrorKind, Position};
    use crate::linker::Limits;
    use crate::resolver::AddressingMode;

    fn reader(source: &str) -> Reader<'_> {
        Reader::new(source.as_bytes(), Limits::default())
    }

    fn kind_at(err: crate::format::ParseError) -> (ParseErrorKind, usize, usize) {
        (err.kind, err.position.line, err.position.offset)
    }

    #[test]
    fn number_guard_uses_significant_digit_count() {
        assert_eq!(parse_number("0000000"), Some(0));
        assert_eq!(parse_number("0042"), Some(42));
        assert_eq!(parse_number("1073741823"), Some(1_073_741_823));
        assert_eq!(parse_number("1073741824"), None);
        assert_eq!(parse_number("2000000000"), None);
        assert_eq!(parse_number("00001000000000"), Some(1_000_000_000));
        assert_eq!(parse_number("12345678901"), None);
        assert_eq!(parse_number("12a"), None);
        assert_eq!(parse_number("-1"), None);
    }

    #[test]
    fn reads_a_complete_module() {
        let mut r = reader("1 xy 2\n1 z\n3 R 1004 I 5678 E 2000\n");
        let module = r.read_module(true, 0).expect("module");
        assert_eq!(module.definitions, vec![Definition { name: "xy", offset: 2 }]);
        assert_eq!(module.uses, vec!["z"]);
        assert_eq!(
            module.instructions,
            vec![
                Instruction { mode: AddressingMode::Relative, word: 1004 },
                Instruction { mode: AddressingMode::Immediate, word: 5678 },
                Instruction { mode: AddressingMode::External, word: 2000 },
            ]
        );
        assert_eq!(module.size(), 3);
        assert!(r.at_end());
    }

    #[test]
    fn rejects_oversized_lists() {
        let err = reader("17")
            .read_number(true, Some(CountBound::Definitions))
            .expect_err("defs");
        assert_eq!(kind_at(err), (ParseErrorKind::TooManyDefInModule, 1, 1));

        let err = reader(" 17")
            .read_number(true, Some(CountBound::Uses))
            .expect_err("uses");
        assert_eq!(kind_at(err), (ParseErrorKind::TooManyUseInModule, 1, 2));

        assert_eq!(reader("16").read_number(true, Some(CountBound::Uses)), Ok(16));
    }

    #[test]
    fn instruction_budget_is_cumulative() {
        let bound = Some(CountBound::Instructions { used: 500 });
        assert_eq!(reader("12").read_number(true, bound), Ok(12));
        let err = reader("13").read_number(true, bound).expect_err("budget");
        assert_eq!(err.kind, ParseErrorKind::TooManyInstr);

        let limits = Limits {
            memory_cap: Some(256),
            ..Limits::default()
        };
        let mut capped = Reader::new(b"257", limits);
        let err = capped
            .read_number(true, Some(CountBound::Instructions { used: 0 }))
            .expect_err("cap");
        assert_eq!(err.kind, ParseErrorKind::TooManyInstr);
    }

    #[test]
    fn symbol_checks_shape_before_length() {
        let err = reader("1abc").read_symbol(true).expect_err("digit first");
        assert_eq!(err.kind, ParseErrorKind::SymExpected);

        let err = reader("ab_c").read_symbol(true).expect_err("underscore");
        assert_eq!(err.kind, ParseErrorKind::SymExpected);

        let err = reader("abcdefghijklmnopq").read_symbol(true).expect_err("17 chars");
        assert_eq!(err.kind, ParseErrorKind::SymTooLong);

        let err = reader("abcdefghijklmnop_")
            .read_symbol(true)
            .expect_err("bad and long");
        assert_eq!(err.kind, ParseErrorKind::SymExpected);

        assert_eq!(reader("abcdefghijklmnop").read_symbol(true), Ok("abcdefghijklmnop"));
    }

    #[test]
    fn non_ascii_bytes_are_structural_errors() {
        let mut r = Reader::new(b"ab\xe9 1\xe9 \xe9", Limits::default());
        let err = r.read_symbol(true).expect_err("latin-1 symbol");
        assert_eq!(kind_at(err), (ParseErrorKind::SymExpected, 1, 1));
        let err = r.read_number(true, None).expect_err("latin-1 number");
        assert_eq!(kind_at(err), (ParseErrorKind::NumExpected, 1, 5));
        let err = r.read_mode(false).expect_err("latin-1 mode");
        assert_eq!(kind_at(err), (ParseErrorKind::AddrExpected, 1, 8));
    }

    #[test]
    fn addressing_mode_must_be_a_single_letter() {
        assert_eq!(reader("E").read_mode(true), Ok(AddressingMode::External));
        let err = reader("RR").read_mode(true).expect_err("two letters");
        assert_eq!(err.kind, ParseErrorKind::AddrExpected);
        let err = reader("X").read_mode(true).expect_err("unknown");
        assert_eq!(err.kind, ParseErrorKind::AddrExpected);
    }

    #[test]
    fn truncated_module_reports_end_coordinates() {
        let err = reader("1 abc 0\n0\n2 R 0")
            .read_module(true, 0)
            .expect_err("truncated");
        assert_eq!(err.kind, ParseErrorKind::AddrExpected);
        assert_eq!(err.position, Position { line: 3, offset: 6 });

        let err = reader("1 abc").read_module(true, 0).expect_err("no value");
        assert_eq!(kind_at(err), (ParseErrorKind::NumExpected, 1, 6));

        let err = reader("1\n").read_module(true, 0).expect_err("no name");
        assert_eq!(kind_at(err), (ParseErrorKind::SymExpected, 1, 2));
    }

    #[test]
    fn unvalidated_reads_trust_the_input() {
        let mut r = reader("17 x");
        assert_eq!(r.read_number(false, Some(CountBound::Definitions)), Ok(17));
        assert_eq!(r.read_symbol(false), Ok("x"));
    }
}
