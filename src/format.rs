use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    NumExpected,
    SymExpected,
    AddrExpected,
    SymTooLong,
    TooManyDefInModule,
    TooManyUseInModule,
    TooManyInstr,
}

impl ParseErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::NumExpected => "NUM_EXPECTED",
            Self::SymExpected => "SYM_EXPECTED",
            Self::AddrExpected => "ADDR_EXPECTED",
            Self::SymTooLong => "SYM_TOO_LONG",
            Self::TooManyDefInModule => "TOO_MANY_DEF_IN_MODULE",
            Self::TooManyUseInModule => "TOO_MANY_USE_IN_MODULE",
            Self::TooManyInstr => "TOO_MANY_INSTR",
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Parse Error line {} offset {}: {kind}", .position.line, .position.offset)]
pub struct ParseError {
    pub position: Position,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: Position) -> Self {
        Self { position, kind }
    }
}

pub mod reader;
pub mod tokenizer;
