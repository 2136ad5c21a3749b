use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkFault {
    #[error("Absolute address exceeds machine size; zero used")]
    AbsoluteOutOfRange,
    #[error("Relative address exceeds module size; zero used")]
    RelativeOutOfRange,
    #[error("External address exceeds length of uselist; treated as immediate")]
    ExternalOutOfRange,
    #[error("{symbol} is not defined; zero used")]
    Undefined { symbol: String },
    #[error("This variable is multiple times defined; first value used")]
    MultiplyDefined,
    #[error("Illegal immediate value; treated as 9999")]
    IllegalImmediate,
    #[error("Illegal opcode; treated as 9999")]
    IllegalOpcode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    TooBig {
        module: usize,
        symbol: String,
        value: u32,
        max: i64,
    },
    Redefined { module: usize, symbol: String },
    UnusedUse { module: usize, symbol: String },
    UnusedDefinition { module: usize, symbol: String },
}

impl Warning {
    pub fn module(&self) -> usize {
        match self {
            Self::TooBig { module, .. }
            | Self::Redefined { module, .. }
            | Self::UnusedUse { module, .. }
            | Self::UnusedDefinition { module, .. } => *module,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Warning: Module {}: ", self.module())?;
        match self {
            Self::TooBig {
                symbol, value, max, ..
            } => write!(f, "{symbol} too big {value} (max={max}) assume zero relative"),
            Self::Redefined { symbol, .. } => write!(f, "{symbol} redefined and ignored"),
            Self::UnusedUse { symbol, .. } => {
                write!(f, "{symbol} appeared in the uselist but was not actually used")
            }
            Self::UnusedDefinition { symbol, .. } => {
                write!(f, "{symbol} was defined but never used")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LinkFault, Warning};

    #[test]
    fn fault_messages_embed_the_symbol() {
        let fault = LinkFault::Undefined {
            symbol: "xyz".to_string(),
        };
        assert_eq!(fault.to_string(), "xyz is not defined; zero used");
    }

    #[test]
    fn warnings_carry_module_prefix() {
        let too_big = Warning::TooBig {
            module: 2,
            symbol: "X".to_string(),
            value: 5,
            max: 1,
        };
        assert_eq!(
            too_big.to_string(),
            "Warning: Module 2: X too big 5 (max=1) assume zero relative"
        );
        let unused = Warning::UnusedUse {
            module: 1,
            symbol: "q".to_string(),
        };
        assert_eq!(
            unused.to_string(),
            "Warning: Module 1: q appeared in the uselist but was not actually used"
        );
    }
}
