use std::fmt;

use crate::diag::LinkFault;
use crate::layout::ModuleLayout;
use crate::symtab::SymbolTable;

pub const ILLEGAL_WORD: u32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate,
    Absolute,
    External,
    Relative,
}

impl AddressingMode {
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'I' => Some(Self::Immediate),
            b'A' => Some(Self::Absolute),
            b'E' => Some(Self::External),
            b'R' => Some(Self::Relative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseSlot<'a> {
    pub symbol: &'a str,
    pub referenced: bool,
}

impl<'a> UseSlot<'a> {
    pub fn new(symbol: &'a str) -> Self {
        Self {
            symbol,
            referenced: false,
        }
    }
}

pub struct ModuleScope<'u, 'a> {
    pub layout: ModuleLayout,
    pub uses: &'u mut [UseSlot<'a>],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: u32,
    pub fault: Option<LinkFault>,
}

impl Resolution {
    fn ok(value: u32) -> Self {
        Self { value, fault: None }
    }

    fn faulted(value: u32, fault: LinkFault) -> Self {
        Self {
            value,
            fault: Some(fault),
        }
    }
}

/// Rewrites one instruction word according to its addressing mode.
///
/// External references mark both the use-list slot and the symbol as
/// referenced, even when they end up faulting on an undefined name.
pub fn resolve_instruction(
    word: u32,
    mode: AddressingMode,
    scope: &mut ModuleScope<'_, '_>,
    symbols: &mut SymbolTable,
    machine_size: usize,
) -> Resolution {
    let opcode = word / 1000;
    let operand = word % 1000;
    let operand_index = operand as usize;
    if opcode >= 10 {
        let fault = if mode == AddressingMode::Immediate {
            LinkFault::IllegalImmediate
        } else {
            LinkFault::IllegalOpcode
        };
        return Resolution::faulted(ILLEGAL_WORD, fault);
    }

    let base = to_word(scope.layout.base);
    match mode {
        AddressingMode::Immediate => Resolution::ok(word),
        AddressingMode::Absolute => {
            if operand_index >= machine_size {
                Resolution::faulted(opcode * 1000, LinkFault::AbsoluteOutOfRange)
            } else {
                Resolution::ok(word)
            }
        }
        AddressingMode::Relative => {
            if operand_index >= scope.layout.size {
                Resolution::faulted(opcode * 1000 + base, LinkFault::RelativeOutOfRange)
            } else {
                Resolution::ok(word + base)
            }
        }
        AddressingMode::External => {
            let Some(slot) = scope.uses.get_mut(operand_index) else {
                return Resolution::faulted(word, LinkFault::ExternalOutOfRange);
            };
            slot.referenced = true;
            match symbols.reference(slot.symbol) {
                Some(value) => Resolution::ok(opcode * 1000 + value),
                None => Resolution::faulted(
                    opcode * 1000,
                    LinkFault::Undefined {
                        symbol: slot.symbol.to_string(),
                    },
                ),
            }
        }
    }
}

fn to_word(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryEntry {
    pub address: usize,
    pub value: u32,
    pub fault: Option<LinkFault>,
}

impl fmt::Display for MemoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}: {:04}", self.address, self.value)?;
        if let Some(fault) = &self.fault {
            write!(f, " Error: {fault}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryMap {
    entries: Vec<MemoryEntry>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resolution: Resolution) -> &MemoryEntry {
        let address = self.entries.len();
        self.entries.push(MemoryEntry {
            address,
            value: resolution.value,
            fault: resolution.fault,
        });
        &self.entries[address]
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
