use std::collections::HashMap;
use std::fmt;

use crate::diag::LinkFault;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub value: u32,
    pub module: usize,
    pub multiply_defined: bool,
    pub referenced: bool,
}

impl fmt::Display for SymbolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if self.multiply_defined {
            write!(f, " Error: {}", LinkFault::MultiplyDefined)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Created,
    Redefined,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, value: u32, module: usize) -> Insertion {
        if let Some(&slot) = self.index.get(name) {
            self.entries[slot].multiply_defined = true;
            return Insertion::Redefined;
        }
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(SymbolEntry {
            name: name.to_string(),
            value,
            module,
            multiply_defined: false,
            referenced: false,
        });
        Insertion::Created
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    pub fn reference(&mut self, name: &str) -> Option<u32> {
        let slot = *self.index.get(name)?;
        let entry = &mut self.entries[slot];
        entry.referenced = true;
        Some(entry.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    pub fn unreferenced(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter().filter(|entry| !entry.referenced)
    }
}
