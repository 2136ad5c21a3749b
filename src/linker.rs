use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, trace};

use crate::cli::Args;
use crate::diag::Warning;
use crate::format::reader::{ModuleRecord, Reader};
use crate::format::tokenizer::Tokenizer;
use crate::format::ParseError;
use crate::layout::{LayoutCursor, ModuleLayout};
use crate::resolver::{resolve_instruction, MemoryMap, ModuleScope, UseSlot};
use crate::symtab::{Insertion, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub machine_size: usize,
    pub max_list_entries: usize,
    pub max_symbol_len: usize,
    pub memory_cap: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            machine_size: 512,
            max_list_entries: 16,
            max_symbol_len: 16,
            memory_cap: None,
        }
    }
}

impl Limits {
    pub fn instruction_budget(&self) -> usize {
        self.memory_cap
            .map_or(self.machine_size, |cap| cap.min(self.machine_size))
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("failed to write link report")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub symbols: SymbolTable,
    pub memory: MemoryMap,
    pub pass_one_layout: Vec<ModuleLayout>,
    pub pass_two_layout: Vec<ModuleLayout>,
    pub warnings: Vec<Warning>,
}

/// Links `source` and writes the console transcript to `out`.
///
/// A fatal parse error is written to `out` as its final line before it is
/// returned.
pub fn link<S, W>(source: &S, limits: &Limits, out: &mut W) -> Result<LinkReport, LinkError>
where
    S: AsRef<[u8]> + ?Sized,
    W: Write,
{
    let mut linker = Linker {
        reader: Reader::new(source.as_ref(), *limits),
        limits: *limits,
        symbols: SymbolTable::new(),
        memory: MemoryMap::new(),
        warnings: Vec::new(),
        out,
    };
    match linker.link() {
        Err(LinkError::Parse(err)) => {
            writeln!(linker.out, "{err}")?;
            Err(err.into())
        }
        other => other,
    }
}

struct Linker<'a, 'w, W: Write> {
    reader: Reader<'a>,
    limits: Limits,
    symbols: SymbolTable,
    memory: MemoryMap,
    warnings: Vec<Warning>,
    out: &'w mut W,
}

impl<W: Write> Linker<'_, '_, W> {
    fn link(&mut self) -> Result<LinkReport, LinkError> {
        debug!("starting pass 1");
        let pass_one_layout = self.pass_one()?;
        debug!(
            modules = pass_one_layout.len(),
            symbols = self.symbols.iter().count(),
            "pass 1 complete"
        );

        self.reader.rewind();

        debug!("starting pass 2");
        let pass_two_layout = self.pass_two()?;
        debug!(words = self.memory.len(), "pass 2 complete");

        Ok(LinkReport {
            symbols: std::mem::take(&mut self.symbols),
            memory: std::mem::take(&mut self.memory),
            pass_one_layout,
            pass_two_layout,
            warnings: std::mem::take(&mut self.warnings),
        })
    }

    fn pass_one(&mut self) -> Result<Vec<ModuleLayout>, LinkError> {
        let mut cursor = LayoutCursor::new();
        while !self.reader.at_end() {
            let record = self.reader.read_module(true, cursor.used())?;
            let layout = cursor.place(record.size());
            trace!(?layout, definitions = record.definitions.len(), "pass 1 module");
            self.define_symbols(&record, layout)?;
        }

        writeln!(self.out, "Symbol Table")?;
        for entry in self.symbols.iter() {
            writeln!(self.out, "{entry}")?;
        }
        writeln!(self.out)?;
        Ok(cursor.finish())
    }

    fn define_symbols(
        &mut self,
        record: &ModuleRecord<'_>,
        layout: ModuleLayout,
    ) -> Result<(), LinkError> {
        for def in &record.definitions {
            let value = if self.symbols.contains(def.name) {
                0
            } else if (def.offset as usize) < layout.size {
                u32::try_from(layout.base + def.offset as usize).unwrap_or(u32::MAX)
            } else {
                self.warn(Warning::TooBig {
                    module: layout.index,
                    symbol: def.name.to_string(),
                    value: def.offset,
                    max: layout.size as i64 - 1,
                })?;
                u32::try_from(layout.base).unwrap_or(u32::MAX)
            };
            if self.symbols.define(def.name, value, layout.index) == Insertion::Redefined {
                self.warn(Warning::Redefined {
                    module: layout.index,
                    symbol: def.name.to_string(),
                })?;
            }
        }
        Ok(())
    }

    fn pass_two(&mut self) -> Result<Vec<ModuleLayout>, LinkError> {
        let mut cursor = LayoutCursor::new();
        while !self.reader.at_end() {
            let record = self.reader.read_module(false, cursor.used())?;
            let layout = cursor.place(record.size());
            trace!(?layout, uses = record.uses.len(), "pass 2 module");

            let mut uses = record.uses.iter().copied().map(UseSlot::new).collect::<Vec<_>>();
            let mut scope = ModuleScope {
                layout,
                uses: &mut uses,
            };
            for inst in &record.instructions {
                let resolution = resolve_instruction(
                    inst.word,
                    inst.mode,
                    &mut scope,
                    &mut self.symbols,
                    self.limits.machine_size,
                );
                if self.memory.is_empty() {
                    writeln!(self.out, "Memory Map")?;
                }
                let entry = self.memory.push(resolution);
                writeln!(self.out, "{entry}")?;
            }

            for slot in uses.iter().filter(|slot| !slot.referenced) {
                self.warn(Warning::UnusedUse {
                    module: layout.index,
                    symbol: slot.symbol.to_string(),
                })?;
            }
        }

        writeln!(self.out)?;
        let unused = self
            .symbols
            .unreferenced()
            .map(|entry| Warning::UnusedDefinition {
                module: entry.module,
                symbol: entry.name.clone(),
            })
            .collect::<Vec<_>>();
        for warning in unused {
            self.warn(warning)?;
        }
        writeln!(self.out)?;
        Ok(cursor.finish())
    }

    fn warn(&mut self, warning: Warning) -> io::Result<()> {
        writeln!(self.out, "{warning}")?;
        self.warnings.push(warning);
        Ok(())
    }
}

pub fn dump_tokens<S, W>(source: &S, out: &mut W) -> io::Result<()>
where
    S: AsRef<[u8]> + ?Sized,
    W: Write,
{
    let mut tokens = Tokenizer::new(source.as_ref());
    for token in tokens.by_ref() {
        let text = String::from_utf8_lossy(token.text);
        writeln!(out, "Token: {}:{} : {}", token.line, token.offset, text)?;
    }
    let end = tokens.end_position();
    writeln!(out, "Final Spot in File : line={} offset={}", end.line, end.offset)
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let source = read_input(&args.input)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.dump_tokens {
        dump_tokens(&source, &mut out)?;
        out.flush()?;
        return Ok(());
    }

    let limits = args.limits();
    let result = link(&source, &limits, &mut out);
    out.flush()?;
    let report = match result {
        Ok(report) => report,
        Err(LinkError::Parse(err)) => return Err(err.into()),
        Err(LinkError::Io(err)) => return Err(err).context("failed to write link report"),
    };
    debug!(
        symbols = report.symbols.iter().count(),
        words = report.memory.len(),
        warnings = report.warnings.len(),
        "link finished"
    );
    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path)
        .with_context(|| format!("Unable to open input file: {}", path.display()))
}
