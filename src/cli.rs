use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use crate::linker::Limits;

fn parse_memory_cap(input: &str) -> Result<usize, String> {
    let cap = input
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid memory cap '{input}': {e}"))?;
    if cap == 0 {
        return Err("memory cap must be at least 1".to_string());
    }
    Ok(cap)
}

#[derive(Debug, Parser)]
#[command(name = "tlk", version, about = "Two-pass linker for toy relocatable modules")]
pub struct Args {
    /// Object text to link
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Stricter cap on the total instruction count (never above the machine size)
    #[arg(long = "memory-cap", value_parser = parse_memory_cap)]
    pub memory_cap: Option<usize>,

    /// Print the token stream with coordinates instead of linking
    #[arg(long = "dump-tokens")]
    pub dump_tokens: bool,

    /// One of `TRACE`, `DEBUG`, `INFO`, `WARN`, or `ERROR`
    #[arg(short, long, default_value_t = Level::WARN)]
    pub log_level: Level,
}

impl Args {
    pub fn limits(&self) -> Limits {
        Limits {
            memory_cap: self.memory_cap,
            ..Limits::default()
        }
    }
}
