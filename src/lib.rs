pub mod cli;
pub mod diag;
pub mod format;
pub mod layout;
pub mod linker;
pub mod resolver;
pub mod symtab;

pub use linker::{link, run, LinkError, LinkReport, Limits};
