//! ELF (Executable and Linkable Format) data structures and utilities.

mod defs;
mod ehdr;

// Internal module re-exports for use within the crate
pub(crate) use defs::{DF_1_PIE, IDENT_SIZE};

// Public API exports
pub use defs::{ElfClass, Endian, Layout, SectionIndex};
pub use ehdr::{Arch, ElfHeader, ObjectType};
