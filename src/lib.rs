//! # elf_inspect
//! A `safe`, `bounds-checked` and `eager` library for inspecting ELF objects.
//! ## Usage
//! Open an object from a path with [`Object::open`], or from memory with
//! [`Object::from_bytes`]. Every table (program headers, section headers,
//! `.symtab`, `.dynsym`, the PLT and the dynamic array) is decoded up front,
//! after which the object answers lookups by name, index or address.
//!
//! Both ELF classes and both byte orders are supported. Records are decoded
//! into class-independent types, so callers never see the on-disk layout.
//! ## Load flags
//! [`LoadFlags`] select how much damage a file may have before opening fails:
//! `STRICT` rejects every anomaly, `SMART` repairs minor ones and `FORENSICS`
//! accepts anything readable, rebuilding `.dynsym` from `PT_DYNAMIC` when the
//! section headers are gone.
//! ## Example
//! ```no_run
//! use elf_inspect::{LoadFlags, Object};
//!
//! let obj = Object::open("/bin/ls", LoadFlags::empty()).unwrap();
//! println!("{} {}", obj.class().as_str(), obj.linking_type().as_str());
//! for lib in obj.needed_libraries() {
//!     println!("needs {lib}");
//! }
//! ```
#![no_std]
extern crate alloc;

pub mod arch;
pub mod dynamic;
pub mod elf;
mod error;
mod flags;
pub mod image;
mod object;
mod os;
pub mod plt;
pub mod relocation;
pub mod section;
pub mod segment;
pub mod symbol;

pub use ::elf::abi;
pub use dynamic::{DynamicInfo, DynamicTag};
pub use self::elf::{Arch, ElfClass, ElfHeader, Endian, ObjectType, SectionIndex};
pub use error::Error;
pub use flags::{BackingMode, LoadFlags, ParsePolicy};
pub use object::{LinkingType, Object};
pub use plt::{PltEntry, PltSlotKind, PltTable};
pub use section::{Section, SectionFlags, SectionTable};
pub use segment::{Segment, SegmentFlags, SegmentTable};
pub use symbol::{Symbol, SymbolTable, SymbolTableKind};

/// A type alias for `Result`s returned by `elf_inspect` functions.
///
/// This is a convenience alias that eliminates the need to repeatedly specify
/// the `Error` type in function signatures.
pub type Result<T> = core::result::Result<T, Error>;
