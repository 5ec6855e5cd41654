use alloc::borrow::Cow;
use core::fmt::Display;

/// Error types used throughout the `elf_inspect` library.
///
/// Every variant renders a human-readable message through [`Display`], which is
/// what callers are expected to show to users. Lookups that simply find nothing
/// never produce an [`Error`]; they return `None`.
#[derive(Debug)]
pub enum Error {
    /// An error occurred while opening or reading an ELF file.
    ///
    /// This error typically indicates issues such as:
    /// * File not found
    /// * Permission denied
    /// * The path does not name a regular file
    Io {
        /// A descriptive message about the I/O error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while mapping the file into memory.
    Mmap {
        /// A descriptive message about the memory mapping error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while parsing the ELF header.
    ///
    /// This error typically indicates issues with the ELF header such as:
    /// * Invalid magic bytes
    /// * Unsupported ELF class or data encoding
    /// * A truncated header
    /// * Header tables that lie outside of the file
    ParseEhdr {
        /// A descriptive message about the ELF header parsing error.
        msg: Cow<'static, str>,
    },

    /// A program header failed validation.
    ParsePhdr {
        /// A descriptive message about the program header parsing error.
        msg: Cow<'static, str>,
    },

    /// A section header failed validation.
    ParseShdr {
        /// A descriptive message about the section header parsing error.
        msg: Cow<'static, str>,
    },

    /// A symbol table failed validation.
    ParseSymbol {
        /// A descriptive message about the symbol table parsing error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while parsing the dynamic section.
    ParseDynamic {
        /// A descriptive message about the dynamic section parsing error.
        msg: Cow<'static, str>,
    },

    /// A read would have gone past the end of the byte image.
    OutOfBounds {
        /// Requested start offset.
        offset: u64,
        /// Requested length.
        len: u64,
        /// Total size of the image.
        size: u64,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Io { msg } => write!(f, "I/O error: {msg}"),
            Error::Mmap { msg } => write!(f, "Memory mapping error: {msg}"),
            Error::ParseEhdr { msg } => write!(f, "ELF header parsing error: {msg}"),
            Error::ParsePhdr { msg } => write!(f, "Program header parsing error: {msg}"),
            Error::ParseShdr { msg } => write!(f, "Section header parsing error: {msg}"),
            Error::ParseSymbol { msg } => write!(f, "Symbol table parsing error: {msg}"),
            Error::ParseDynamic { msg } => write!(f, "Dynamic section parsing error: {msg}"),
            Error::OutOfBounds { offset, len, size } => write!(
                f,
                "Out of bounds read: offset 0x{offset:x} length 0x{len:x} exceeds image size 0x{size:x}"
            ),
        }
    }
}

impl core::error::Error for Error {}

/// Creates an I/O error with the specified message.
#[cold]
#[inline(never)]
#[allow(unused)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

/// Creates a memory mapping error with the specified message.
#[cold]
#[inline(never)]
#[allow(unused)]
pub(crate) fn mmap_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Mmap { msg: msg.into() }
}

/// Creates an ELF header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_ehdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseEhdr { msg: msg.into() }
}

/// Creates a program header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_phdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParsePhdr { msg: msg.into() }
}

/// Creates a section header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_shdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseShdr { msg: msg.into() }
}

/// Creates a symbol table parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_symbol_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseSymbol { msg: msg.into() }
}

/// Creates a dynamic section parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_dynamic_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseDynamic { msg: msg.into() }
}

/// Creates an out-of-bounds error for the given access.
#[cold]
#[inline(never)]
pub(crate) fn out_of_bounds(offset: u64, len: u64, size: u64) -> Error {
    Error::OutOfBounds { offset, len, size }
}
