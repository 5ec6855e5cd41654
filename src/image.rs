//! The byte image an [`Object`](crate::Object) is parsed from.
//!
//! Every read in the crate goes through [`ByteImage::read_at`] or a [`Cursor`]
//! obtained from [`ByteImage::cursor_at`]; both check `offset + len` against
//! the image size before touching any data.

use crate::{
    Result,
    elf::{ElfClass, Endian, Layout},
    error::out_of_bounds,
    flags::BackingMode,
    os::Mapping,
};
use alloc::{string::String, vec::Vec};

/// Storage behind a [`ByteImage`].
pub(crate) enum Backing {
    /// A private heap copy.
    Heap(Vec<u8>),
    /// A memory mapping of the file.
    Mapped(Mapping),
}

/// Owned, read-only view of the raw bytes of an ELF file.
pub struct ByteImage {
    name: String,
    backing: Backing,
}

impl core::fmt::Debug for ByteImage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ByteImage")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("backing", &self.backing())
            .finish()
    }
}

impl ByteImage {
    pub(crate) fn new(name: String, backing: Backing) -> Self {
        Self { name, backing }
    }

    /// Name of the image, usually the path it was opened from.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The whole image.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.backing {
            Backing::Heap(bytes) => bytes,
            Backing::Mapped(map) => map.as_slice(),
        }
    }

    /// Length of the image in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the image is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How the image is stored.
    pub fn backing(&self) -> BackingMode {
        match &self.backing {
            Backing::Heap(_) => BackingMode::Heap,
            Backing::Mapped(map) => map.mode(),
        }
    }

    /// Returns `len` bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, len: u64) -> Result<&[u8]> {
        self.get(offset, len)
            .ok_or_else(|| out_of_bounds(offset, len, self.len() as u64))
    }

    /// Like [`read_at`](Self::read_at), but reports failure as `None`.
    pub fn get(&self, offset: u64, len: u64) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        if end > self.len() as u64 {
            return None;
        }
        Some(&self.as_bytes()[offset as usize..end as usize])
    }

    /// Whether `[offset, offset + len)` lies inside the image.
    #[inline]
    pub fn contains(&self, offset: u64, len: u64) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.len() as u64)
    }

    /// A cursor positioned at `offset`, decoding with `layout`.
    pub fn cursor_at(&self, offset: u64, layout: Layout) -> Result<Cursor<'_>> {
        if offset > self.len() as u64 {
            return Err(out_of_bounds(offset, 0, self.len() as u64));
        }
        Ok(Cursor {
            image: self.as_bytes(),
            pos: offset as usize,
            layout,
        })
    }

    /// The NUL-terminated UTF-8 string starting at `offset`.
    ///
    /// The terminator must be found before the end of the image.
    pub fn cstr_at(&self, offset: u64) -> Option<&str> {
        let offset = usize::try_from(offset).ok()?;
        cstr_from(self.as_bytes().get(offset..)?)
    }
}

/// Reads a NUL-terminated UTF-8 string from the start of `bytes`.
pub(crate) fn cstr_from(bytes: &[u8]) -> Option<&str> {
    let end = bytes.iter().position(|&b| b == 0)?;
    core::str::from_utf8(&bytes[..end]).ok()
}

/// A bounds-checked reader over a [`ByteImage`].
///
/// Multi-byte values are decoded in the byte order of the cursor's [`Layout`];
/// `word` values are 4 or 8 bytes depending on its class.
#[derive(Clone, Copy)]
pub struct Cursor<'image> {
    image: &'image [u8],
    pos: usize,
    layout: Layout,
}

impl<'image> Cursor<'image> {
    /// Current absolute offset in the image.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.pos as u64
    }

    /// The layout used for decoding.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Bytes left until the end of the image.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.image.len() - self.pos
    }

    /// The unread part of the image.
    #[inline]
    pub fn rest(&self) -> &'image [u8] {
        &self.image[self.pos..]
    }

    /// Advances by `len` bytes.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    /// Reads `len` raw bytes.
    pub fn bytes(&mut self, len: usize) -> Result<&'image [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.image.len())
            .ok_or_else(|| out_of_bounds(self.pos as u64, len as u64, self.image.len() as u64))?;
        let bytes = &self.image[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Reads a byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    /// Reads a 16-bit value.
    pub fn read_u16(&mut self) -> Result<u16> {
        let raw = self.array()?;
        Ok(match self.layout.endian {
            Endian::Little => u16::from_le_bytes(raw),
            Endian::Big => u16::from_be_bytes(raw),
        })
    }

    /// Reads a 32-bit value.
    pub fn read_u32(&mut self) -> Result<u32> {
        let raw = self.array()?;
        Ok(match self.layout.endian {
            Endian::Little => u32::from_le_bytes(raw),
            Endian::Big => u32::from_be_bytes(raw),
        })
    }

    /// Reads a 64-bit value.
    pub fn read_u64(&mut self) -> Result<u64> {
        let raw = self.array()?;
        Ok(match self.layout.endian {
            Endian::Little => u64::from_le_bytes(raw),
            Endian::Big => u64::from_be_bytes(raw),
        })
    }

    /// Reads an unsigned address-sized word, widened to 64 bits.
    pub fn read_word(&mut self) -> Result<u64> {
        match self.layout.class {
            ElfClass::Elf32 => self.read_u32().map(u64::from),
            ElfClass::Elf64 => self.read_u64(),
        }
    }

    /// Reads a signed address-sized word, sign-extended to 64 bits.
    pub fn read_sword(&mut self) -> Result<i64> {
        match self.layout.class {
            ElfClass::Elf32 => self.read_u32().map(|v| v as i32 as i64),
            ElfClass::Elf64 => self.read_u64().map(|v| v as i64),
        }
    }
}
