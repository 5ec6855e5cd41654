//! Program headers of an object.
//!
//! Segments are decoded once into [`Segment`] records in index order. Their
//! contents are not copied; they are read back from the image on demand.

use crate::{
    Result,
    elf::{ElfClass, ElfHeader},
    error::parse_phdr_error,
    flags::ParsePolicy,
    image::{ByteImage, Cursor},
};
use alloc::{format, vec::Vec};
use bitflags::bitflags;
use elf::abi::{PF_R, PF_W, PF_X, PT_DYNAMIC, PT_INTERP, PT_LOAD};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Permission bits of a segment (`p_flags`).
    pub struct SegmentFlags: u32 {
        /// Executable.
        const X = PF_X;
        /// Writable.
        const W = PF_W;
        /// Readable.
        const R = PF_R;
    }
}

/// One decoded program header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    index: usize,
    p_type: u32,
    flags: SegmentFlags,
    offset: u64,
    vaddr: u64,
    paddr: u64,
    filesz: u64,
    memsz: u64,
    align: u64,
}

impl Segment {
    fn decode(cur: &mut Cursor<'_>, index: usize) -> Result<Self> {
        let p_type = cur.read_u32()?;
        let (flags, offset, vaddr, paddr, filesz, memsz, align);
        match cur.layout().class {
            ElfClass::Elf32 => {
                offset = cur.read_word()?;
                vaddr = cur.read_word()?;
                paddr = cur.read_word()?;
                filesz = cur.read_word()?;
                memsz = cur.read_word()?;
                flags = cur.read_u32()?;
                align = cur.read_word()?;
            }
            ElfClass::Elf64 => {
                flags = cur.read_u32()?;
                offset = cur.read_word()?;
                vaddr = cur.read_word()?;
                paddr = cur.read_word()?;
                filesz = cur.read_word()?;
                memsz = cur.read_word()?;
                align = cur.read_word()?;
            }
        }
        Ok(Self {
            index,
            p_type,
            flags: SegmentFlags::from_bits_retain(flags),
            offset,
            vaddr,
            paddr,
            filesz,
            memsz,
            align,
        })
    }

    /// Position in the program header table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// `p_type`
    #[inline]
    pub fn p_type(&self) -> u32 {
        self.p_type
    }

    /// `p_flags`
    #[inline]
    pub fn flags(&self) -> SegmentFlags {
        self.flags
    }

    /// File offset of the contents.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Virtual address.
    #[inline]
    pub fn vaddr(&self) -> u64 {
        self.vaddr
    }

    /// Physical address.
    #[inline]
    pub fn paddr(&self) -> u64 {
        self.paddr
    }

    /// Size of the contents in the file.
    #[inline]
    pub fn filesz(&self) -> u64 {
        self.filesz
    }

    /// Size of the segment in memory.
    #[inline]
    pub fn memsz(&self) -> u64 {
        self.memsz
    }

    /// `p_align`
    #[inline]
    pub fn align(&self) -> u64 {
        self.align
    }

    /// Whether this is a `PT_LOAD` segment.
    #[inline]
    pub fn is_load(&self) -> bool {
        self.p_type == PT_LOAD
    }

    /// End of the file range, saturating on overflow.
    #[inline]
    pub(crate) fn file_end(&self) -> u64 {
        self.offset.saturating_add(self.filesz)
    }
}

/// The program header table.
#[derive(Clone, Debug, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub(crate) fn parse(
        image: &ByteImage,
        header: &ElfHeader,
        policy: ParsePolicy,
    ) -> Result<Self> {
        let count = header.phnum() as usize;
        let record = header.class().phdr_size() as u64;
        let stride = header.phdr_stride() as u64;
        let mut segments = Vec::with_capacity(count);
        for index in 0..count {
            let at = (index as u64)
                .checked_mul(stride)
                .and_then(|rel| header.phoff().checked_add(rel));
            let Some(at) = at.filter(|&at| image.contains(at, record)) else {
                // Only reachable when the policy accepted a truncated table.
                #[cfg(feature = "log")]
                log::warn!(
                    "[{}] program header table truncated to {} of {} entries",
                    image.name(),
                    index,
                    count
                );
                break;
            };
            let mut cur = image.cursor_at(at, header.layout())?;
            let segment = Segment::decode(&mut cur, index)?;
            if segment.filesz != 0 && !image.contains(segment.offset, segment.filesz) {
                policy.anomaly(parse_phdr_error(format!(
                    "segment {} contents [0x{:x}; 0x{:x}) lie outside the file",
                    index, segment.offset, segment.filesz
                )))?;
            }
            #[cfg(feature = "log")]
            log::trace!(
                "[{}] phdr {}: type 0x{:x} vaddr 0x{:x} filesz 0x{:x}",
                image.name(),
                index,
                segment.p_type,
                segment.vaddr,
                segment.filesz
            );
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// Number of decoded segments.
    #[inline]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the object has no program headers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segment at `index`, or `None` when out of range.
    #[inline]
    pub fn by_index(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Every segment in index order.
    #[inline]
    pub fn all(&self) -> &[Segment] {
        &self.segments
    }

    /// Iterates over the segments in index order.
    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    /// The first segment of type `p_type`.
    pub fn find(&self, p_type: u32) -> Option<&Segment> {
        self.segments.iter().find(|seg| seg.p_type == p_type)
    }

    /// Every segment of type `p_type`.
    pub fn by_type(&self, p_type: u32) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |seg| seg.p_type == p_type)
    }

    /// Whether a segment of type `p_type` exists.
    #[inline]
    pub fn contains_type(&self, p_type: u32) -> bool {
        self.find(p_type).is_some()
    }

    /// `PT_INTERP`
    #[inline]
    pub fn interp(&self) -> Option<&Segment> {
        self.find(PT_INTERP)
    }

    /// `PT_DYNAMIC`
    #[inline]
    pub fn dynamic(&self) -> Option<&Segment> {
        self.find(PT_DYNAMIC)
    }

    /// The first executable `PT_LOAD` segment.
    pub fn text(&self) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|seg| seg.is_load() && seg.flags.contains(SegmentFlags::X))
    }

    /// The first writable `PT_LOAD` segment.
    pub fn data(&self) -> Option<&Segment> {
        self.segments
            .iter()
            .find(|seg| seg.is_load() && seg.flags.contains(SegmentFlags::W))
    }

    /// Translates a virtual address to a file offset through the file ranges
    /// of the `PT_LOAD` segments.
    pub fn vaddr_to_offset(&self, addr: u64) -> Option<u64> {
        self.by_type(PT_LOAD).find_map(|seg| {
            let rel = addr.checked_sub(seg.vaddr)?;
            if rel >= seg.filesz {
                return None;
            }
            seg.offset.checked_add(rel)
        })
    }

    pub(crate) fn file_extent(&self) -> u64 {
        self.segments
            .iter()
            .map(Segment::file_end)
            .max()
            .unwrap_or(0)
    }
}

impl<'a> IntoIterator for &'a SegmentTable {
    type Item = &'a Segment;
    type IntoIter = core::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
