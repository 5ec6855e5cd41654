//! Parsing the `.dynamic` section
//!
//! The dynamic array is located through the `SHT_DYNAMIC` section, or through
//! the `PT_DYNAMIC` segment when the section headers are missing. Strings
//! (needed libraries, soname, search paths) are resolved through the dynamic
//! string table.

use crate::{
    Result,
    elf::{DF_1_PIE, Layout},
    error::parse_dynamic_error,
    flags::ParsePolicy,
    image::{ByteImage, cstr_from},
    section::SectionTable,
    segment::SegmentTable,
};
use alloc::{
    format,
    string::{String, ToString},
    vec::Vec,
};
use elf::abi::*;

/// One entry of the dynamic array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DynamicTag {
    tag: i64,
    value: u64,
}

impl DynamicTag {
    /// `d_tag`
    #[inline]
    pub fn tag(&self) -> i64 {
        self.tag
    }

    /// `d_un`
    #[inline]
    pub fn value(&self) -> u64 {
        self.value
    }
}

/// Where the dynamic array was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DynamicSource {
    /// The `SHT_DYNAMIC` section with this index.
    Section(usize),
    /// The `PT_DYNAMIC` segment with this index.
    Segment(usize),
}

/// Information in the dynamic section
#[derive(Clone, Debug)]
pub struct DynamicInfo {
    source: DynamicSource,
    offset: u64,
    entries: Vec<DynamicTag>,
    /// DT_NEEDED
    needed: Vec<String>,
    /// DT_SONAME
    soname: Option<String>,
    /// DT_RPATH
    rpath: Option<String>,
    /// DT_RUNPATH
    runpath: Option<String>,
    /// DT_FLAGS
    flags: u64,
    /// DT_FLAGS_1
    flags_1: u64,
    /// DT_DEBUG
    has_debug: bool,
}

impl DynamicInfo {
    /// Locates and decodes the dynamic array; `Ok(None)` when the object has
    /// none.
    pub(crate) fn parse(
        image: &ByteImage,
        layout: Layout,
        sections: &SectionTable,
        segments: &SegmentTable,
        policy: ParsePolicy,
    ) -> Result<Option<Self>> {
        let (source, offset, size, strtab_section) =
            if let Some(sec) = sections.find_by_type(SHT_DYNAMIC) {
                (
                    DynamicSource::Section(sec.index()),
                    sec.offset(),
                    sec.size(),
                    Some(sec.link() as usize),
                )
            } else if let Some(seg) = segments.dynamic() {
                (
                    DynamicSource::Segment(seg.index()),
                    seg.offset(),
                    seg.filesz(),
                    None,
                )
            } else {
                return Ok(None);
            };

        if !image.contains(offset, size) {
            policy.anomaly(parse_dynamic_error(format!(
                "dynamic array [0x{:x}; 0x{:x}) lies outside the file",
                offset, size
            )))?;
        }

        let entry_size = layout.class.dyn_size() as u64;
        let mut entries = Vec::new();
        for index in 0..size / entry_size {
            let at = offset.saturating_add(index * entry_size);
            if !image.contains(at, entry_size) {
                break;
            }
            let mut cur = image.cursor_at(at, layout)?;
            let tag = cur.read_sword()?;
            let value = cur.read_word()?;
            if tag == DT_NULL {
                break;
            }
            entries.push(DynamicTag { tag, value });
        }

        // The section link is authoritative; the DT_STRTAB address is the fallback.
        let strtab = strtab_section
            .and_then(|idx| sections.by_index(idx))
            .and_then(|sec| sec.data(image))
            .or_else(|| {
                let addr = entries.iter().find(|e| e.tag == DT_STRTAB)?.value;
                let size = entries
                    .iter()
                    .find(|e| e.tag == DT_STRSZ)
                    .map(|e| e.value);
                let start = segments.vaddr_to_offset(addr)?;
                let avail = (image.len() as u64).saturating_sub(start);
                image.get(start, size.map_or(avail, |size| size.min(avail)))
            });

        let string = |value: u64| -> Option<String> {
            strtab?
                .get(usize::try_from(value).ok()?..)
                .and_then(cstr_from)
                .map(ToString::to_string)
        };

        let mut needed = Vec::new();
        let mut soname = None;
        let mut rpath = None;
        let mut runpath = None;
        let mut flags = 0;
        let mut flags_1 = 0;
        let mut has_debug = false;
        for entry in &entries {
            match entry.tag {
                DT_NEEDED => match string(entry.value) {
                    Some(name) => needed.push(name),
                    None => policy.anomaly(parse_dynamic_error(format!(
                        "DT_NEEDED string at 0x{:x} is not readable",
                        entry.value
                    )))?,
                },
                DT_SONAME => soname = string(entry.value),
                DT_RPATH => rpath = string(entry.value),
                DT_RUNPATH => runpath = string(entry.value),
                DT_FLAGS => flags = entry.value,
                DT_FLAGS_1 => flags_1 = entry.value,
                DT_DEBUG => has_debug = true,
                _ => {}
            }
        }

        #[cfg(feature = "log")]
        log::debug!(
            "[{}] dynamic: {} entries, needed {:?}",
            image.name(),
            entries.len(),
            needed
        );
        Ok(Some(Self {
            source,
            offset,
            entries,
            needed,
            soname,
            rpath,
            runpath,
            flags,
            flags_1,
            has_debug,
        }))
    }

    /// Where the dynamic array was found.
    #[inline]
    pub fn source(&self) -> DynamicSource {
        self.source
    }

    /// File offset of the dynamic array.
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of entries before `DT_NULL`.
    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Entries before `DT_NULL`, in file order.
    #[inline]
    pub fn entries(&self) -> &[DynamicTag] {
        &self.entries
    }

    /// Value of the first entry with tag `tag`.
    pub fn find(&self, tag: i64) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.tag == tag)
            .map(|entry| entry.value)
    }

    /// Every value carried by entries with tag `tag`.
    pub fn find_all(&self, tag: i64) -> impl Iterator<Item = u64> + '_ {
        self.entries
            .iter()
            .filter(move |entry| entry.tag == tag)
            .map(|entry| entry.value)
    }

    /// DT_NEEDED names, in file order.
    #[inline]
    pub fn needed(&self) -> &[String] {
        &self.needed
    }

    /// DT_SONAME
    #[inline]
    pub fn soname(&self) -> Option<&str> {
        self.soname.as_deref()
    }

    /// DT_RPATH
    #[inline]
    pub fn rpath(&self) -> Option<&str> {
        self.rpath.as_deref()
    }

    /// DT_RUNPATH
    #[inline]
    pub fn runpath(&self) -> Option<&str> {
        self.runpath.as_deref()
    }

    /// DT_FLAGS
    #[inline]
    pub fn flags(&self) -> u64 {
        self.flags
    }

    /// DT_FLAGS_1
    #[inline]
    pub fn flags_1(&self) -> u64 {
        self.flags_1
    }

    /// Whether a DT_DEBUG slot is present.
    #[inline]
    pub fn has_debug(&self) -> bool {
        self.has_debug
    }

    /// Whether DT_FLAGS_1 marks the object as a position-independent
    /// executable.
    #[inline]
    pub fn is_pie(&self) -> bool {
        self.flags_1 & DF_1_PIE != 0
    }
}
