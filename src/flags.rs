//! Load-mode flags and the parse policy derived from them.

use crate::{Error, Result};
use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    /// Flags controlling how an [`Object`](crate::Object) is loaded.
    ///
    /// They can be combined with bitwise OR. Policy flags decide how anomalies are
    /// treated; the remaining flags only decide where the bytes come from.
    pub struct LoadFlags: u64 {
        /// Reject any structural anomaly by failing the open.
        const STRICT = 1 << 0;

        /// Recover from minor anomalies with best-effort heuristics.
        const SMART = 1 << 1;

        /// Maximum tolerance for corrupted or hostile binaries. Declared sizes are
        /// always cross-checked against the real image length.
        const FORENSICS = 1 << 2;

        /// Open with intent to modify. The image is backed by writable memory.
        const MODIFY = 1 << 3;

        /// Userland-exec context. The image is read into a private heap buffer.
        const ULEXEC = 1 << 4;

        /// Together with `MODIFY`, back the image with a shared writable mapping.
        const MAP_WRITE = 1 << 5;

        /// Container context. The image is read into a private heap buffer.
        const LXC_MODE = 1 << 6;
    }
}

/// How strictly structural anomalies are treated while parsing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParsePolicy {
    /// Fail on any anomaly.
    Strict,
    /// Fail on anomalies that make a mandatory table unusable.
    Default,
    /// Repair minor anomalies.
    Smart,
    /// Accept anything that can be read without leaving the image.
    Forensics,
}

impl ParsePolicy {
    /// Whether this policy fails the open on every anomaly.
    #[inline]
    pub fn is_strict(self) -> bool {
        self == ParsePolicy::Strict
    }

    /// Whether a header table extending past the image may be truncated rather
    /// than rejected.
    #[inline]
    pub fn tolerates_truncation(self) -> bool {
        self >= ParsePolicy::Smart
    }

    /// Whether missing tables may be reconstructed from other metadata.
    #[inline]
    pub fn reconstructs(self) -> bool {
        self == ParsePolicy::Forensics
    }

    /// Reports a minor anomaly: fatal only under [`ParsePolicy::Strict`].
    pub(crate) fn anomaly(self, err: Error) -> Result<()> {
        if self.is_strict() {
            return Err(err);
        }
        #[cfg(feature = "log")]
        log::warn!("[{:?}] tolerated: {}", self, err);
        Ok(())
    }

    /// Reports a table that does not fit in the image: fatal unless the policy
    /// tolerates truncation.
    pub(crate) fn truncation(self, err: Error) -> Result<()> {
        if !self.tolerates_truncation() {
            return Err(err);
        }
        #[cfg(feature = "log")]
        log::warn!("[{:?}] truncated: {}", self, err);
        Ok(())
    }
}

/// Where the byte image of a path-opened object is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackingMode {
    /// The file is read into a heap buffer.
    Heap,
    /// Private read-only mapping.
    MapReadOnly,
    /// Private copy-on-write mapping.
    MapPrivateWrite,
    /// Shared writable mapping of the file.
    MapSharedWrite,
}

impl LoadFlags {
    /// The parse policy selected by these flags.
    ///
    /// `FORENSICS` wins over `SMART`, which wins over `STRICT`.
    pub fn policy(self) -> ParsePolicy {
        if self.contains(LoadFlags::FORENSICS) {
            ParsePolicy::Forensics
        } else if self.contains(LoadFlags::SMART) {
            ParsePolicy::Smart
        } else if self.contains(LoadFlags::STRICT) {
            ParsePolicy::Strict
        } else {
            ParsePolicy::Default
        }
    }

    /// The backing store used when opening from a path.
    pub fn backing_mode(self) -> BackingMode {
        if self.intersects(LoadFlags::ULEXEC | LoadFlags::LXC_MODE) {
            BackingMode::Heap
        } else if self.contains(LoadFlags::MODIFY | LoadFlags::MAP_WRITE) {
            BackingMode::MapSharedWrite
        } else if self.contains(LoadFlags::MODIFY) {
            BackingMode::MapPrivateWrite
        } else {
            BackingMode::MapReadOnly
        }
    }
}
