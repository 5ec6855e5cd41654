use crate::{Result, error::io_error, flags::BackingMode, image::Backing};

/// Targets without a file system never produce mappings.
pub(crate) enum Mapping {}

impl Mapping {
    pub(crate) fn as_slice(&self) -> &[u8] {
        match *self {}
    }

    pub(crate) fn mode(&self) -> BackingMode {
        match *self {}
    }
}

pub(crate) fn load(path: &str, _mode: BackingMode) -> Result<Backing> {
    Err(io_error(alloc::format!(
        "{path}: opening by path is not supported on this target"
    )))
}
