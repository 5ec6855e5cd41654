//! AArch64 PLT layout.
//!
//! The PLT header is eight instructions (32 bytes); each stub is four
//! instructions (16 bytes).

use super::PltLayout;
use elf::abi::*;

/// The ELF machine type for AArch64 architecture.
pub const EM_ARCH: u16 = EM_AARCH64;

/// PLT jump slot relocation type.
pub const REL_JUMP_SLOT: u32 = R_AARCH64_JUMP_SLOT;
/// IRELATIVE relocation type.
pub const REL_IRELATIVE: u32 = R_AARCH64_IRELATIVE;

pub(crate) const PLT_HEADER_SIZE: u64 = 32;
pub(crate) const PLT_ENTRY_SIZE: u64 = 16;

pub(crate) const LAYOUT: PltLayout = PltLayout {
    machine: EM_ARCH,
    header_size: PLT_HEADER_SIZE,
    entry_size: PLT_ENTRY_SIZE,
    jump_slot: REL_JUMP_SLOT,
    irelative: REL_IRELATIVE,
};

/// Map aarch64 relocation types to human readable names
pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_AARCH64_NONE => "R_AARCH64_NONE",
        R_AARCH64_ABS64 => "R_AARCH64_ABS64",
        R_AARCH64_COPY => "R_AARCH64_COPY",
        R_AARCH64_GLOB_DAT => "R_AARCH64_GLOB_DAT",
        R_AARCH64_JUMP_SLOT => "R_AARCH64_JUMP_SLOT",
        R_AARCH64_RELATIVE => "R_AARCH64_RELATIVE",
        R_AARCH64_IRELATIVE => "R_AARCH64_IRELATIVE",
        _ => "UNKNOWN",
    }
}
