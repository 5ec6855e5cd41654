//! RISC-V PLT layout, shared by RV32 and RV64.
//!
//! The PLT header is eight instructions (32 bytes); each stub is four
//! instructions (16 bytes).

use super::PltLayout;
use elf::abi::*;

pub const EM_ARCH: u16 = EM_RISCV;

pub const REL_JUMP_SLOT: u32 = R_RISCV_JUMP_SLOT;
pub const REL_IRELATIVE: u32 = R_RISCV_IRELATIVE;

pub(crate) const PLT_HEADER_SIZE: u64 = 32;
pub(crate) const PLT_ENTRY_SIZE: u64 = 16;

pub(crate) const LAYOUT: PltLayout = PltLayout {
    machine: EM_ARCH,
    header_size: PLT_HEADER_SIZE,
    entry_size: PLT_ENTRY_SIZE,
    jump_slot: REL_JUMP_SLOT,
    irelative: REL_IRELATIVE,
};

/// Map riscv relocation types to human readable names
pub(crate) fn rel_type_to_str(r_type: u32) -> &'static str {
    match r_type {
        R_RISCV_NONE => "R_RISCV_NONE",
        R_RISCV_32 => "R_RISCV_32",
        R_RISCV_64 => "R_RISCV_64",
        R_RISCV_RELATIVE => "R_RISCV_RELATIVE",
        R_RISCV_COPY => "R_RISCV_COPY",
        R_RISCV_JUMP_SLOT => "R_RISCV_JUMP_SLOT",
        R_RISCV_IRELATIVE => "R_RISCV_IRELATIVE",
        _ => "UNKNOWN",
    }
}
