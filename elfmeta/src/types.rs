// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

//! Width-independent primitive aliases. Every on-disk field is widened
//! to these types right after decoding, so that all code past the
//! header reader is agnostic of the 32/64-bit on-disk layout split.

pub type ElfAddr = u64;
pub type ElfOff = u64;
pub type ElfHalf = u16;
pub type ElfWord = u32;
pub type ElfXword = u64;
