// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::error::FormatError;
use super::file_range::{table_entry_range, FileRange};
use super::header::FileHeader;
use super::ident::{ElfClass, FormatDescriptor};
use super::types::*;

use alloc::vec::Vec;
use bitflags::bitflags;

bitflags! {
    /// Attributes of a segment: whether it is readable, writable
    /// and/or executable once loaded.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags : ElfWord {
        const EXECUTE = 0x01;
        const WRITE   = 0x02;
        const READ    = 0x04;
    }
}

/// A runtime-loadable region described by one program header table
/// entry, independent of section boundaries. Segments carry no name;
/// `index` is the entry's position in the table, stable and
/// zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: ElfWord,
    pub address: ElfAddr,
    pub offset: ElfOff,
    /// Size of the segment's file image. The in-memory size may be
    /// larger; only file-backed bytes matter here.
    pub size: ElfXword,
    pub ptype: ElfWord,
    pub flags: SegmentFlags,
}

impl Segment {
    /// Unused program header entry.
    pub const PT_NULL: ElfWord = 0;
    /// Loadable segment.
    pub const PT_LOAD: ElfWord = 1;
    /// Dynamic linking information.
    pub const PT_DYNAMIC: ElfWord = 2;
    /// Interpreter path.
    pub const PT_INTERP: ElfWord = 3;
    /// Auxiliary notes.
    pub const PT_NOTE: ElfWord = 4;
    /// The program header table itself.
    pub const PT_PHDR: ElfWord = 6;
}

/// Decodes the program header table located by `hdr` into an ordered
/// sequence of [`Segment`] records. Mirrors the section table read
/// without name resolution; each entry's byte range is validated
/// individually.
///
/// # Errors
///
/// Returns [`FormatError::Malformed`] if an entry or the file range it
/// declares reaches outside the buffer.
pub(crate) fn read_segment_table(
    buf: &[u8],
    hdr: &FileHeader,
    desc: &FormatDescriptor,
) -> Result<Vec<Segment>, FormatError> {
    let count = usize::from(hdr.program_header_count);
    let entry_size = usize::from(hdr.program_header_entry_size);

    let mut segments = Vec::with_capacity(count);
    for i in 0..count {
        let range = table_entry_range(hdr.program_header_offset, entry_size, i, buf.len())?;
        let segment = read_phdr(range.slice(buf)?, i, desc);

        // The declared file image must lie within the buffer. Empty
        // images (and PT_NULL placeholders) reference no file bytes.
        if segment.ptype != Segment::PT_NULL && segment.size != 0 {
            let file_range = FileRange::try_from((segment.offset, segment.size))?;
            if file_range.offset_end > buf.len() {
                return Err(FormatError::Malformed);
            }
        }

        segments.push(segment);
    }

    Ok(segments)
}

/// Decodes one program header entry; the two classes differ in both
/// field order and widths (the flags field moved between them).
fn read_phdr(buf: &[u8], index: usize, desc: &FormatDescriptor) -> Segment {
    let (ptype, flags, offset, vaddr, filesz) = match desc.class {
        ElfClass::Elf64 => (
            desc.read_u32(&buf[0..4]),
            desc.read_u32(&buf[4..8]),
            desc.read_u64(&buf[8..16]),
            desc.read_u64(&buf[16..24]),
            desc.read_u64(&buf[32..40]),
        ),
        ElfClass::Elf32 => (
            desc.read_u32(&buf[0..4]),
            desc.read_u32(&buf[24..28]),
            ElfOff::from(desc.read_u32(&buf[4..8])),
            ElfAddr::from(desc.read_u32(&buf[8..12])),
            ElfXword::from(desc.read_u32(&buf[16..20])),
        ),
    };

    Segment {
        index: index as ElfWord,
        address: vaddr,
        offset,
        size: filesz,
        ptype,
        flags: SegmentFlags::from_bits_truncate(flags),
    }
}
