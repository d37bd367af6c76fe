// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::error::FormatError;
use super::ident::{ElfClass, FormatDescriptor};
use super::types::*;

/// The decoded fixed-size ELF file header, width-independent: every
/// offset, size and count is widened to the common 64-bit
/// representation regardless of the source class. This is the seam
/// that absorbs the 32/64-bit layout split; everything downstream of
/// [`FileHeader::read`] is width-agnostic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Virtual address of the program entry point.
    pub entry_point: ElfAddr,
    /// File offset of the section header table.
    pub section_header_offset: ElfOff,
    /// Size of one section header table entry.
    pub section_header_entry_size: ElfHalf,
    /// Number of section header table entries.
    pub section_header_count: ElfHalf,
    /// Index of the section holding the section name string table.
    pub section_name_table_index: ElfHalf,
    /// File offset of the program header table.
    pub program_header_offset: ElfOff,
    /// Size of one program header table entry.
    pub program_header_entry_size: ElfHalf,
    /// Number of program header table entries.
    pub program_header_count: ElfHalf,
}

impl FileHeader {
    /// Decodes the file header at offset 0 of `buf` using the layout
    /// selected by `desc` and validates that both header tables it
    /// declares lie within the buffer. A zero-count table is valid and
    /// yields an empty sequence downstream, not an error.
    ///
    /// # Errors
    ///
    /// - [`FormatError::NotElf`]: the buffer is too short to hold the
    ///   fixed-size header for the detected class.
    /// - [`FormatError::Malformed`]: the declared header size does not
    ///   match the expected size for the class, a declared entry size
    ///   is below the class minimum, or a table range reaches outside
    ///   the buffer.
    pub fn read(buf: &[u8], desc: &FormatDescriptor) -> Result<Self, FormatError> {
        if buf.len() < desc.class.ehdr_size() {
            return Err(FormatError::NotElf);
        }

        let hdr = match desc.class {
            ElfClass::Elf64 => Self {
                entry_point: desc.read_u64(&buf[24..32]),
                program_header_offset: desc.read_u64(&buf[32..40]),
                section_header_offset: desc.read_u64(&buf[40..48]),
                program_header_entry_size: desc.read_u16(&buf[54..56]),
                program_header_count: desc.read_u16(&buf[56..58]),
                section_header_entry_size: desc.read_u16(&buf[58..60]),
                section_header_count: desc.read_u16(&buf[60..62]),
                section_name_table_index: desc.read_u16(&buf[62..64]),
            },
            ElfClass::Elf32 => Self {
                entry_point: ElfAddr::from(desc.read_u32(&buf[24..28])),
                program_header_offset: ElfOff::from(desc.read_u32(&buf[28..32])),
                section_header_offset: ElfOff::from(desc.read_u32(&buf[32..36])),
                program_header_entry_size: desc.read_u16(&buf[42..44]),
                program_header_count: desc.read_u16(&buf[44..46]),
                section_header_entry_size: desc.read_u16(&buf[46..48]),
                section_header_count: desc.read_u16(&buf[48..50]),
                section_name_table_index: desc.read_u16(&buf[50..52]),
            },
        };

        // The declared header size must match the detected class.
        let e_ehsize = match desc.class {
            ElfClass::Elf64 => desc.read_u16(&buf[52..54]),
            ElfClass::Elf32 => desc.read_u16(&buf[40..42]),
        };
        if usize::from(e_ehsize) != desc.class.ehdr_size() {
            return Err(FormatError::Malformed);
        }

        Self::check_table_bounds(
            hdr.program_header_offset,
            hdr.program_header_entry_size,
            hdr.program_header_count,
            desc.class.phdr_entry_size(),
            buf.len(),
        )?;
        Self::check_table_bounds(
            hdr.section_header_offset,
            hdr.section_header_entry_size,
            hdr.section_header_count,
            desc.class.shdr_entry_size(),
            buf.len(),
        )?;

        Ok(hdr)
    }

    /// Verifies that a header table described by (offset, entry size,
    /// count) lies within the file bounds. Empty tables pass without
    /// constraining the entry size.
    fn check_table_bounds(
        table_off: ElfOff,
        entry_size: ElfHalf,
        count: ElfHalf,
        min_entry_size: usize,
        buf_len: usize,
    ) -> Result<(), FormatError> {
        if count == 0 {
            return Ok(());
        }
        let entry_size = usize::from(entry_size);
        if entry_size < min_entry_size {
            return Err(FormatError::Malformed);
        }
        let table_off = usize::try_from(table_off).map_err(|_| FormatError::Malformed)?;
        let table_size = usize::from(count)
            .checked_mul(entry_size)
            .ok_or(FormatError::Malformed)?;
        let table_end = table_off
            .checked_add(table_size)
            .ok_or(FormatError::Malformed)?;
        if table_end > buf_len {
            return Err(FormatError::Malformed);
        }
        Ok(())
    }
}
