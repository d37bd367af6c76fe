// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::error::FormatError;
use super::file_range::{table_entry_range, FileRange};
use super::header::FileHeader;
use super::ident::{ElfClass, FormatDescriptor};
use super::symtab::Strtab;
use super::types::*;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use bitflags::bitflags;

bitflags! {
    /// Flags associated with a section (e.g. writable, occupies
    /// memory, holds executable instructions).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags : ElfXword {
        const WRITE            = 0x001;
        const ALLOC            = 0x002;
        const EXECINSTR        = 0x004;
        const MERGE            = 0x010;
        const STRINGS          = 0x020;
        const INFO_LINK        = 0x040;
        const LINK_ORDER       = 0x080;
        const OS_NONCONFORMING = 0x100;
        const GROUP            = 0x200;
        const TLS              = 0x400;
        const COMPRESSED       = 0x800;
    }
}

/// A named region of the file described by one section header table
/// entry. Identity is the entry's index within the table; the ordered
/// [`SectionTable`] view preserves it. Fully owned; holds no
/// references into the file buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub address: ElfAddr,
    pub offset: ElfOff,
    pub size: ElfXword,
    pub stype: ElfWord,
    pub flags: SectionFlags,
    /// Index of an associated section, e.g. a symbol table's string
    /// table. [`None`] when the entry carries no link.
    pub link: Option<ElfWord>,
}

impl Section {
    /// Inactive section table entry.
    pub const SHT_NULL: ElfWord = 0;
    /// Program-defined contents.
    pub const SHT_PROGBITS: ElfWord = 1;
    /// Symbol table.
    pub const SHT_SYMTAB: ElfWord = 2;
    /// String table.
    pub const SHT_STRTAB: ElfWord = 3;
    /// Section occupying no file bytes.
    pub const SHT_NOBITS: ElfWord = 8;
}

/// The decoded section header table: the index-ordered sequence plus a
/// name-keyed index. Section names are unique in practice but not
/// guaranteed by the format; on collision the later-indexed entry wins
/// in the name-keyed view, while the ordered view retains both.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SectionTable {
    sections: Vec<Section>,
    by_name: BTreeMap<String, usize>,
}

impl SectionTable {
    fn new(sections: Vec<Section>) -> Self {
        let mut by_name = BTreeMap::new();
        for (i, section) in sections.iter().enumerate() {
            by_name.insert(section.name.clone(), i);
        }
        Self { sections, by_name }
    }

    /// Number of entries, including the initial null entry if present.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Checks whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Retrieves the section at table index `index`.
    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Iterates sections in table order.
    pub fn iter(&self) -> core::slice::Iter<'_, Section> {
        self.sections.iter()
    }

    /// The index-ordered sequence as a slice.
    pub fn as_slice(&self) -> &[Section] {
        &self.sections
    }

    /// Looks a section up by name. When several sections share the
    /// name, the one with the highest table index is returned.
    pub fn by_name(&self, name: &str) -> Option<&Section> {
        self.by_name.get(name).map(|i| &self.sections[*i])
    }
}

/// Widened fields of one on-disk section header entry, before name
/// resolution.
struct RawShdr {
    sh_name: ElfWord,
    sh_type: ElfWord,
    sh_flags: ElfXword,
    sh_addr: ElfAddr,
    sh_offset: ElfOff,
    sh_size: ElfXword,
    sh_link: ElfWord,
}

impl RawShdr {
    /// Decodes one section header entry; the field layouts of the two
    /// classes differ in field widths.
    fn read(buf: &[u8], desc: &FormatDescriptor) -> Self {
        match desc.class {
            ElfClass::Elf64 => Self {
                sh_name: desc.read_u32(&buf[0..4]),
                sh_type: desc.read_u32(&buf[4..8]),
                sh_flags: desc.read_u64(&buf[8..16]),
                sh_addr: desc.read_u64(&buf[16..24]),
                sh_offset: desc.read_u64(&buf[24..32]),
                sh_size: desc.read_u64(&buf[32..40]),
                sh_link: desc.read_u32(&buf[40..44]),
            },
            ElfClass::Elf32 => Self {
                sh_name: desc.read_u32(&buf[0..4]),
                sh_type: desc.read_u32(&buf[4..8]),
                sh_flags: ElfXword::from(desc.read_u32(&buf[8..12])),
                sh_addr: ElfAddr::from(desc.read_u32(&buf[12..16])),
                sh_offset: ElfOff::from(desc.read_u32(&buf[16..20])),
                sh_size: ElfXword::from(desc.read_u32(&buf[20..24])),
                sh_link: desc.read_u32(&buf[24..28]),
            },
        }
    }

    /// Verifies that the entry's declared byte range lies within the
    /// file and its link index within the table. `SHT_NOBITS` sections
    /// occupy no file bytes; their range is never dereferenced and is
    /// exempt from the file-bounds check.
    fn verify(&self, buf_len: usize, shnum: usize) -> Result<(), FormatError> {
        if self.sh_type == Section::SHT_NULL {
            return Ok(());
        }

        if self.sh_type != Section::SHT_NOBITS {
            let range = FileRange::try_from((self.sh_offset, self.sh_size))?;
            if range.offset_end > buf_len {
                return Err(FormatError::Malformed);
            }
        }

        if self.sh_link != 0 && usize::try_from(self.sh_link).unwrap() >= shnum {
            return Err(FormatError::Malformed);
        }

        Ok(())
    }
}

/// Decodes the section header table located by `hdr` and resolves
/// section names through the section-header string table.
///
/// Entries are read and validated individually, so a corrupt count can
/// never skip validation of earlier entries. Output preserves table
/// order for downstream index-based cross references.
///
/// # Errors
///
/// Returns [`FormatError::Malformed`] if an entry's byte range reaches
/// outside the buffer, the string table index is out of range or does
/// not name a string table section, or a name offset does not resolve
/// within the string table.
pub(crate) fn read_section_table(
    buf: &[u8],
    hdr: &FileHeader,
    desc: &FormatDescriptor,
) -> Result<SectionTable, FormatError> {
    let count = usize::from(hdr.section_header_count);
    if count == 0 {
        return Ok(SectionTable::default());
    }
    let entry_size = usize::from(hdr.section_header_entry_size);

    let mut raw_shdrs = Vec::with_capacity(count);
    for i in 0..count {
        let range = table_entry_range(hdr.section_header_offset, entry_size, i, buf.len())?;
        let raw = RawShdr::read(range.slice(buf)?, desc);
        raw.verify(buf.len(), count)?;
        raw_shdrs.push(raw);
    }

    let strtab_index = usize::from(hdr.section_name_table_index);
    let strtab_shdr = raw_shdrs.get(strtab_index).ok_or(FormatError::Malformed)?;
    if strtab_shdr.sh_type != Section::SHT_STRTAB {
        return Err(FormatError::Malformed);
    }
    let strtab_buf =
        FileRange::try_from((strtab_shdr.sh_offset, strtab_shdr.sh_size))?.slice(buf)?;
    let strtab = Strtab::new(strtab_buf);

    let mut sections = Vec::with_capacity(count);
    for raw in &raw_shdrs {
        sections.push(Section {
            name: strtab.get_str(raw.sh_name)?.to_string(),
            address: raw.sh_addr,
            offset: raw.sh_offset,
            size: raw.sh_size,
            stype: raw.sh_type,
            flags: SectionFlags::from_bits_truncate(raw.sh_flags),
            link: match raw.sh_link {
                0 => None,
                link => Some(link),
            },
        });
    }

    Ok(SectionTable::new(sections))
}
