// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::error::FormatError;
use super::file_range::FileRange;
use super::ident::FormatDescriptor;
use super::section::{Section, SectionTable};
use super::types::*;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use core::ffi;

/// Conventional name of the static symbol string table, used as a
/// lookup fallback for symbol table sections carrying no link index.
const FALLBACK_STRTAB_NAME: &str = ".strtab";

/// A borrowed view of a string table section's bytes. Strings are
/// recovered as null-terminated runs addressed by byte offset; a run
/// must terminate within the table, lookups never scan past its end.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Strtab<'a> {
    strtab_buf: &'a [u8],
}

impl<'a> Strtab<'a> {
    /// Creates a new [`Strtab`] instance from the provided string
    /// table buffer.
    pub(crate) fn new(strtab_buf: &'a [u8]) -> Self {
        Self { strtab_buf }
    }

    /// Retrieves the null-terminated string starting at byte offset
    /// `index` within the table.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] if `index` lies outside the
    /// table, no terminator exists within the table, or the bytes are
    /// not valid UTF-8.
    pub(crate) fn get_str(&self, index: ElfWord) -> Result<&'a str, FormatError> {
        let index = usize::try_from(index).map_err(|_| FormatError::Malformed)?;
        if index >= self.strtab_buf.len() {
            return Err(FormatError::Malformed);
        }

        let cstr = ffi::CStr::from_bytes_until_nul(&self.strtab_buf[index..])
            .map_err(|_| FormatError::Malformed)?;
        cstr.to_str().map_err(|_| FormatError::Malformed)
    }
}

/// A named location recorded in a symbol table section, with its value
/// (address or file offset, depending on the producing context) and
/// size. Fully owned; holds no references into the file buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub value: ElfAddr,
    pub size: ElfXword,
}

/// Decodes every symbol table section among `sections` into one
/// name-keyed mapping.
///
/// The paired string table is the section referenced by the symbol
/// table's link index; a symbol table without a link falls back to the
/// section literally named `.strtab`, a compatibility mode for minimal
/// producers that omit the link. Entries with an empty name or a zero
/// value are dropped: zero-valued entries are predominantly
/// undefined/external references carrying no usable location.
///
/// # Errors
///
/// Returns [`FormatError::Malformed`] if a string table cannot be
/// resolved, a section's size is not a multiple of the entry size for
/// the detected class, or a name offset does not resolve.
pub(crate) fn read_symbols(
    buf: &[u8],
    sections: &SectionTable,
    desc: &FormatDescriptor,
) -> Result<BTreeMap<String, Symbol>, FormatError> {
    let mut symbols = BTreeMap::new();

    for section in sections.iter() {
        if section.stype != Section::SHT_SYMTAB {
            continue;
        }

        let strtab_section = match section.link {
            Some(link) => sections
                .get(usize::try_from(link).map_err(|_| FormatError::Malformed)?)
                .ok_or(FormatError::Malformed)?,
            None => sections
                .by_name(FALLBACK_STRTAB_NAME)
                .ok_or(FormatError::Malformed)?,
        };
        if strtab_section.stype != Section::SHT_STRTAB {
            return Err(FormatError::Malformed);
        }
        let strtab_buf =
            FileRange::try_from((strtab_section.offset, strtab_section.size))?.slice(buf)?;
        let strtab = Strtab::new(strtab_buf);

        let entry_size = desc.class.sym_entry_size();
        let table_size = usize::try_from(section.size).map_err(|_| FormatError::Malformed)?;
        if table_size % entry_size != 0 {
            return Err(FormatError::Malformed);
        }
        let syms_buf = FileRange::try_from((section.offset, section.size))?.slice(buf)?;

        for sym_buf in syms_buf.chunks_exact(entry_size) {
            let (st_name, st_value, st_size) = read_sym(sym_buf, desc);
            let name = strtab.get_str(st_name)?;
            if name.is_empty() || st_value == 0 {
                continue;
            }
            symbols.insert(
                name.to_string(),
                Symbol {
                    name: name.to_string(),
                    value: st_value,
                    size: st_size,
                },
            );
        }
    }

    Ok(symbols)
}

/// Decodes the (name offset, value, size) triple of one symbol table
/// entry; the field layouts of the two classes differ in both order
/// and width.
fn read_sym(buf: &[u8], desc: &FormatDescriptor) -> (ElfWord, ElfAddr, ElfXword) {
    use super::ident::ElfClass;

    match desc.class {
        ElfClass::Elf64 => {
            let st_name = desc.read_u32(&buf[0..4]);
            let st_value = desc.read_u64(&buf[8..16]);
            let st_size = desc.read_u64(&buf[16..24]);
            (st_name, st_value, st_size)
        }
        ElfClass::Elf32 => {
            let st_name = desc.read_u32(&buf[0..4]);
            let st_value = ElfAddr::from(desc.read_u32(&buf[4..8]));
            let st_size = ElfXword::from(desc.read_u32(&buf[8..12]));
            (st_name, st_value, st_size)
        }
    }
}
