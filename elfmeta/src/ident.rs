// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::error::FormatError;

/// Number of identification bytes at the start of every ELF file.
pub const EI_NIDENT: usize = 16;

const EI_MAG0: usize = 0;
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;

const ELFMAG: [u8; 4] = [0x7f, b'E', b'L', b'F'];

const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;

const ELFDATA2LSB: u8 = 1;
const ELFDATA2MSB: u8 = 2;

/// The on-disk width variant declared in the identification block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32,
    Elf64,
}

impl ElfClass {
    /// Size in bytes of the fixed-size file header for this class.
    pub(crate) fn ehdr_size(self) -> usize {
        match self {
            Self::Elf32 => 52,
            Self::Elf64 => 64,
        }
    }

    /// Minimal section header table entry size for this class.
    pub(crate) fn shdr_entry_size(self) -> usize {
        match self {
            Self::Elf32 => 40,
            Self::Elf64 => 64,
        }
    }

    /// Minimal program header table entry size for this class.
    pub(crate) fn phdr_entry_size(self) -> usize {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 56,
        }
    }

    /// Fixed symbol table entry size for this class.
    pub(crate) fn sym_entry_size(self) -> usize {
        match self {
            Self::Elf32 => 16,
            Self::Elf64 => 24,
        }
    }
}

/// The byte order declared in the identification block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfEncoding {
    LittleEndian,
    BigEndian,
}

/// Width variant and byte order of an ELF file, derived once from the
/// identification bytes. Drives every subsequent field decode: field
/// widths are selected by [`ElfClass`], byte order by [`ElfEncoding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub class: ElfClass,
    pub encoding: ElfEncoding,
}

impl FormatDescriptor {
    /// Inspects the identification bytes of `buf` and derives the
    /// format descriptor.
    ///
    /// # Errors
    ///
    /// - [`FormatError::NotElf`]: `buf` is shorter than the
    ///   identification block or the magic bytes mismatch.
    /// - [`FormatError::UnsupportedClass`]: unrecognized class byte.
    /// - [`FormatError::UnsupportedEncoding`]: unrecognized
    ///   data-encoding byte.
    pub fn detect(buf: &[u8]) -> Result<Self, FormatError> {
        if buf.len() < EI_NIDENT {
            return Err(FormatError::NotElf);
        }
        if buf[EI_MAG0..EI_MAG0 + ELFMAG.len()] != ELFMAG {
            return Err(FormatError::NotElf);
        }

        let class = match buf[EI_CLASS] {
            ELFCLASS32 => ElfClass::Elf32,
            ELFCLASS64 => ElfClass::Elf64,
            _ => return Err(FormatError::UnsupportedClass),
        };
        let encoding = match buf[EI_DATA] {
            ELFDATA2LSB => ElfEncoding::LittleEndian,
            ELFDATA2MSB => ElfEncoding::BigEndian,
            _ => return Err(FormatError::UnsupportedEncoding),
        };

        Ok(Self { class, encoding })
    }

    /// Decodes a `u16` from an exactly two byte slice in the declared
    /// byte order. Callers slice the field range out of a buffer whose
    /// bounds have already been validated.
    pub(crate) fn read_u16(&self, buf: &[u8]) -> u16 {
        match self.encoding {
            ElfEncoding::LittleEndian => u16::from_le_bytes(buf.try_into().unwrap()),
            ElfEncoding::BigEndian => u16::from_be_bytes(buf.try_into().unwrap()),
        }
    }

    /// Decodes a `u32` from an exactly four byte slice in the declared
    /// byte order.
    pub(crate) fn read_u32(&self, buf: &[u8]) -> u32 {
        match self.encoding {
            ElfEncoding::LittleEndian => u32::from_le_bytes(buf.try_into().unwrap()),
            ElfEncoding::BigEndian => u32::from_be_bytes(buf.try_into().unwrap()),
        }
    }

    /// Decodes a `u64` from an exactly eight byte slice in the declared
    /// byte order.
    pub(crate) fn read_u64(&self, buf: &[u8]) -> u64 {
        match self.encoding {
            ElfEncoding::LittleEndian => u64::from_le_bytes(buf.try_into().unwrap()),
            ElfEncoding::BigEndian => u64::from_be_bytes(buf.try_into().unwrap()),
        }
    }
}
