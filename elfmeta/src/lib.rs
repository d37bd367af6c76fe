// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

//! Structural metadata extraction from ELF object files.
//!
//! The crate decodes the execution entry point, section headers,
//! program (segment) headers and symbol table entries of an ELF image
//! directly from a byte buffer. It supports both the 32-bit and the
//! 64-bit on-disk layout in either byte order, and validates every
//! offset, count and size read from the file against the buffer bounds
//! before dereferencing it.
//!
//! The crate never performs I/O: acquiring the byte buffer (reading or
//! memory-mapping the file) and releasing it again is the caller's
//! responsibility. The returned [`ElfImage`] is fully owned and
//! independent of the input buffer's lifetime.
//!
//! ```rust
//! use elfmeta::{parse, FormatError, ParseError, Stage};
//!
//! let err = parse(b"not an elf").unwrap_err();
//! assert_eq!(err, ParseError { stage: Stage::Ident, error: FormatError::NotElf });
//! ```

#![no_std]

extern crate alloc;

mod error;
mod file_range;
mod header;
mod ident;
mod section;
mod segment;
mod symtab;
mod types;

#[cfg(test)]
mod tests;

pub use error::{FormatError, ParseError, Stage};
pub use file_range::FileRange;
pub use header::FileHeader;
pub use ident::{ElfClass, ElfEncoding, FormatDescriptor};
pub use section::{Section, SectionFlags, SectionTable};
pub use segment::{Segment, SegmentFlags};
pub use symtab::Symbol;
pub use types::*;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// The aggregated structural metadata of one ELF file: the decoded
/// file header, the ordered section and segment tables and the
/// name-keyed symbol mapping. Owned exclusively by the caller once
/// returned; immutable thereafter and safe to share read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfImage {
    pub format: FormatDescriptor,
    pub header: FileHeader,
    pub sections: SectionTable,
    pub segments: Vec<Segment>,
    pub symbols: BTreeMap<String, Symbol>,
}

impl ElfImage {
    /// Decodes the structural metadata of the ELF file contained in
    /// `buf`.
    ///
    /// The stages run in dependency order: format detection, file
    /// header, section table, segment table, symbol tables. The first
    /// failing stage short-circuits the remainder; no partial results
    /// are returned on failure.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] naming the failing stage and the
    /// [`FormatError`] it raised.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        let format =
            FormatDescriptor::detect(buf).map_err(|e| ParseError::new(Stage::Ident, e))?;
        let header =
            FileHeader::read(buf, &format).map_err(|e| ParseError::new(Stage::Header, e))?;
        let sections = section::read_section_table(buf, &header, &format)
            .map_err(|e| ParseError::new(Stage::Sections, e))?;
        let segments = segment::read_segment_table(buf, &header, &format)
            .map_err(|e| ParseError::new(Stage::Segments, e))?;
        let symbols = symtab::read_symbols(buf, &sections, &format)
            .map_err(|e| ParseError::new(Stage::Symbols, e))?;

        log::debug!(
            "parsed ELF image: entry {:#x}, {} sections, {} segments, {} symbols",
            header.entry_point,
            sections.len(),
            segments.len(),
            symbols.len()
        );

        Ok(Self {
            format,
            header,
            sections,
            segments,
            symbols,
        })
    }
}

/// Decodes the structural metadata of the ELF file contained in `buf`.
/// See [`ElfImage::parse`].
///
/// # Errors
///
/// Returns a [`ParseError`] naming the failing stage and reason.
pub fn parse(buf: &[u8]) -> Result<ElfImage, ParseError> {
    ElfImage::parse(buf)
}
