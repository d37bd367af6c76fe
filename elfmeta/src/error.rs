// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use core::fmt;

/// Errors detected while decoding an ELF image. The [`fmt::Display`]
/// trait is implemented to allow formatting error instances.
///
/// # Examples
///
/// To format a [`FormatError`] as a string, you can use the
/// `to_string()` method or the `format!` macro, like this:
///
/// ```rust
/// use elfmeta::FormatError;
///
/// let error = FormatError::NotElf;
///
/// assert_eq!(error.to_string(), "not an ELF file");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// The buffer is too short to contain an ELF identification block,
    /// or the magic bytes do not match.
    NotElf,
    /// The class byte encodes neither ELFCLASS32 nor ELFCLASS64.
    UnsupportedClass,
    /// The data-encoding byte encodes neither LSB nor MSB ordering.
    UnsupportedEncoding,
    /// An offset, count or entry size read from the file would reach
    /// outside the buffer, or an index does not resolve.
    Malformed,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotElf => {
                write!(f, "not an ELF file")
            }
            Self::UnsupportedClass => {
                write!(f, "unsupported ELF class")
            }
            Self::UnsupportedEncoding => {
                write!(f, "unsupported ELF data encoding")
            }
            Self::Malformed => {
                write!(f, "malformed ELF structure")
            }
        }
    }
}

/// The pipeline stage a [`ParseError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Magic / class / encoding detection.
    Ident,
    /// Fixed-size file header decoding.
    Header,
    /// Section header table decoding and name resolution.
    Sections,
    /// Program header table decoding.
    Segments,
    /// Symbol table decoding and name resolution.
    Symbols,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident => write!(f, "identification"),
            Self::Header => write!(f, "file header"),
            Self::Sections => write!(f, "section table"),
            Self::Segments => write!(f, "segment table"),
            Self::Symbols => write!(f, "symbol table"),
        }
    }
}

/// A [`FormatError`] tagged with the stage that raised it. This is the
/// only error type crossing the public [`parse`](crate::parse)
/// boundary; the first failing stage short-circuits the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseError {
    pub stage: Stage,
    pub error: FormatError,
}

impl ParseError {
    pub(crate) fn new(stage: Stage, error: FormatError) -> Self {
        Self { stage, error }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} while decoding ELF {}", self.error, self.stage)
    }
}
