// SPDX-License-Identifier: (GPL-2.0-or-later OR MIT)
//
// vim: ts=4 sw=4 et

use super::error::FormatError;
use super::types::*;

/// A validated half-open byte range `[offset_begin, offset_end)` within
/// the ELF file buffer. Construction performs the overflow checks;
/// [`FileRange::slice`] performs the length check against the actual
/// buffer. No raw `offset + size` arithmetic happens outside this type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileRange {
    pub offset_begin: usize,
    pub offset_end: usize,
}

impl FileRange {
    /// Slices `buf` to this range, validating that the range lies
    /// entirely within the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] if `offset_end` exceeds the
    /// buffer length.
    pub fn slice<'a>(&self, buf: &'a [u8]) -> Result<&'a [u8], FormatError> {
        if self.offset_end > buf.len() {
            return Err(FormatError::Malformed);
        }
        Ok(&buf[self.offset_begin..self.offset_end])
    }

    /// Length of the range in bytes.
    pub fn len(&self) -> usize {
        self.offset_end - self.offset_begin
    }

    /// Checks whether the range is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TryFrom<(ElfOff, ElfXword)> for FileRange {
    type Error = FormatError;

    /// Tries to create a [`FileRange`] from a file (offset, size)
    /// tuple as read from an ELF table entry.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Malformed`] if either value does not fit
    /// an `usize` or the end offset computation overflows.
    fn try_from(value: (ElfOff, ElfXword)) -> Result<Self, Self::Error> {
        let offset_begin = usize::try_from(value.0).map_err(|_| FormatError::Malformed)?;
        let size = usize::try_from(value.1).map_err(|_| FormatError::Malformed)?;
        let offset_end = offset_begin
            .checked_add(size)
            .ok_or(FormatError::Malformed)?;
        Ok(Self {
            offset_begin,
            offset_end,
        })
    }
}

/// Computes the byte range of entry `i` in a table of `entry_size`
/// sized entries starting at `table_off`, validated against
/// `buf_len`. Each entry is validated individually so that a corrupt
/// count can never skip validation of earlier entries.
pub(crate) fn table_entry_range(
    table_off: ElfOff,
    entry_size: usize,
    i: usize,
    buf_len: usize,
) -> Result<FileRange, FormatError> {
    let table_off = usize::try_from(table_off).map_err(|_| FormatError::Malformed)?;
    let entry_off = i
        .checked_mul(entry_size)
        .and_then(|off| off.checked_add(table_off))
        .ok_or(FormatError::Malformed)?;
    let entry_end = entry_off
        .checked_add(entry_size)
        .ok_or(FormatError::Malformed)?;
    if entry_end > buf_len {
        return Err(FormatError::Malformed);
    }
    Ok(FileRange {
        offset_begin: entry_off,
        offset_end: entry_end,
    })
}
