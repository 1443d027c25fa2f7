//! Multi-Sector Transfer fix-up validation and restoration.
//!
//! Shared by MFT record and `$I30` INDX block decoding: both structures
//! begin with the same four-field header and the same per-sector trailing
//! signature scheme.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupError {
    Mismatch { sector: usize },
    Truncated { fixup_count: usize, sectors_per_record: usize },
}

/// Reads the fix-up header (`fixup_offset` at +4, `fixup_count` at +6),
/// validates every sector's trailing 2-byte signature, and restores the
/// original bytes in place. `buf` must be exactly one record/block long.
pub fn apply_fixups(buf: &mut [u8], sector_size: usize) -> Result<(), FixupError> {
    let sectors_per_record = buf.len() / sector_size;

    let mut header = Cursor::new(&buf[4..8]);
    let fixup_offset = header.read_u16::<LittleEndian>().unwrap() as usize;
    let fixup_count = header.read_u16::<LittleEndian>().unwrap() as usize;

    if fixup_count < sectors_per_record + 1 {
        return Err(FixupError::Truncated {
            fixup_count,
            sectors_per_record,
        });
    }

    let signature = [buf[fixup_offset], buf[fixup_offset + 1]];

    for sector in 0..sectors_per_record {
        let trailer_pos = sector * sector_size + sector_size - 2;
        if buf[trailer_pos] != signature[0] || buf[trailer_pos + 1] != signature[1] {
            return Err(FixupError::Mismatch { sector });
        }

        let replacement_pos = fixup_offset + 2 + sector * 2;
        buf[trailer_pos] = buf[replacement_pos];
        buf[trailer_pos + 1] = buf[replacement_pos + 1];
    }

    Ok(())
}
