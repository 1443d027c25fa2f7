//! `$I30` INDX block decoding and directory-entry merging.

use super::fixups::{apply_fixups, FixupError};
use crate::domain::entities::{Bitmap, DirectoryEntry, FileNamespace, Timestamps};
use crate::domain::services::{IndexDecodeError, MftDecodeError};
use std::collections::HashMap;

const INDX_MAGIC: &[u8; 4] = b"INDX";
const TERMINATOR_FLAG: u16 = 0x0002;

fn read_u16(buf: &[u8], pos: usize) -> u16 {
    buf.get(pos..pos + 2)
        .and_then(|s| s.try_into().ok())
        .map(u16::from_le_bytes)
        .unwrap_or(0)
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    buf.get(pos..pos + 4)
        .and_then(|s| s.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

fn read_file_name_key(
    buf: &[u8],
    pos: usize,
    arena: &bumpalo::Bump,
) -> Option<(u32, FileNamespace, String, Timestamps, u32, u64)> {
    let name_size = *buf.get(pos + 64)? as usize;
    let namespace = FileNamespace::from_raw(*buf.get(pos + 65)?)?;
    let name_start = pos + 66;
    let name_bytes = buf.get(name_start..name_start + name_size * 2)?;
    let mut units = bumpalo::collections::Vec::with_capacity_in(name_bytes.len() / 2, arena);
    units.extend(name_bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])));
    let name = String::from_utf16_lossy(&units);

    let timestamps = Timestamps {
        created: crate::domain::entities::FileTime(read_u64(buf, pos + 8)),
        modified: crate::domain::entities::FileTime(read_u64(buf, pos + 16)),
        mft_modified: crate::domain::entities::FileTime(read_u64(buf, pos + 24)),
        accessed: crate::domain::entities::FileTime(read_u64(buf, pos + 32)),
    };

    let attributes = read_u32(buf, pos + 56);
    let real_size = read_u64(buf, pos + 48);
    let parent_mft_index = read_u32(buf, pos);

    Some((parent_mft_index, namespace, name, timestamps, attributes, real_size))
}

fn read_u64(buf: &[u8], pos: usize) -> u64 {
    buf.get(pos..pos + 8)
        .and_then(|s| s.try_into().ok())
        .map(u64::from_le_bytes)
        .unwrap_or(0)
}

/// Decodes one `INDX` block (one cluster of a directory's `$I30` index
/// allocation), merging every entry it finds into `merged` keyed by MFT
/// index. `position` tracks the INDX-entry ordinal across the whole
/// directory, used to look up the liveness bit in `bitmap`.
pub fn decode_indx_block(
    buf: &mut [u8],
    cluster_id: u64,
    sector_size: usize,
    position: &mut u64,
    bitmap: &Bitmap,
    merged: &mut HashMap<u32, DirectoryEntry>,
) -> Result<(), IndexDecodeError> {
    if buf.len() < 4 || &buf[0..4] != INDX_MAGIC {
        return Err(IndexDecodeError::BadMagic(cluster_id));
    }

    apply_fixups(buf, sector_size).map_err(|e| match e {
        FixupError::Mismatch { sector } => MftDecodeError::FixupMismatch { sector }.into(),
        FixupError::Truncated {
            fixup_count,
            sectors_per_record,
        } => MftDecodeError::FixupTruncated {
            fixup_count,
            sectors_per_record,
        }
        .into(),
    })?;

    let index_record_size = buf.len();
    let first_entry_offset = read_u32(buf, 24) as usize + 24;
    let mut offset = first_entry_offset;
    let arena = bumpalo::Bump::new();

    loop {
        buf.get(offset..offset + 16).ok_or(IndexDecodeError::IndexCorrupt)?;

        let entry_mft_index = read_u32(buf, offset);
        let entry_length = read_u16(buf, offset + 8) as usize;
        let key_length = read_u16(buf, offset + 10) as usize;
        let flags = read_u16(buf, offset + 12);

        if entry_length < 16 {
            return Err(IndexDecodeError::IndexCorrupt);
        }

        let is_terminator = flags & TERMINATOR_FLAG != 0;
        if !is_terminator && offset + entry_length + 16 > index_record_size {
            return Err(IndexDecodeError::IndexCorrupt);
        }

        if is_terminator {
            break;
        }

        if key_length > 0 {
            if let Some((parent, namespace, name, timestamps, attributes, real_size)) =
                read_file_name_key(buf, offset + 16, &arena)
            {
                // Without a valid bitmap there is no liveness signal at all;
                // default to "live" rather than marking every entry deleted.
                let deleted = bitmap.valid && !bitmap.is_set(*position);

                let entry = merged.entry(entry_mft_index).or_insert_with(|| DirectoryEntry {
                    mft_index: entry_mft_index,
                    parent_mft_index: parent,
                    display_name: name.clone(),
                    dos_name: None,
                    names_by_namespace: HashMap::new(),
                    attributes,
                    timestamps,
                    size: real_size,
                    deleted,
                });

                if namespace == FileNamespace::Dos {
                    entry.dos_name = Some(name.clone());
                } else if entry.dos_name.is_none() || entry.names_by_namespace.len() <= 1 {
                    entry.display_name = name.clone();
                    entry.attributes = attributes;
                    entry.timestamps = timestamps;
                    entry.size = real_size;
                }
                entry.names_by_namespace.insert(namespace, name);
            }
        }

        *position += 1;
        offset += entry_length;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(buf: &mut [u8], pos: usize, v: u16) {
        buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
    }
    fn put_u32(buf: &mut [u8], pos: usize, v: u32) {
        buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn synthetic_indx_block(name: &str, mft_index: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 4096];
        buf[0..4].copy_from_slice(INDX_MAGIC);
        put_u16(&mut buf, 4, 48);
        put_u16(&mut buf, 6, 9); // 8 sectors (512*8=4096) + 1
        let sig = [0x11u8, 0x22];
        buf[48] = sig[0];
        buf[49] = sig[1];
        for sector in 0..8 {
            let trailer = sector * 512 + 510;
            buf[trailer] = sig[0];
            buf[trailer + 1] = sig[1];
        }
        put_u32(&mut buf, 24, 0); // offset to first entry, relative to +24 -> absolute 24

        let entry_pos = 24usize;
        let value_len = 66 + name.len() * 2;
        let entry_length = 16 + value_len;
        put_u32(&mut buf, entry_pos, mft_index);
        put_u16(&mut buf, entry_pos + 8, entry_length as u16);
        put_u16(&mut buf, entry_pos + 10, value_len as u16);
        put_u16(&mut buf, entry_pos + 12, 0); // flags, not terminator

        let key_pos = entry_pos + 16;
        buf[key_pos + 64] = name.len() as u8;
        buf[key_pos + 65] = FileNamespace::Win32 as u8;
        for (i, unit) in name.encode_utf16().enumerate() {
            put_u16(&mut buf, key_pos + 66 + i * 2, unit);
        }

        let term_pos = entry_pos + entry_length;
        put_u16(&mut buf, term_pos + 8, 16);
        put_u16(&mut buf, term_pos + 12, TERMINATOR_FLAG);

        buf
    }

    #[test]
    fn decodes_single_entry() {
        let mut buf = synthetic_indx_block("hello.txt", 64);
        let mut merged = HashMap::new();
        let bitmap = Bitmap { data: vec![0xFF], valid: true };
        let mut position = 0u64;

        decode_indx_block(&mut buf, 0, 512, &mut position, &bitmap, &mut merged).unwrap();

        assert_eq!(merged.len(), 1);
        let entry = &merged[&64];
        assert_eq!(entry.display_name, "hello.txt");
        assert!(!entry.deleted);
        assert_eq!(position, 1);
    }

    #[test]
    fn deleted_flag_follows_bitmap() {
        let mut buf = synthetic_indx_block("gone.txt", 70);
        let mut merged = HashMap::new();
        let bitmap = Bitmap { data: vec![0x00], valid: true };
        let mut position = 0u64;

        decode_indx_block(&mut buf, 0, 512, &mut position, &bitmap, &mut merged).unwrap();
        assert!(merged[&70].deleted);
    }
}
