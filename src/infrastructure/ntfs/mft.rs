//! MFT record decoding: fix-ups, attribute walk, data-run and `$FILE_NAME`
//! extraction.

use super::data_run::decode_data_run;
use super::fixups::{apply_fixups, FixupError};
use crate::domain::entities::{
    Bitmap, DecodedMftRecord, FileNameAttribute, FileNamespace, FileTime, StandardInformation,
    Timestamps, VolumeGeometry,
};
use crate::domain::services::{ClusterReadError, MftDecodeError};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

const MFT_ENTRY_SIGNATURE: &[u8; 4] = b"FILE";
const MAX_ATTRIBUTES: usize = 20;
const ATTR_END_MARKER: u32 = 0xFFFF_FFFF;

const ATTR_STANDARD_INFORMATION: u32 = 0x10;
const ATTR_FILE_NAME: u32 = 0x30;
const ATTR_DATA: u32 = 0x80;
const ATTR_INDEX_ROOT: u32 = 0x90;
const ATTR_INDEX_ALLOCATION: u32 = 0xA0;
const ATTR_BITMAP: u32 = 0xB0;

const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x1000_0000;

struct AttrHeader {
    type_code: u32,
    length: u32,
    nonresident: bool,
    name_length: u8,
    name_offset: u16,
}

fn read_attr_header(buf: &[u8], pos: usize) -> Option<AttrHeader> {
    let mut cursor = Cursor::new(buf.get(pos..pos + 16)?);
    let type_code = cursor.read_u32::<LittleEndian>().ok()?;
    let length = cursor.read_u32::<LittleEndian>().ok()?;
    let nonresident = cursor.read_u8().ok()? != 0;
    let name_length = cursor.read_u8().ok()?;
    let name_offset = cursor.read_u16::<LittleEndian>().ok()?;
    Some(AttrHeader {
        type_code,
        length,
        nonresident,
        name_length,
        name_offset,
    })
}

fn attribute_name(buf: &[u8], attr_pos: usize, header: &AttrHeader, arena: &bumpalo::Bump) -> String {
    if header.name_length == 0 {
        return String::new();
    }
    let start = attr_pos + header.name_offset as usize;
    let byte_len = header.name_length as usize * 2;
    let Some(name_bytes) = buf.get(start..start + byte_len) else {
        return String::new();
    };
    let mut units = bumpalo::collections::Vec::with_capacity_in(name_bytes.len() / 2, arena);
    units.extend(name_bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])));
    String::from_utf16_lossy(&units)
}

fn read_file_time(buf: &[u8], pos: usize) -> FileTime {
    buf.get(pos..pos + 8)
        .and_then(|s| s.try_into().ok())
        .map(|a: [u8; 8]| FileTime(u64::from_le_bytes(a)))
        .unwrap_or_default()
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    buf.get(pos..pos + 4)
        .and_then(|s| s.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(0)
}

fn read_u64(buf: &[u8], pos: usize) -> u64 {
    buf.get(pos..pos + 8)
        .and_then(|s| s.try_into().ok())
        .map(u64::from_le_bytes)
        .unwrap_or(0)
}

fn read_u16(buf: &[u8], pos: usize) -> u16 {
    buf.get(pos..pos + 2)
        .and_then(|s| s.try_into().ok())
        .map(u16::from_le_bytes)
        .unwrap_or(0)
}

fn parse_standard_information(buf: &[u8], value_pos: usize) -> StandardInformation {
    StandardInformation {
        timestamps: Timestamps {
            created: read_file_time(buf, value_pos),
            modified: read_file_time(buf, value_pos + 8),
            mft_modified: read_file_time(buf, value_pos + 16),
            accessed: read_file_time(buf, value_pos + 24),
        },
        attributes: read_u32(buf, value_pos + 32),
    }
}

fn parse_file_name(buf: &[u8], value_pos: usize, arena: &bumpalo::Bump) -> Option<FileNameAttribute> {
    let name_size = *buf.get(value_pos + 64)? as usize;
    let namespace = FileNamespace::from_raw(*buf.get(value_pos + 65)?)?;
    let name_start = value_pos + 66;
    let name_bytes = buf.get(name_start..name_start + name_size * 2)?;
    let mut units = bumpalo::collections::Vec::with_capacity_in(name_bytes.len() / 2, arena);
    units.extend(name_bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])));

    Some(FileNameAttribute {
        parent_mft_index: read_u32(buf, value_pos),
        parent_sequence_number: read_u16(buf, value_pos + 6),
        timestamps: Timestamps {
            created: read_file_time(buf, value_pos + 8),
            modified: read_file_time(buf, value_pos + 16),
            mft_modified: read_file_time(buf, value_pos + 24),
            accessed: read_file_time(buf, value_pos + 32),
        },
        allocated_size: read_u64(buf, value_pos + 40),
        real_size: read_u64(buf, value_pos + 48),
        attributes: read_u32(buf, value_pos + 56),
        namespace,
        name: String::from_utf16_lossy(&units),
    })
}

/// Decodes one MFT record's raw bytes (still containing the fix-up
/// signature placeholders). `buf` is mutated in place to restore the real
/// sector-trailer bytes.
///
/// `read_cluster`/`note_bad_cluster` are only invoked when the record
/// carries a nonresident `$BITMAP`, whose clusters must be resolved eagerly
/// so the directory decoder can answer liveness queries.
pub fn decode_record(
    buf: &mut [u8],
    mft_index: u64,
    geometry: &VolumeGeometry,
    mut read_cluster: impl FnMut(u64) -> Result<Vec<u8>, ClusterReadError>,
    mut note_bad_cluster: impl FnMut(u64),
) -> Result<DecodedMftRecord, MftDecodeError> {
    if buf.len() < 4 || &buf[0..4] != MFT_ENTRY_SIGNATURE {
        return Err(MftDecodeError::BadSignature(mft_index));
    }

    apply_fixups(buf, geometry.bytes_per_sector as usize).map_err(|e| match e {
        FixupError::Mismatch { sector } => MftDecodeError::FixupMismatch { sector },
        FixupError::Truncated {
            fixup_count,
            sectors_per_record,
        } => MftDecodeError::FixupTruncated {
            fixup_count,
            sectors_per_record,
        },
    })?;

    let first_attr_offset = read_u16(buf, 20) as usize;

    let mut record = DecodedMftRecord {
        mft_index,
        standard_information: None,
        filenames: Vec::new(),
        data_resident: None,
        data_run: None,
        data_compressed: false,
        index_allocation_run: None,
        bitmap: None,
        is_directory: false,
    };

    let mut pos = first_attr_offset;
    let mut attr_count = 0usize;
    let arena = bumpalo::Bump::new();

    loop {
        if read_u32(buf, pos) == ATTR_END_MARKER {
            break;
        }

        attr_count += 1;
        if attr_count > MAX_ATTRIBUTES {
            return Err(MftDecodeError::AttributeRunaway);
        }

        let Some(header) = read_attr_header(buf, pos) else {
            break;
        };
        if header.length == 0 {
            break;
        }

        match header.type_code {
            ATTR_STANDARD_INFORMATION if !header.nonresident => {
                let value_offset = read_u16(buf, pos + 20) as usize;
                record.standard_information = Some(parse_standard_information(buf, pos + value_offset));
            }
            ATTR_FILE_NAME if !header.nonresident => {
                let value_offset = read_u16(buf, pos + 20) as usize;
                if let Some(fname) = parse_file_name(buf, pos + value_offset, &arena) {
                    if fname.attributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
                        record.is_directory = true;
                    }
                    record.filenames.push(fname);
                }
            }
            ATTR_DATA => {
                if header.nonresident {
                    let compression_unit = read_u16(buf, pos + 34);
                    if compression_unit != 0 {
                        record.data_compressed = true;
                    } else {
                        let runs_offset = read_u16(buf, pos + 32) as usize;
                        let real_size = read_u64(buf, pos + 44);
                        record.data_run = Some(decode_data_run(buf, pos + runs_offset, real_size)?);
                    }
                } else {
                    let value_length = read_u32(buf, pos + 16) as usize;
                    let value_offset = read_u16(buf, pos + 20) as usize;
                    record.data_resident = buf
                        .get(pos + value_offset..pos + value_offset + value_length)
                        .map(|s| s.to_vec());
                }
            }
            ATTR_INDEX_ALLOCATION if header.nonresident => {
                if attribute_name(buf, pos, &header, &arena) == "$I30" {
                    let runs_offset = read_u16(buf, pos + 32) as usize;
                    let real_size = read_u64(buf, pos + 44);
                    record.index_allocation_run = Some(decode_data_run(buf, pos + runs_offset, real_size)?);
                    record.is_directory = true;
                }
            }
            ATTR_INDEX_ROOT => {
                record.is_directory = true;
            }
            ATTR_BITMAP => {
                record.bitmap = Some(if header.nonresident {
                    let runs_offset = read_u16(buf, pos + 32) as usize;
                    let real_size = read_u64(buf, pos + 44);
                    let run = decode_data_run(buf, pos + runs_offset, real_size)?;

                    let mut data = Vec::with_capacity(real_size as usize);
                    let mut valid = true;
                    for cluster in run.iter_clusters().flatten() {
                        match read_cluster(cluster) {
                            Ok(bytes) => data.extend_from_slice(&bytes),
                            Err(_) => {
                                note_bad_cluster(cluster);
                                valid = false;
                            }
                        }
                    }
                    if !valid {
                        data.clear();
                    } else {
                        data.truncate(real_size as usize);
                    }
                    Bitmap { data, valid }
                } else {
                    let value_length = read_u32(buf, pos + 16) as usize;
                    let value_offset = read_u16(buf, pos + 20) as usize;
                    let data = buf
                        .get(pos + value_offset..pos + value_offset + value_length)
                        .map(|s| s.to_vec())
                        .unwrap_or_default();
                    Bitmap { data, valid: true }
                });
            }
            _ => {}
        }

        pos += header.length as usize;
    }

    Ok(record)
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
    fn put_u64(buf: &mut [u8], pos: usize, v: u64) {
        buf[pos..pos + 8].copy_from_slice(&v.to_le_bytes());
    }

    fn geometry() -> VolumeGeometry {
        VolumeGeometry {
            bytes_per_sector: 512,
            sectors_per_cluster: 8,
            mft_cluster: 4,
            mft_mirror_cluster: 5,
            clusters_per_mft_record_raw: -10,
            total_sectors: 2500,
        }
    }

    /// Builds a minimal 1024-byte record with valid fix-ups, a $FILE_NAME
    /// attribute named "hello.txt", and an end marker.
    fn synthetic_record() -> Vec<u8> {
        let mut buf = vec![0u8; 1024];
        buf[0..4].copy_from_slice(MFT_ENTRY_SIGNATURE);
        put_u16(&mut buf, 4, 48); // fixup_offset
        put_u16(&mut buf, 6, 3); // fixup_count (2 sectors + 1)
        put_u16(&mut buf, 20, 56); // first_attr_offset

        let signature = [0x51u8, 0x19];
        buf[48] = signature[0];
        buf[49] = signature[1];
        buf[50] = 0xAA;
        buf[51] = 0xBB;
        buf[52] = 0xCC;
        buf[53] = 0xDD;
        for sector in 0..2 {
            let trailer = sector * 512 + 510;
            buf[trailer] = signature[0];
            buf[trailer + 1] = signature[1];
        }
        buf[510] = signature[0];
        buf[511] = signature[1];
        buf[1022] = signature[0];
        buf[1023] = signature[1];

        let attr_pos = 56usize;
        put_u32(&mut buf, attr_pos, ATTR_FILE_NAME);
        let name = "hello.txt";
        let value_len = 66 + name.len() * 2;
        let attr_len = 24 + value_len;
        put_u32(&mut buf, attr_pos + 4, attr_len as u32);
        buf[attr_pos + 8] = 0; // resident
        put_u16(&mut buf, attr_pos + 20, 24); // value_offset

        let value_pos = attr_pos + 24;
        put_u32(&mut buf, value_pos, 5); // parent_mft_index
        put_u64(&mut buf, value_pos + 48, 1234); // real size
        buf[value_pos + 64] = name.len() as u8;
        buf[value_pos + 65] = FileNamespace::Win32 as u8;
        for (i, unit) in name.encode_utf16().enumerate() {
            put_u16(&mut buf, value_pos + 66 + i * 2, unit);
        }

        let end_pos = attr_pos + attr_len;
        put_u32(&mut buf, end_pos, ATTR_END_MARKER);

        buf
    }

    #[test]
    fn decodes_file_name_and_restores_fixups() {
        let mut buf = synthetic_record();
        let record = decode_record(&mut buf, 64, &geometry(), |_| unreachable!(), |_| {}).unwrap();

        assert_eq!(buf[510], 0xAA);
        assert_eq!(buf[511], 0xBB);
        assert_eq!(buf[1022], 0xCC);
        assert_eq!(buf[1023], 0xDD);

        let fname = record.canonical_filename().unwrap();
        assert_eq!(fname.name, "hello.txt");
        assert_eq!(fname.real_size, 1234);
        assert_eq!(fname.parent_mft_index, 5);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut buf = vec![0u8; 1024];
        let err = decode_record(&mut buf, 1, &geometry(), |_| unreachable!(), |_| {}).unwrap_err();
        assert_eq!(err, MftDecodeError::BadSignature(1));
    }
}
