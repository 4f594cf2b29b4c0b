//! Fixed-layout reader for the LAS public header block and its
//! variable length records (VLRs), including the LASzip VLR lookup
//! that hands off into [`crate::laszip`].

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{Error, Result};
use crate::laszip::vlr::{LASZIP_RECORD_ID, LASZIP_USER_ID};

const SIGNATURE: [u8; 4] = *b"LASF";

/// The LAS public header block, read field-for-field in file order.
///
/// Only the fields needed to locate point data and VLRs are kept;
/// scale/offset/bounds fields are not consulted by the decoder, which
/// only ever hands back the raw, unscaled integer point coordinates.
#[derive(Debug, Clone)]
pub struct LasHeader {
    pub file_source_id: u16,
    pub global_encoding: u16,
    pub guid: [u8; 16],
    pub version_major: u8,
    pub version_minor: u8,
    pub system_id: [u8; 32],
    pub generating_software: [u8; 32],
    pub file_creation_day_of_year: u16,
    pub file_creation_year: u16,
    pub header_size: u16,
    pub offset_to_point_data: u32,
    pub number_of_vlrs: u32,
    pub point_data_format_id: u8,
    pub point_data_record_length: u16,
    pub number_of_point_records: u32,
    pub number_of_points_by_return: [u32; 5],
    pub waveform_data_packet_start: Option<u64>,
    pub extended_vlr_offset: Option<u64>,
    pub extended_vlr_count: Option<u32>,
    pub extended_number_of_point_records: Option<u64>,
    pub extended_number_of_points_by_return: Option<[u64; 15]>,
}

impl LasHeader {
    pub fn read_from<R: Read>(src: &mut R) -> Result<Self> {
        let mut signature = [0u8; 4];
        src.read_exact(&mut signature)?;
        if signature != SIGNATURE {
            return Err(Error::InvalidSignature { found: signature });
        }

        let file_source_id = src.read_u16::<LittleEndian>()?;
        let global_encoding = src.read_u16::<LittleEndian>()?;
        let mut guid = [0u8; 16];
        src.read_exact(&mut guid)?;
        let version_major = src.read_u8()?;
        let version_minor = src.read_u8()?;
        if version_major != 1 || version_minor > 4 {
            return Err(Error::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let mut system_id = [0u8; 32];
        src.read_exact(&mut system_id)?;
        let mut generating_software = [0u8; 32];
        src.read_exact(&mut generating_software)?;
        let file_creation_day_of_year = src.read_u16::<LittleEndian>()?;
        let file_creation_year = src.read_u16::<LittleEndian>()?;
        let header_size = src.read_u16::<LittleEndian>()?;
        let offset_to_point_data = src.read_u32::<LittleEndian>()?;
        let number_of_vlrs = src.read_u32::<LittleEndian>()?;
        let point_data_format_id = src.read_u8()?;
        let point_data_record_length = src.read_u16::<LittleEndian>()?;
        let number_of_point_records = src.read_u32::<LittleEndian>()?;
        let mut number_of_points_by_return = [0u32; 5];
        for slot in number_of_points_by_return.iter_mut() {
            *slot = src.read_u32::<LittleEndian>()?;
        }

        let waveform_data_packet_start = if version_minor >= 3 {
            Some(src.read_u64::<LittleEndian>()?)
        } else {
            None
        };

        let (extended_vlr_offset, extended_vlr_count, extended_number_of_point_records, extended_number_of_points_by_return) =
            if version_minor >= 4 {
                let offset = src.read_u64::<LittleEndian>()?;
                let count = src.read_u32::<LittleEndian>()?;
                let total = src.read_u64::<LittleEndian>()?;
                let mut per_return = [0u64; 15];
                for slot in per_return.iter_mut() {
                    *slot = src.read_u64::<LittleEndian>()?;
                }
                (Some(offset), Some(count), Some(total), Some(per_return))
            } else {
                (None, None, None, None)
            };

        Ok(Self {
            file_source_id,
            global_encoding,
            guid,
            version_major,
            version_minor,
            system_id,
            generating_software,
            file_creation_day_of_year,
            file_creation_year,
            header_size,
            offset_to_point_data,
            number_of_vlrs,
            point_data_format_id,
            point_data_record_length,
            number_of_point_records,
            number_of_points_by_return,
            waveform_data_packet_start,
            extended_vlr_offset,
            extended_vlr_count,
            extended_number_of_point_records,
            extended_number_of_points_by_return,
        })
    }

    /// The point data format, with the LAZ-compressed bit (0x80) cleared.
    pub fn point_data_format(&self) -> u8 {
        self.point_data_format_id & 0x7f
    }

    /// Whether the file's high bit marks its point records as LASzip
    /// compressed.
    pub fn is_compressed(&self) -> bool {
        self.point_data_format_id & 0x80 != 0
    }
}

/// A variable length record: a fixed 54-byte header plus `record_length`
/// bytes of opaque payload.
#[derive(Debug, Clone)]
pub struct VariableLengthRecord {
    pub user_id: [u8; 16],
    pub record_id: u16,
    pub data: Vec<u8>,
}

impl VariableLengthRecord {
    pub fn read_from<R: Read>(src: &mut R) -> Result<Self> {
        let _reserved = src.read_u16::<LittleEndian>()?;
        let mut user_id = [0u8; 16];
        src.read_exact(&mut user_id)?;
        let record_id = src.read_u16::<LittleEndian>()?;
        let record_length = src.read_u16::<LittleEndian>()?;
        let mut description = [0u8; 32];
        src.read_exact(&mut description)?;
        let mut data = vec![0u8; record_length as usize];
        src.read_exact(&mut data)?;
        Ok(Self {
            user_id,
            record_id,
            data,
        })
    }

    fn user_id_str(&self) -> &str {
        let end = self.user_id.iter().position(|&b| b == 0).unwrap_or(self.user_id.len());
        std::str::from_utf8(&self.user_id[..end]).unwrap_or("")
    }
}

/// Read `header.number_of_vlrs` VLRs and return the `record_data` of the
/// one LASzip uses to describe its codec, or
/// [`Error::MissingLaszipVlr`] if none matches.
pub fn find_laszip_vlr<R: Read>(src: &mut R, header: &LasHeader) -> Result<Vec<u8>> {
    for _ in 0..header.number_of_vlrs {
        let vlr = VariableLengthRecord::read_from(src)?;
        if vlr.user_id_str() == LASZIP_USER_ID && vlr.record_id == LASZIP_RECORD_ID {
            return Ok(vlr.data);
        }
    }
    Err(Error::MissingLaszipVlr {
        vlr_count: header.number_of_vlrs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn minimal_header_bytes(minor: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"LASF");
        buf.extend_from_slice(&0u16.to_le_bytes()); // file_source_id
        buf.extend_from_slice(&0u16.to_le_bytes()); // global_encoding
        buf.extend_from_slice(&[0u8; 16]); // guid
        buf.push(1); // major
        buf.push(minor);
        buf.extend_from_slice(&[0u8; 32]); // system_id
        buf.extend_from_slice(&[0u8; 32]); // generating_software
        buf.extend_from_slice(&0u16.to_le_bytes()); // day
        buf.extend_from_slice(&2024u16.to_le_bytes()); // year
        buf.extend_from_slice(&227u16.to_le_bytes()); // header_size
        buf.extend_from_slice(&227u32.to_le_bytes()); // offset_to_point_data
        buf.extend_from_slice(&1u32.to_le_bytes()); // number_of_vlrs
        buf.push(0x80); // point_data_format_id, LAZ flag set, format 0
        buf.extend_from_slice(&20u16.to_le_bytes()); // record_length
        buf.extend_from_slice(&0u32.to_le_bytes()); // number_of_point_records
        for _ in 0..5 {
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
        if minor >= 3 {
            buf.extend_from_slice(&0u64.to_le_bytes());
        }
        if minor >= 4 {
            buf.extend_from_slice(&0u64.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&0u64.to_le_bytes());
            for _ in 0..15 {
                buf.extend_from_slice(&0u64.to_le_bytes());
            }
        }
        buf
    }

    #[test]
    fn rejects_bad_signature() {
        let bytes = b"NOPE0000000000000000".to_vec();
        let err = LasHeader::read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, Error::InvalidSignature { .. }));
    }

    #[test]
    fn reads_point_format_and_strips_laz_bit() {
        let bytes = minimal_header_bytes(2);
        let header = LasHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert!(header.is_compressed());
        assert_eq!(header.point_data_format(), 0);
        assert!(header.waveform_data_packet_start.is_none());
    }

    #[test]
    fn las_1_4_carries_extended_counts() {
        let bytes = minimal_header_bytes(4);
        let header = LasHeader::read_from(&mut Cursor::new(bytes)).unwrap();
        assert!(header.extended_vlr_offset.is_some());
        assert!(header.extended_number_of_points_by_return.is_some());
    }

    #[test]
    fn missing_laszip_vlr_is_reported() {
        let mut header = LasHeader::read_from(&mut Cursor::new(minimal_header_bytes(2))).unwrap();
        header.number_of_vlrs = 0;
        let err = find_laszip_vlr(&mut Cursor::new(Vec::new()), &header).unwrap_err();
        assert!(matches!(err, Error::MissingLaszipVlr { vlr_count: 0 }));
    }
}
