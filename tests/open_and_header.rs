use std::io::Cursor;

use laz_decoder::error::Error;
use laz_decoder::LasZipReader;

const LAS_HEADER_SIZE: u16 = 227;

fn push_las_header(buf: &mut Vec<u8>, minor: u8, offset_to_point_data: u32, num_vlrs: u32) {
    buf.extend_from_slice(b"LASF");
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&[0u8; 16]);
    buf.push(1);
    buf.push(minor);
    buf.extend_from_slice(&[0u8; 32]);
    buf.extend_from_slice(&[0u8; 32]);
    buf.extend_from_slice(&0u16.to_le_bytes());
    buf.extend_from_slice(&2024u16.to_le_bytes());
    buf.extend_from_slice(&LAS_HEADER_SIZE.to_le_bytes());
    buf.extend_from_slice(&offset_to_point_data.to_le_bytes());
    buf.extend_from_slice(&num_vlrs.to_le_bytes());
    buf.push(0x80);
    buf.extend_from_slice(&20u16.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    for _ in 0..5 {
        buf.extend_from_slice(&0u32.to_le_bytes());
    }
    if minor >= 3 {
        buf.extend_from_slice(&0u64.to_le_bytes());
    }
    while buf.len() < LAS_HEADER_SIZE as usize {
        buf.push(0);
    }
}

fn push_laszip_vlr(buf: &mut Vec<u8>) -> Vec<u8> {
    let record_data = {
        let mut d = Vec::new();
        d.extend_from_slice(&2u16.to_le_bytes()); // PointWiseChunked
        d.extend_from_slice(&0u16.to_le_bytes()); // coder
        d.push(2);
        d.push(2);
        d.extend_from_slice(&0u16.to_le_bytes());
        d.extend_from_slice(&0u32.to_le_bytes());
        d.extend_from_slice(&50_000u32.to_le_bytes());
        d.extend_from_slice(&(-1i64).to_le_bytes());
        d.extend_from_slice(&(-1i64).to_le_bytes());
        d.extend_from_slice(&2u16.to_le_bytes());
        d.extend_from_slice(&6u16.to_le_bytes()); // Point10
        d.extend_from_slice(&20u16.to_le_bytes());
        d.extend_from_slice(&2u16.to_le_bytes());
        d.extend_from_slice(&7u16.to_le_bytes()); // GpsTime
        d.extend_from_slice(&8u16.to_le_bytes());
        d.extend_from_slice(&2u16.to_le_bytes());
        d
    };
    buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
    let mut user_id = [0u8; 16];
    user_id[..14].copy_from_slice(b"laszip encoded");
    buf.extend_from_slice(&user_id);
    buf.extend_from_slice(&22204u16.to_le_bytes());
    buf.extend_from_slice(&(record_data.len() as u16).to_le_bytes());
    buf.extend_from_slice(&[0u8; 32]);
    buf.extend_from_slice(&record_data);
    record_data
}

#[test]
fn opens_a_stream_and_reports_combined_record_size() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut bytes = Vec::new();
    let vlr_total_len = 2 + 16 + 2 + 2 + 32 + 46; // header + record_data(46 bytes: 2 items)
    push_las_header(&mut bytes, 2, LAS_HEADER_SIZE as u32 + vlr_total_len, 1);
    push_laszip_vlr(&mut bytes);
    bytes.extend_from_slice(&(-1i64).to_le_bytes()); // chunk table offset placeholder

    let reader = LasZipReader::open(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.record_size(), 20 + 8);
    assert_eq!(reader.chunk_size(), 50_000);
}

#[test]
fn rejects_files_with_no_laszip_vlr() {
    let mut bytes = Vec::new();
    push_las_header(&mut bytes, 2, LAS_HEADER_SIZE as u32, 0);

    let err = LasZipReader::open(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::MissingLaszipVlr { vlr_count: 0 }));
}

#[test]
fn rejects_non_las_signature() {
    let bytes = b"NOTLASFILECONTENTS0000".to_vec();
    let err = LasZipReader::open(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, Error::InvalidSignature { .. }));
}
