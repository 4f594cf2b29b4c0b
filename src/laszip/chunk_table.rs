//! The chunk table: a range-coded sequence of per-chunk byte counts
//! stored at the end of the compressed stream (its own position is read
//! from the 8-byte offset written right before the first chunk's data).

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

use crate::decoder::RangeDecoder;
use crate::error::Result;
use crate::integer::IntegerDecompressor;

const BYTE_COUNT_CONTEXT: u32 = 1;

/// Reads the chunk table and turns its per-chunk byte counts into
/// absolute start offsets, with `data_start` as the offset of chunk 0.
pub fn read_chunk_starts<R: Read + Seek>(
    src: &mut R,
    offset_to_chunk_table: i64,
    data_start: u64,
) -> Result<Vec<u64>> {
    let current_pos = src.stream_position()?;

    let offset = if offset_to_chunk_table == -1 {
        src.seek(SeekFrom::End(-8))?;
        src.read_i64::<LittleEndian>()?
    } else {
        offset_to_chunk_table
    };
    src.seek(SeekFrom::Start(offset as u64))?;

    let _version = src.read_u32::<LittleEndian>()?;
    let number_of_chunks = src.read_u32::<LittleEndian>()?;

    // The table stores a byte count for every chunk except the last: the
    // last chunk's extent is implicit (it runs to wherever the stream
    // the table doesn't cover ends), so only `number_of_chunks - 1`
    // values are range-coded here.
    let stored_byte_counts = number_of_chunks.saturating_sub(1);
    let mut chunk_byte_counts = vec![0u64; stored_byte_counts as usize];
    let mut ic = IntegerDecompressor::new(32, 2);
    ic.init();
    let mut dec = RangeDecoder::new(&mut *src);
    dec.start()?;

    let mut predictor = 0i32;
    for count in chunk_byte_counts.iter_mut() {
        let value = ic.decompress(&mut dec, predictor, BYTE_COUNT_CONTEXT)?;
        *count = value as u64;
        predictor = value;
    }

    src.seek(SeekFrom::Start(current_pos))?;

    let mut chunk_starts = vec![0u64; number_of_chunks as usize];
    if !chunk_starts.is_empty() {
        chunk_starts[0] = data_start;
        for i in 1..chunk_starts.len() {
            chunk_starts[i] = chunk_starts[i - 1] + chunk_byte_counts[i - 1];
        }
    }
    Ok(chunk_starts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_table_produces_no_chunk_starts() {
        // version(u32) + num_chunks(u32) == 0, followed by 4 bytes the
        // range decoder reads as its initial value (never consulted
        // again because the loop below runs zero iterations).
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let mut cursor = Cursor::new(bytes);
        let starts = read_chunk_starts(&mut cursor, 0, 100).unwrap();
        assert!(starts.is_empty());
    }

    #[test]
    fn single_chunk_table_decodes_zero_byte_counts() {
        // number_of_chunks == 1 stores zero range-coded byte counts (the
        // lone chunk's extent is implicit), so the 4 bytes after the
        // header are only ever consulted as the range decoder's initial
        // value, never as a corrector.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 4]);
        let mut cursor = Cursor::new(bytes);
        let starts = read_chunk_starts(&mut cursor, 0, 100).unwrap();
        assert_eq!(starts, vec![100]);
    }
}
