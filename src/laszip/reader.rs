//! The top-level orchestrator: opens a LAS/LAZ stream, validates its
//! LASzip VLR, and decodes point records one at a time or by jumping
//! straight to a chunk boundary.

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::{Read, Seek, SeekFrom};

use crate::decoder::RangeDecoder;
use crate::error::{Error, Result};
use crate::las::header::{find_laszip_vlr, LasHeader};
use crate::laszip::chunk_table::read_chunk_starts;
use crate::laszip::vlr::LazVlr;
use crate::record::{build_item_decoder, RecordDecompressor};

/// Decodes LASzip-compressed point records out of a seekable LAS/LAZ
/// stream.
pub struct LasZipReader<R: Read + Seek> {
    vlr: LazVlr,
    decoder: RangeDecoder<R>,
    record: RecordDecompressor<R>,
    chunk_points_read: u32,
    data_start: u64,
    offset_to_chunk_table: i64,
    chunk_table: Option<Vec<u64>>,
    current_point_index: u64,
}

impl<R: Read + Seek> std::fmt::Debug for LasZipReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LasZipReader")
            .field("vlr", &self.vlr)
            .field("chunk_points_read", &self.chunk_points_read)
            .field("data_start", &self.data_start)
            .field("offset_to_chunk_table", &self.offset_to_chunk_table)
            .field("chunk_table", &self.chunk_table)
            .field("current_point_index", &self.current_point_index)
            .finish()
    }
}

impl<R: Read + Seek + 'static> LasZipReader<R> {
    /// Read the LAS header, locate and parse the LASzip VLR, and
    /// position the stream at the start of the first chunk.
    pub fn open(mut source: R) -> Result<Self> {
        let header = LasHeader::read_from(&mut source)?;
        source.seek(SeekFrom::Start(header.header_size as u64))?;

        let laszip_record_data = find_laszip_vlr(&mut source, &header)?;
        let vlr = LazVlr::read_from(&mut std::io::Cursor::new(laszip_record_data))?;
        debug!(
            "opened laz stream: chunk_size={} items={}",
            vlr.chunk_size(),
            vlr.items().len()
        );

        source.seek(SeekFrom::Start(header.offset_to_point_data as u64))?;
        let offset_to_chunk_table = source.read_i64::<LittleEndian>()?;
        let data_start = source.stream_position()?;

        let items = vlr
            .items()
            .iter()
            .map(build_item_decoder)
            .collect::<Result<Vec<_>>>()?;
        let record = RecordDecompressor::new(items);

        Ok(Self {
            vlr,
            decoder: RangeDecoder::new(source),
            record,
            chunk_points_read: 0,
            data_start,
            offset_to_chunk_table,
            chunk_table: None,
            current_point_index: 0,
        })
    }

    pub fn chunk_size(&self) -> u32 {
        self.vlr.chunk_size()
    }

    pub fn record_size(&self) -> usize {
        self.record.record_size()
    }

    /// Decode the next point record into `out`, which must be at least
    /// [`Self::record_size`] bytes.
    pub fn read_one(&mut self, out: &mut [u8]) -> Result<()> {
        if self.chunk_points_read == self.vlr.chunk_size() {
            self.record.reset_for_new_chunk();
            self.chunk_points_read = 0;
        }
        let point_index = self.current_point_index;
        self.record
            .decompress_next(&mut self.decoder, out)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::UnexpectedEof => Error::TruncatedStream { point_index },
                _ => Error::IoFailure(e),
            })?;
        self.chunk_points_read += 1;
        self.current_point_index += 1;
        Ok(())
    }

    /// Seek directly to the first point of `chunk_index`, loading the
    /// chunk table on first use.
    pub fn jump_to_chunk(&mut self, chunk_index: u64) -> Result<()> {
        if self.chunk_table.is_none() {
            let starts = read_chunk_starts(
                self.decoder.get_mut(),
                self.offset_to_chunk_table,
                self.data_start,
            )?;
            self.chunk_table = Some(starts);
        }
        let chunk_table = self.chunk_table.as_ref().unwrap();
        let start = *chunk_table
            .get(chunk_index as usize)
            .ok_or(Error::InvalidChunkIndex {
                index: chunk_index,
                chunk_count: chunk_table.len() as u64,
            })?;

        self.decoder.get_mut().seek(SeekFrom::Start(start))?;
        self.record.reset_for_new_chunk();
        self.chunk_points_read = 0;
        self.current_point_index = chunk_index * self.vlr.chunk_size() as u64;
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.decoder.into_inner()
    }
}
