//! Glue between the LASzip VLR's item list and the concrete per-item
//! decoders: a small trait plus an open `(type, version)` registry, so
//! that adding RGB/NIR/WAVEPACKET/POINT14 support later only means
//! implementing [`ItemDecoder`] and adding a registry arm.

use std::io::Read;

use crate::decoder::RangeDecoder;
use crate::error::{Error, Result};
use crate::las::gps_time::{self, GpsTimeDecompressor};
use crate::las::point10::{self, Point10Decompressor};
use crate::laszip::vlr::{ItemType, LazItem};

/// One field/dimension of a point record. Implementors own whatever
/// predictive state (medians, last-value tables, integer compressors)
/// their item needs across the life of a chunk.
pub trait ItemDecoder<R: Read>: std::fmt::Debug {
    /// Size in bytes of the item's uncompressed, LAS-ordered representation.
    fn size(&self) -> usize;

    /// Read this item's raw, uncompressed bytes directly from the
    /// underlying stream and seed predictive state from them. Called
    /// once, for the first point of a chunk.
    fn read_first(&mut self, dec: &mut RangeDecoder<R>, buf: &mut [u8]) -> std::io::Result<()>;

    /// Decode this item predictively from `dec`, writing its
    /// LAS-ordered bytes into `buf`. Called for every point after the
    /// chunk's first.
    fn read_next(&mut self, dec: &mut RangeDecoder<R>, buf: &mut [u8]) -> std::io::Result<()>;
}

#[derive(Debug)]
struct Point10Item {
    inner: Point10Decompressor,
}

impl<R: Read> ItemDecoder<R> for Point10Item {
    fn size(&self) -> usize {
        point10::SIZE
    }

    fn read_first(&mut self, dec: &mut RangeDecoder<R>, buf: &mut [u8]) -> std::io::Result<()> {
        dec.get_mut().read_exact(buf)?;
        let raw = point10::Point10::read_raw(&mut std::io::Cursor::new(&buf[..]))?;
        self.inner.init_with_first_point(raw);
        Ok(())
    }

    fn read_next(&mut self, dec: &mut RangeDecoder<R>, buf: &mut [u8]) -> std::io::Result<()> {
        let point = self.inner.read(dec)?;
        point.write_raw(&mut std::io::Cursor::new(buf))
    }
}

#[derive(Debug)]
struct GpsTimeItem {
    inner: GpsTimeDecompressor,
}

impl<R: Read> ItemDecoder<R> for GpsTimeItem {
    fn size(&self) -> usize {
        gps_time::SIZE
    }

    fn read_first(&mut self, dec: &mut RangeDecoder<R>, buf: &mut [u8]) -> std::io::Result<()> {
        dec.get_mut().read_exact(buf)?;
        let raw = gps_time::GpsTime::read_raw(&mut std::io::Cursor::new(&buf[..]))?;
        self.inner.init_with_first_point(raw);
        Ok(())
    }

    fn read_next(&mut self, dec: &mut RangeDecoder<R>, buf: &mut [u8]) -> std::io::Result<()> {
        let t = self.inner.read(dec)?;
        t.write_raw(&mut std::io::Cursor::new(buf))
    }
}

/// Resolve a VLR item descriptor to its decoder, or report
/// [`Error::UnknownItem`] for anything this crate doesn't implement.
///
/// Only version 2 of POINT10 and GPSTIME11 is implemented: version 1 of
/// each item uses a distinct predictive state machine, not a smaller
/// version of the same one, so silently decoding a version-1 item with
/// version-2 logic would produce wrong point data with no error. RGB,
/// BYTE, WAVEPACKET and POINT14 items are recognized by [`ItemType`] but
/// have no arm here yet; adding one is the whole extension surface.
pub fn build_item_decoder<R: Read + 'static>(item: &LazItem) -> Result<Box<dyn ItemDecoder<R>>> {
    match (item.item_type, item.version) {
        (ItemType::Point10, 2) => Ok(Box::new(Point10Item {
            inner: Point10Decompressor::new(),
        })),
        (ItemType::GpsTime, 2) => Ok(Box::new(GpsTimeItem {
            inner: GpsTimeDecompressor::new(),
        })),
        (item_type, version) => Err(Error::UnknownItem {
            item_type: item_type.code(),
            version,
        }),
    }
}

/// Assembles one LAS point record out of the configured items, in
/// order, and drives re-initialization at chunk boundaries.
pub struct RecordDecompressor<R: Read> {
    items: Vec<Box<dyn ItemDecoder<R>>>,
    have_first_point: bool,
}

impl<R: Read> RecordDecompressor<R> {
    pub fn new(items: Vec<Box<dyn ItemDecoder<R>>>) -> Self {
        Self {
            items,
            have_first_point: false,
        }
    }

    pub fn record_size(&self) -> usize {
        self.items.iter().map(|i| i.size()).sum()
    }

    /// Forget predictive state so the next [`Self::decompress_next`]
    /// call is treated as the first point of a new chunk.
    pub fn reset_for_new_chunk(&mut self) {
        self.have_first_point = false;
    }

    pub fn decompress_next(&mut self, dec: &mut RangeDecoder<R>, out: &mut [u8]) -> std::io::Result<()> {
        let mut offset = 0;
        if !self.have_first_point {
            for item in &mut self.items {
                let end = offset + item.size();
                item.read_first(dec, &mut out[offset..end])?;
                offset = end;
            }
            dec.start()?;
            self.have_first_point = true;
        } else {
            for item in &mut self.items {
                let end = offset + item.size();
                item.read_next(dec, &mut out[offset..end])?;
                offset = end;
            }
        }
        Ok(())
    }
}
