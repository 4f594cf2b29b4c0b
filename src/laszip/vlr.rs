//! Parsing of the LASzip VLR `record_data`: compressor type, coder,
//! version, chunk size and the item list that describes a point record.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

use crate::error::{Error, Result};

pub const LASZIP_USER_ID: &str = "laszip encoded";
pub const LASZIP_RECORD_ID: u16 = 22204;

/// The item types recognized by this decoder, plus enough of the
/// remaining registry to name an item this crate cannot yet decode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ItemType {
    Byte,
    Point10,
    GpsTime,
    Rgb12,
    WavePacket13,
    Point14,
    Rgb14,
    RgbNir14,
    Byte14,
    Unknown(u16),
}

impl ItemType {
    fn from_u16(t: u16) -> Self {
        match t {
            0 => ItemType::Byte,
            6 => ItemType::Point10,
            7 => ItemType::GpsTime,
            8 => ItemType::Rgb12,
            9 => ItemType::WavePacket13,
            10 => ItemType::Point14,
            11 => ItemType::Rgb14,
            12 => ItemType::RgbNir14,
            14 => ItemType::Byte14,
            other => ItemType::Unknown(other),
        }
    }

    pub(crate) fn code(self) -> u16 {
        match self {
            ItemType::Byte => 0,
            ItemType::Point10 => 6,
            ItemType::GpsTime => 7,
            ItemType::Rgb12 => 8,
            ItemType::WavePacket13 => 9,
            ItemType::Point14 => 10,
            ItemType::Rgb14 => 11,
            ItemType::RgbNir14 => 12,
            ItemType::Byte14 => 14,
            ItemType::Unknown(other) => other,
        }
    }
}

/// One entry of the VLR's item list: a `(type, version)` pair plus the
/// item's uncompressed size, used both to size the raw per-point buffer
/// and to look the item up in the decoder registry.
#[derive(Debug, Copy, Clone)]
pub struct LazItem {
    pub item_type: ItemType,
    pub size: u16,
    pub version: u16,
}

impl LazItem {
    fn read_from<R: Read>(src: &mut R) -> Result<Self> {
        let item_type = src.read_u16::<LittleEndian>()?;
        let size = src.read_u16::<LittleEndian>()?;
        let version = src.read_u16::<LittleEndian>()?;
        Ok(Self {
            item_type: ItemType::from_u16(item_type),
            size,
            version,
        })
    }
}

fn read_items<R: Read>(src: &mut R) -> Result<Vec<LazItem>> {
    let num_items = src.read_u16::<LittleEndian>()?;
    let mut items = Vec::with_capacity(num_items as usize);
    for _ in 0..num_items {
        items.push(LazItem::read_from(src)?);
    }
    Ok(items)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompressorType {
    None,
    PointWise,
    PointWiseChunked,
    LayeredChunked,
}

impl CompressorType {
    fn from_u16(t: u16) -> Option<Self> {
        match t {
            0 => Some(CompressorType::None),
            1 => Some(CompressorType::PointWise),
            2 => Some(CompressorType::PointWiseChunked),
            3 => Some(CompressorType::LayeredChunked),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Version {
    major: u8,
    minor: u8,
    revision: u16,
}

impl Version {
    fn read_from<R: Read>(src: &mut R) -> Result<Self> {
        Ok(Self {
            major: src.read_u8()?,
            minor: src.read_u8()?,
            revision: src.read_u16::<LittleEndian>()?,
        })
    }
}

/// The decoded contents of a LASzip VLR's `record_data`.
#[derive(Debug, Clone)]
pub struct LazVlr {
    compressor: CompressorType,
    coder: u16,
    version: Version,
    options: u32,
    chunk_size: u32,
    number_of_special_evlrs: i64,
    offset_to_special_evlrs: i64,
    items: Vec<LazItem>,
}

impl LazVlr {
    pub fn read_from<R: Read>(src: &mut R) -> Result<Self> {
        let compressor_code = src.read_u16::<LittleEndian>()?;
        let compressor = CompressorType::from_u16(compressor_code)
            .ok_or(Error::UnsupportedCompressor(compressor_code))?;
        if compressor != CompressorType::PointWiseChunked
            && compressor != CompressorType::LayeredChunked
        {
            return Err(Error::UnsupportedCompressor(compressor_code));
        }

        let coder = src.read_u16::<LittleEndian>()?;
        if coder != 0 {
            return Err(Error::UnsupportedCoder(coder));
        }

        let version = Version::read_from(src)?;
        let options = src.read_u32::<LittleEndian>()?;
        let chunk_size = src.read_u32::<LittleEndian>()?;
        let number_of_special_evlrs = src.read_i64::<LittleEndian>()?;
        let offset_to_special_evlrs = src.read_i64::<LittleEndian>()?;
        let items = read_items(src)?;

        Ok(Self {
            compressor,
            coder,
            version,
            options,
            chunk_size,
            number_of_special_evlrs,
            offset_to_special_evlrs,
            items,
        })
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    pub fn items(&self) -> &[LazItem] {
        &self.items
    }
}
