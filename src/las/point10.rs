//! POINT10 predictive decoder: LAS point data format 0 geometry and
//! per-point attributes (20 bytes).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;
use std::io::{Read, Write};

use crate::decoder::RangeDecoder;
use crate::integer::IntegerDecompressor;
use crate::las::util::{u32_zero_bit, NUMBER_RETURN_LEVEL, NUMBER_RETURN_MAP};
use crate::models::SymbolModel;

/// A decoded LAS point data format 0 record.
#[derive(Default, Copy, Clone, PartialEq, Debug)]
pub struct Point10 {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub intensity: u16,
    pub return_number: u8,
    pub number_of_returns: u8,
    pub scan_direction_flag: bool,
    pub edge_of_flight_line: bool,
    pub classification: u8,
    pub scan_angle_rank: i8,
    pub user_data: u8,
    pub point_source_id: u16,
}

pub const SIZE: usize = 20;

impl Point10 {
    pub fn unpack_bitfield(&mut self, byte: u8) {
        self.return_number = byte & 0x7;
        self.number_of_returns = (byte >> 3) & 0x7;
        self.scan_direction_flag = ((byte >> 6) & 0x1) != 0;
        self.edge_of_flight_line = ((byte >> 7) & 0x1) != 0;
    }

    pub fn bitfield(&self) -> u8 {
        ((self.edge_of_flight_line as u8) << 7)
            | ((self.scan_direction_flag as u8) << 6)
            | ((self.number_of_returns & 0x7) << 3)
            | (self.return_number & 0x7)
    }

    pub fn read_raw<R: Read>(src: &mut R) -> std::io::Result<Self> {
        let mut p = Self::default();
        p.x = src.read_i32::<LittleEndian>()?;
        p.y = src.read_i32::<LittleEndian>()?;
        p.z = src.read_i32::<LittleEndian>()?;
        p.intensity = src.read_u16::<LittleEndian>()?;
        let bitfield = src.read_u8()?;
        p.unpack_bitfield(bitfield);
        p.classification = src.read_u8()?;
        p.scan_angle_rank = src.read_i8()?;
        p.user_data = src.read_u8()?;
        p.point_source_id = src.read_u16::<LittleEndian>()?;
        Ok(p)
    }

    pub fn write_raw<W: Write>(&self, dst: &mut W) -> std::io::Result<()> {
        dst.write_i32::<LittleEndian>(self.x)?;
        dst.write_i32::<LittleEndian>(self.y)?;
        dst.write_i32::<LittleEndian>(self.z)?;
        dst.write_u16::<LittleEndian>(self.intensity)?;
        dst.write_u8(self.bitfield())?;
        dst.write_u8(self.classification)?;
        dst.write_i8(self.scan_angle_rank)?;
        dst.write_u8(self.user_data)?;
        dst.write_u16::<LittleEndian>(self.point_source_id)?;
        Ok(())
    }
}

/// A sparse array of 256 lazily-allocated symbol models, keyed by the
/// byte value of the "last" point whose model is being consulted.
///
/// Keeping these lazy avoids paying for 256 * 256-symbol models up
/// front when real files typically touch only a handful of distinct
/// bitfield/classification/user_data values per chunk.
#[derive(Debug)]
struct SparseByteModels {
    slots: Vec<Option<SymbolModel>>,
}

impl SparseByteModels {
    fn new() -> Self {
        Self {
            slots: (0..256).map(|_| None).collect(),
        }
    }

    fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    fn get_or_init(&mut self, key: u8) -> &mut SymbolModel {
        self.slots[key as usize].get_or_insert_with(|| SymbolModel::new(256, true))
    }
}

#[derive(Debug)]
struct State {
    last_point: Point10,
    last_intensity: [u16; 16],
    last_x_diff_median: Vec<crate::las::util::StreamingMedian5>,
    last_y_diff_median: Vec<crate::las::util::StreamingMedian5>,
    last_height: [i32; 8],

    changed_values: SymbolModel,
    scan_angle_rank: Vec<SymbolModel>,
    bit_byte: SparseByteModels,
    classification: SparseByteModels,
    user_data: SparseByteModels,
}

impl State {
    fn new() -> Self {
        Self {
            last_point: Point10::default(),
            last_intensity: [0u16; 16],
            last_x_diff_median: (0..16).map(|_| crate::las::util::StreamingMedian5::new()).collect(),
            last_y_diff_median: (0..16).map(|_| crate::las::util::StreamingMedian5::new()).collect(),
            last_height: [0i32; 8],
            changed_values: SymbolModel::new(64, true),
            scan_angle_rank: (0..2).map(|_| SymbolModel::new(256, true)).collect(),
            bit_byte: SparseByteModels::new(),
            classification: SparseByteModels::new(),
            user_data: SparseByteModels::new(),
        }
    }

    fn reset(&mut self) {
        self.last_intensity = [0u16; 16];
        for m in self.last_x_diff_median.iter_mut() {
            *m = crate::las::util::StreamingMedian5::new();
        }
        for m in self.last_y_diff_median.iter_mut() {
            *m = crate::las::util::StreamingMedian5::new();
        }
        self.last_height = [0i32; 8];
        self.changed_values.init(None);
        for m in self.scan_angle_rank.iter_mut() {
            m.init(None);
        }
        self.bit_byte.reset();
        self.classification.reset();
        self.user_data.reset();
    }
}

/// Predictive decoder for the POINT10 LAZ item.
#[derive(Debug)]
pub struct Point10Decompressor {
    ic_intensity: IntegerDecompressor,
    ic_point_source_id: IntegerDecompressor,
    ic_dx: IntegerDecompressor,
    ic_dy: IntegerDecompressor,
    ic_z: IntegerDecompressor,
    state: State,
}

impl Point10Decompressor {
    pub fn new() -> Self {
        Self {
            ic_intensity: IntegerDecompressor::new(16, 4),
            ic_point_source_id: IntegerDecompressor::new(16, 1),
            ic_dx: IntegerDecompressor::new(32, 2),
            ic_dy: IntegerDecompressor::new(32, 22),
            ic_z: IntegerDecompressor::new(32, 20),
            state: State::new(),
        }
    }

    /// Re-initialize all owned models/integer compressors and seed the
    /// predictive state from the chunk's first, raw point. Called once
    /// per chunk boundary.
    pub fn init_with_first_point(&mut self, raw: Point10) {
        self.ic_intensity.init();
        self.ic_point_source_id.init();
        self.ic_dx.init();
        self.ic_dy.init();
        self.ic_z.init();
        self.state.reset();
        self.state.last_point = raw;
        self.state.last_point.intensity = 0;
    }

    pub fn read<R: Read>(&mut self, dec: &mut RangeDecoder<R>) -> std::io::Result<Point10> {
        let changed = dec.decode_symbol(&mut self.state.changed_values)?;

        let (r, n, m, l);
        if changed != 0 {
            if changed & (1 << 5) != 0 {
                let last_bitfield = self.state.last_point.bitfield();
                let b = dec.decode_symbol(self.state.bit_byte.get_or_init(last_bitfield))? as u8;
                self.state.last_point.unpack_bitfield(b);
            }

            r = self.state.last_point.return_number;
            n = self.state.last_point.number_of_returns;
            m = NUMBER_RETURN_MAP[n as usize][r as usize];
            l = NUMBER_RETURN_LEVEL[n as usize][r as usize];

            if changed & (1 << 4) != 0 {
                let ctx = if m < 3 { m as u32 } else { 3 };
                let intensity = self.ic_intensity.decompress(
                    dec,
                    self.state.last_intensity[m as usize] as i32,
                    ctx,
                )? as u16;
                self.state.last_point.intensity = intensity;
                self.state.last_intensity[m as usize] = intensity;
            } else {
                self.state.last_point.intensity = self.state.last_intensity[m as usize];
            }

            if changed & (1 << 3) != 0 {
                let last_classification = self.state.last_point.classification;
                self.state.last_point.classification = dec
                    .decode_symbol(self.state.classification.get_or_init(last_classification))?
                    as u8;
            }

            if changed & (1 << 2) != 0 {
                let delta = dec.decode_symbol(
                    &mut self.state.scan_angle_rank[self.state.last_point.scan_direction_flag as usize],
                )? as u8;
                let prev = self.state.last_point.scan_angle_rank as u8;
                self.state.last_point.scan_angle_rank = prev.wrapping_add(delta) as i8;
            }

            if changed & (1 << 1) != 0 {
                let last_user_data = self.state.last_point.user_data;
                self.state.last_point.user_data =
                    dec.decode_symbol(self.state.user_data.get_or_init(last_user_data))? as u8;
            }

            if changed & 1 != 0 {
                let point_source_id = self.ic_point_source_id.decompress(
                    dec,
                    self.state.last_point.point_source_id as i32,
                    0,
                )? as u16;
                self.state.last_point.point_source_id = point_source_id;
            }
        } else {
            r = self.state.last_point.return_number;
            n = self.state.last_point.number_of_returns;
            m = NUMBER_RETURN_MAP[n as usize][r as usize];
            l = NUMBER_RETURN_LEVEL[n as usize][r as usize];
        }

        trace!("point10: m={} l={} changed={:#08b}", m, l, changed);

        let median_x = self.state.last_x_diff_median[m as usize].get();
        let diff_x = self
            .ic_dx
            .decompress(dec, median_x, (n == 1) as u32)?;
        self.state.last_point.x += diff_x;
        self.state.last_x_diff_median[m as usize].add(diff_x);

        let k = self.ic_dx.k();
        let context_y = (n == 1) as u32 + if k < 20 { u32_zero_bit(k) } else { 20 };
        let median_y = self.state.last_y_diff_median[m as usize].get();
        let diff_y = self.ic_dy.decompress(dec, median_y, context_y)?;
        self.state.last_point.y += diff_y;
        self.state.last_y_diff_median[m as usize].add(diff_y);

        let k_avg = (self.ic_dx.k() + self.ic_dy.k()) / 2;
        let context_z = (n == 1) as u32 + if k_avg < 18 { u32_zero_bit(k_avg) } else { 18 };
        self.state.last_point.z =
            self.ic_z
                .decompress(dec, self.state.last_height[l as usize], context_z)?;
        self.state.last_height[l as usize] = self.state.last_point.z;

        Ok(self.state.last_point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitfield_roundtrips() {
        let mut p = Point10::default();
        p.unpack_bitfield(0b1_1_101_011);
        assert_eq!(p.return_number, 0b011);
        assert_eq!(p.number_of_returns, 0b101);
        assert!(p.scan_direction_flag);
        assert!(p.edge_of_flight_line);
        assert_eq!(p.bitfield(), 0b1_1_101_011);
    }

    #[test]
    fn raw_point_round_trips_through_bytes() {
        let p = Point10 {
            x: 123,
            y: -456,
            z: 789,
            intensity: 4000,
            return_number: 2,
            number_of_returns: 3,
            scan_direction_flag: true,
            edge_of_flight_line: false,
            classification: 7,
            scan_angle_rank: -12,
            user_data: 9,
            point_source_id: 55,
        };
        let mut buf = Vec::new();
        p.write_raw(&mut buf).unwrap();
        assert_eq!(buf.len(), SIZE);
        let back = Point10::read_raw(&mut std::io::Cursor::new(buf)).unwrap();
        assert_eq!(p, back);
    }
}
