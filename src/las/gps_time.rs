//! GPSTIME11 predictive decoder: LAS GPS time field, modeled as a
//! multiplier against a tracked sequence of regularly-spaced pulses.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

use crate::decoder::RangeDecoder;
use crate::integer::IntegerDecompressor;
use crate::models::SymbolModel;

const MULTI: i32 = 500;
const MULTI_MINUS: i32 = -10;
const MULTI_UNCHANGED: i32 = MULTI - MULTI_MINUS + 1;
const MULTI_CODE_FULL: i32 = MULTI - MULTI_MINUS + 2;
const TOTAL: i32 = MULTI - MULTI_MINUS + 6;

pub const SIZE: usize = 8;

/// A decoded GPS time value, stored as the bit pattern of the original
/// `f64` reinterpreted as `i64` (the field is never interpreted as a
/// float by the decoder itself).
#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct GpsTime {
    pub value: i64,
}

impl GpsTime {
    pub fn read_raw<R: Read>(src: &mut R) -> std::io::Result<Self> {
        let lower = src.read_u32::<LittleEndian>()?;
        let upper = src.read_u32::<LittleEndian>()?;
        Ok(Self {
            value: ((upper as i64) << 32) | lower as i64,
        })
    }

    pub fn write_raw<W: Write>(&self, dst: &mut W) -> std::io::Result<()> {
        dst.write_u32::<LittleEndian>((self.value & 0xFFFF_FFFF) as u32)?;
        dst.write_u32::<LittleEndian>((self.value >> 32) as u32)?;
        Ok(())
    }
}

#[derive(Debug)]
struct State {
    gps_time_multi: SymbolModel,
    gps_time_0_diff: SymbolModel,
    last: usize,
    next: usize,
    last_gps_times: [GpsTime; 4],
    last_gps_time_diffs: [i32; 4],
    multi_extreme_counters: [i32; 4],
}

impl State {
    fn new() -> Self {
        Self {
            gps_time_multi: SymbolModel::new(TOTAL as u32, true),
            gps_time_0_diff: SymbolModel::new(6, true),
            last: 0,
            next: 0,
            last_gps_times: [GpsTime::default(); 4],
            last_gps_time_diffs: [0i32; 4],
            multi_extreme_counters: [0i32; 4],
        }
    }

    fn reset(&mut self) {
        self.gps_time_multi.init(None);
        self.gps_time_0_diff.init(None);
        self.last = 0;
        self.next = 0;
        self.last_gps_times = [GpsTime::default(); 4];
        self.last_gps_time_diffs = [0i32; 4];
        self.multi_extreme_counters = [0i32; 4];
    }
}

/// Predictive decoder for the GPSTIME11 LAZ item.
#[derive(Debug)]
pub struct GpsTimeDecompressor {
    ic_gps_time: IntegerDecompressor,
    state: State,
}

impl GpsTimeDecompressor {
    pub fn new() -> Self {
        Self {
            ic_gps_time: IntegerDecompressor::new(32, 9),
            state: State::new(),
        }
    }

    pub fn init_with_first_point(&mut self, raw: GpsTime) {
        self.ic_gps_time.init();
        self.state.reset();
        self.state.last_gps_times[0] = raw;
    }

    pub fn read<R: Read>(&mut self, dec: &mut RangeDecoder<R>) -> std::io::Result<GpsTime> {
        let last = self.state.last;

        if self.state.last_gps_time_diffs[last] == 0 {
            let multi = dec.decode_symbol(&mut self.state.gps_time_0_diff)? as i32;

            if multi == 1 {
                let diff = self.ic_gps_time.decompress(dec, 0, 0)?;
                self.state.last_gps_time_diffs[last] = diff;
                self.state.last_gps_times[last].value += diff as i64;
                self.state.multi_extreme_counters[last] = 0;
            } else if multi == 2 {
                self.state.next = (self.state.next + 1) & 3;
                let next = self.state.next;
                let upper = self.ic_gps_time.decompress(
                    dec,
                    (self.state.last_gps_times[last].value >> 32) as i32,
                    8,
                )?;
                let lower = dec.read_int()?;
                self.state.last_gps_times[next].value = ((upper as i64) << 32) | lower as i64;
                self.state.last = next;
                self.state.last_gps_time_diffs[next] = 0;
                self.state.multi_extreme_counters[next] = 0;
            } else if multi > 2 {
                self.state.last = (self.state.last + multi as usize - 2) & 3;
                return self.read(dec);
            }
        } else {
            let mut multi = dec.decode_symbol(&mut self.state.gps_time_multi)? as i32;

            if multi == 1 {
                let diff =
                    self.ic_gps_time
                        .decompress(dec, self.state.last_gps_time_diffs[last], 1)?;
                self.state.last_gps_times[last].value += diff as i64;
                self.state.multi_extreme_counters[last] = 0;
            } else if multi < MULTI_UNCHANGED {
                let gps_time_diff = if multi == 0 {
                    let diff = self.ic_gps_time.decompress(dec, 0, 7)?;
                    self.state.multi_extreme_counters[last] += 1;
                    if self.state.multi_extreme_counters[last] > 3 {
                        self.state.last_gps_time_diffs[last] = diff;
                        self.state.multi_extreme_counters[last] = 0;
                    }
                    diff
                } else if multi < MULTI {
                    let context = if multi < 10 { 2 } else { 3 };
                    self.ic_gps_time.decompress(
                        dec,
                        multi * self.state.last_gps_time_diffs[last],
                        context,
                    )?
                } else if multi == MULTI {
                    let diff = self.ic_gps_time.decompress(
                        dec,
                        multi * self.state.last_gps_time_diffs[last],
                        4,
                    )?;
                    self.state.multi_extreme_counters[last] += 1;
                    if self.state.multi_extreme_counters[last] > 3 {
                        self.state.last_gps_time_diffs[last] = diff;
                        self.state.multi_extreme_counters[last] = 0;
                    }
                    diff
                } else {
                    multi = MULTI - multi;
                    if multi > MULTI_MINUS {
                        self.ic_gps_time.decompress(
                            dec,
                            multi * self.state.last_gps_time_diffs[last],
                            5,
                        )?
                    } else {
                        let diff = self.ic_gps_time.decompress(
                            dec,
                            MULTI_MINUS * self.state.last_gps_time_diffs[last],
                            6,
                        )?;
                        self.state.multi_extreme_counters[last] += 1;
                        if self.state.multi_extreme_counters[last] > 3 {
                            self.state.last_gps_time_diffs[last] = diff;
                            self.state.multi_extreme_counters[last] = 0;
                        }
                        diff
                    }
                };
                self.state.last_gps_times[last].value += gps_time_diff as i64;
            } else if multi == MULTI_CODE_FULL {
                self.state.next = (self.state.next + 1) & 3;
                let next = self.state.next;
                let upper = self.ic_gps_time.decompress(
                    dec,
                    (self.state.last_gps_times[last].value >> 32) as i32,
                    8,
                )?;
                let lower = dec.read_int()?;
                self.state.last_gps_times[next].value = ((upper as i64) << 32) | lower as i64;
                self.state.last = next;
                self.state.last_gps_time_diffs[next] = 0;
                self.state.multi_extreme_counters[next] = 0;
            } else if multi > MULTI_CODE_FULL {
                self.state.last = (self.state.last + multi as usize - MULTI_CODE_FULL as usize) & 3;
                return self.read(dec);
            }
        }

        Ok(self.state.last_gps_times[self.state.last])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_gps_time_round_trips_through_bytes() {
        let t = GpsTime { value: -123456789 };
        let mut buf = Vec::new();
        t.write_raw(&mut buf).unwrap();
        assert_eq!(buf.len(), SIZE);
        let back = GpsTime::read_raw(&mut std::io::Cursor::new(buf)).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn thresholds_match_the_expected_layout() {
        assert_eq!(MULTI_UNCHANGED, 511);
        assert_eq!(MULTI_CODE_FULL, 512);
        assert_eq!(TOTAL, 516);
    }
}
