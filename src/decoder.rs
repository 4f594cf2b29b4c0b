//! Range (arithmetic) decoder: bit-exact decoding over a 32-bit interval.
//!
//! Ported from the interval-halving coder described in Said & Pearlman's
//! "Digital Signal Compression" and used, unmodified in its core
//! arithmetic, by LASzip. [`RangeDecoder`] owns the byte cursor and the
//! `(length, value)` interval; [`models::BitModel`] and
//! [`models::SymbolModel`] own their own probability state and are passed
//! in by mutable reference, which keeps the decoder from needing a
//! back-reference into the models it drives.

use byteorder::ReadBytesExt;
use std::io::Read;

use crate::models::{BitModel, SymbolModel};

const DM_LENGTH_SHIFT: u32 = 15;
const BM_LENGTH_SHIFT: u32 = 13;

/// Maximum representable interval length; also the initial `length`.
pub const MAX_LENGTH: u32 = 0xFFFF_FFFF;
/// Renormalization threshold: once `length` drops below this, another
/// byte is pulled from the stream.
pub const MIN_LENGTH: u32 = 0x0100_0000;

/// A range decoder reading from `R`.
pub struct RangeDecoder<R: Read> {
    source: R,
    value: u32,
    length: u32,
}

impl<R: Read> RangeDecoder<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            value: 0,
            length: MAX_LENGTH,
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Reset the interval to its initial state without touching the
    /// underlying byte source; callers still need [`Self::start`] to
    /// pull the first 4 bytes before decoding.
    pub fn reset(&mut self) {
        self.value = 0;
        self.length = MAX_LENGTH;
    }

    /// Start (or restart, at a chunk boundary) the decoder: reset the
    /// interval and read the initial 4-byte big-endian value.
    pub fn start(&mut self) -> std::io::Result<()> {
        self.reset();
        let mut buf = [0u8; 4];
        self.source.read_exact(&mut buf)?;
        self.value = u32::from_be_bytes(buf);
        Ok(())
    }

    pub fn decode_bit(&mut self, model: &mut BitModel) -> std::io::Result<u32> {
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);
        let sym = self.value >= x;
        if !sym {
            self.length = x;
            model.bit_0_count += 1;
        } else {
            self.value -= x;
            self.length -= x;
        }
        if self.length < MIN_LENGTH {
            self.renormalize()?;
        }
        model.tick();
        Ok(sym as u32)
    }

    pub fn decode_symbol(&mut self, model: &mut SymbolModel) -> std::io::Result<u32> {
        let mut sym;
        let n;
        let x;
        let mut y = self.length;

        if !model.decoder_table.is_empty() {
            self.length >>= DM_LENGTH_SHIFT;
            let dv = self.value / self.length;
            let t = dv >> model.table_shift;

            sym = model.decoder_table[t as usize];
            let mut n_local = model.decoder_table[t as usize + 1] + 1;
            while n_local > sym + 1 {
                let k = (sym + n_local) >> 1;
                if model.distribution[k as usize] > dv {
                    n_local = k;
                } else {
                    sym = k;
                }
            }
            n = n_local;
            x = model.distribution[sym as usize] * self.length;
            if sym != model.last_symbol {
                y = model.distribution[sym as usize + 1] * self.length;
            }
        } else {
            let mut local_x = 0u32;
            let mut local_sym = 0u32;
            self.length >>= DM_LENGTH_SHIFT;
            let mut local_n = model.num_symbols();
            let mut k = local_n >> 1;
            loop {
                let z = self.length * model.distribution[k as usize];
                if z > self.value {
                    local_n = k;
                    y = z;
                } else {
                    local_sym = k;
                    local_x = z;
                }
                k = (local_sym + local_n) >> 1;
                if k == local_sym {
                    break;
                }
            }
            sym = local_sym;
            n = local_n;
            x = local_x;
        }
        let _ = n;

        self.value -= x;
        self.length = y - x;
        if self.length < MIN_LENGTH {
            self.renormalize()?;
        }
        model.tick(sym);
        Ok(sym)
    }

    pub fn read_bits(&mut self, bits: u32) -> std::io::Result<u32> {
        assert!(bits > 0 && bits <= 32);
        if bits > 19 {
            let low = self.read_n_bits(16)?;
            let high = self.read_bits(bits - 16)?;
            Ok((high << 16) | low)
        } else {
            self.read_n_bits(bits)
        }
    }

    fn read_n_bits(&mut self, bits: u32) -> std::io::Result<u32> {
        self.length >>= bits;
        let sym = self.value / self.length;
        self.value -= self.length * sym;
        if self.length < MIN_LENGTH {
            self.renormalize()?;
        }
        Ok(sym)
    }

    pub fn read_int(&mut self) -> std::io::Result<u32> {
        self.read_bits(32)
    }

    fn renormalize(&mut self) -> std::io::Result<()> {
        loop {
            let byte = self.source.read_u8()?;
            self.value = (self.value << 8) | byte as u32;
            self.length <<= 8;
            if self.length >= MIN_LENGTH {
                break;
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }
}
