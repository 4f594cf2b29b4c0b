//! Integer decompressor: reconstructs a signed residual ("corrector")
//! from a magnitude-class symbol plus raw overflow bits, then adds it to
//! a caller-supplied prediction.

use crate::decoder::RangeDecoder;
use crate::models::{BitModel, SymbolModel};
use std::io::Read;

const DEFAULT_BITS_HIGH: u32 = 8;

/// Decodes values produced by LASzip's per-field integer compressor.
///
/// Construct with [`IntegerDecompressor::new`], call [`Self::init`] once
/// per chunk boundary, then [`Self::decompress`] once per value.
#[derive(Clone, Debug)]
pub struct IntegerDecompressor {
    k: u32,
    contexts: u32,
    bits_high: u32,
    corr_bits: u32,
    corr_range: u32,
    corr_min: i32,
    k_selectors: Vec<SymbolModel>,
    corrector0: BitModel,
    correctors: Vec<SymbolModel>,
}

impl IntegerDecompressor {
    /// `bits` is the natural bit width of the value (1..32); `contexts`
    /// is the number of independent k-selector models to keep, one per
    /// prediction context. `range`, when non-zero, overrides `bits` with
    /// an explicit wrap modulus (used by, e.g., the chunk table).
    pub fn new(bits: u32, contexts: u32) -> Self {
        Self::with_bits_high(bits, contexts, DEFAULT_BITS_HIGH, 0)
    }

    pub fn with_range(bits: u32, contexts: u32, range: u32) -> Self {
        Self::with_bits_high(bits, contexts, DEFAULT_BITS_HIGH, range)
    }

    pub fn with_bits_high(bits: u32, contexts: u32, bits_high: u32, mut range: u32) -> Self {
        let (corr_bits, corr_range, corr_min) = if range != 0 {
            let mut corr_bits = 0u32;
            let corr_range = range;
            while range != 0 {
                range >>= 1;
                corr_bits += 1;
            }
            let corr_bits = if corr_range == 1u32 << (corr_bits - 1) {
                corr_bits - 1
            } else {
                corr_bits
            };
            (corr_bits, corr_range, -((corr_range / 2) as i32))
        } else if bits != 0 && bits < 32 {
            let corr_range = 1u32 << bits;
            (bits, corr_range, -((corr_range / 2) as i32))
        } else {
            (32, 0, i32::MIN)
        };

        Self {
            k: 0,
            contexts,
            bits_high,
            corr_bits,
            corr_range,
            corr_min,
            k_selectors: Vec::new(),
            corrector0: BitModel::new(),
            correctors: Vec::new(),
        }
    }

    /// The magnitude class selected by the most recent [`Self::decompress`]
    /// call; used by callers (POINT10's y/z decode) to derive a downstream
    /// context.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Lazily allocate model state and reset it; called once at
    /// construction time and again at every chunk boundary.
    pub fn init(&mut self) {
        if self.k_selectors.is_empty() {
            self.k_selectors = (0..self.contexts)
                .map(|_| SymbolModel::new(self.corr_bits + 1, true))
                .collect();
            self.correctors = (1..=self.corr_bits)
                .map(|i| {
                    let alphabet = if i <= self.bits_high {
                        1 << i
                    } else {
                        1 << self.bits_high
                    };
                    SymbolModel::new(alphabet, true)
                })
                .collect();
        } else {
            for m in self.k_selectors.iter_mut() {
                m.init(None);
            }
            self.corrector0.init();
            for m in self.correctors.iter_mut() {
                m.init(None);
            }
        }
    }

    pub fn decompress<R: Read>(
        &mut self,
        dec: &mut RangeDecoder<R>,
        pred: i32,
        context: u32,
    ) -> std::io::Result<i32> {
        self.k = dec.decode_symbol(&mut self.k_selectors[context as usize])?;

        let corr: i32 = if self.k == 0 {
            dec.decode_bit(&mut self.corrector0)? as i32
        } else if self.k < 32 {
            let mut c = if self.k <= self.bits_high {
                dec.decode_symbol(&mut self.correctors[(self.k - 1) as usize])? as i32
            } else {
                let k1 = self.k - self.bits_high;
                let high = dec.decode_symbol(&mut self.correctors[(self.k - 1) as usize])? as i32;
                let low = dec.read_bits(k1)? as i32;
                (high << k1) | low
            };
            if c >= (1i32 << (self.k - 1)) {
                c += 1;
            } else {
                c -= (1i32 << self.k) - 1;
            }
            c
        } else {
            self.corr_min
        };

        let mut real = pred.wrapping_add(corr);
        if self.corr_range != 0 {
            if real < 0 {
                real += self.corr_range as i32;
            } else if real >= self.corr_range as i32 {
                real -= self.corr_range as i32;
            }
        }
        Ok(real)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    // Same 256-byte reference string as decoder.rs's golden-vector tests;
    // every expected output here was produced by decoding this exact
    // string.
    const B: [u8; 256] = [
        0xad, 0x5d, 0x0d, 0xf3, 0x2d, 0x76, 0x2a, 0x56, 0xa9, 0xd3, 0xf9, 0xbb, 0x7f, 0x9a, 0x06,
        0xc9, 0x5e, 0x68, 0x57, 0x76, 0xe7, 0xe7, 0x0d, 0x58, 0x45, 0xf0, 0x77, 0x88, 0x2b, 0xe0,
        0x47, 0x12, 0xe0, 0x06, 0x3f, 0x63, 0xc8, 0xd7, 0x65, 0xa1, 0xe0, 0x09, 0x86, 0x08, 0x9a,
        0x11, 0x88, 0xd4, 0x55, 0xbf, 0x62, 0x3f, 0x64, 0x60, 0x48, 0xdc, 0x67, 0x71, 0x15, 0xab,
        0x09, 0x78, 0xe7, 0x8b, 0x50, 0x5c, 0xf0, 0x99, 0xa9, 0xf1, 0xf2, 0x47, 0x2d, 0x40, 0x37,
        0x79, 0xf9, 0x4a, 0x94, 0x29, 0x17, 0xe6, 0xa2, 0x3e, 0x17, 0x8d, 0xdf, 0x14, 0xf3, 0xc9,
        0x85, 0x51, 0xc5, 0x3f, 0x42, 0x54, 0x42, 0xfd, 0x9d, 0xa8, 0x3e, 0xf8, 0x30, 0x8a, 0x19,
        0x01, 0x28, 0xc2, 0x4e, 0xe0, 0x60, 0xbc, 0x24, 0x9b, 0x91, 0xe0, 0xed, 0xe3, 0x19, 0x4b,
        0xdb, 0xba, 0x01, 0x11, 0x9a, 0xf2, 0x89, 0x01, 0xb1, 0xb5, 0xb2, 0x25, 0xe7, 0x3d, 0x2e,
        0x75, 0x61, 0xbb, 0x92, 0x28, 0x2d, 0xb4, 0xde, 0x3d, 0x2a, 0x23, 0xec, 0x15, 0x48, 0x73,
        0x3a, 0x80, 0xa7, 0x0b, 0xba, 0xe6, 0xbc, 0x44, 0x21, 0x27, 0x1c, 0x08, 0x09, 0x1d, 0x62,
        0xfe, 0x54, 0xa5, 0x5f, 0x15, 0x4f, 0x65, 0x4c, 0x81, 0x2c, 0x5a, 0xf2, 0x5c, 0x7c, 0x86,
        0x69, 0x5b, 0xc0, 0x1f, 0x51, 0x9e, 0x3b, 0x32, 0x5d, 0xef, 0x92, 0xbb, 0x16, 0xfd, 0xcb,
        0x88, 0x9f, 0x13, 0x4a, 0x65, 0xe8, 0x2d, 0x40, 0x8a, 0xbd, 0xc7, 0x29, 0x76, 0xb3, 0x4b,
        0xcc, 0x9e, 0xa4, 0xaf, 0xc8, 0xb5, 0x05, 0x1c, 0x21, 0x97, 0x69, 0xe4, 0x8c, 0x89, 0x6e,
        0xb5, 0x9c, 0xb0, 0xbc, 0x00, 0x85, 0x0d, 0x65, 0xed, 0x30, 0x8b, 0xe0, 0xe4, 0x0c, 0x1c,
        0x3b, 0x20, 0xbf, 0x2a, 0x89, 0xec, 0xa9, 0x80, 0xc2, 0x6e, 0xc0, 0x52, 0x28, 0x8d, 0x7c,
        0x1a,
    ];

    fn golden_decoder() -> RangeDecoder<Cursor<&'static [u8]>> {
        RangeDecoder::new(Cursor::new(&B[..]))
    }

    #[test]
    fn decompress_matches_golden_sequence() {
        let mut dec = golden_decoder();
        dec.start().unwrap();
        let mut ic = IntegerDecompressor::new(16, 1);
        ic.init();
        let expected = [
            (1051, 11),
            (998, 6),
            (997, 1),
            (865, 8),
            (64006, 12),
            (64001, 3),
            (64027, 5),
        ];
        let mut pred = 0i32;
        for &(want_value, want_k) in &expected {
            pred = ic.decompress(&mut dec, pred, 0).unwrap();
            assert_eq!(pred, want_value);
            assert_eq!(ic.k(), want_k);
        }
    }

    #[test]
    fn corr_range_zero_means_no_wrap() {
        let mut dec = golden_decoder();
        dec.start().unwrap();
        let mut ic = IntegerDecompressor::new(32, 1);
        ic.init();
        // Should not panic even when the corrector pushes the value
        // outside i32's nominal "small" range; with corr_range == 0 the
        // result is simply the wrapping sum.
        let _ = ic.decompress(&mut dec, i32::MAX - 10, 0).unwrap();
    }
}
