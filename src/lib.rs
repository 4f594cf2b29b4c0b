//! A decoder for LASzip-compressed LiDAR point clouds.
//!
//! [`LasZipReader`] is the type most callers want: give it a seekable
//! LAS/LAZ stream and it parses the header and LASzip VLR, then decodes
//! point records one at a time.
//!
//! # Example
//!
//! ```no_run
//! use laz_decoder::LasZipReader;
//! use std::fs::File;
//!
//! # fn main() -> laz_decoder::error::Result<()> {
//! let file = File::open("points.laz")?;
//! let mut reader = LasZipReader::open(file)?;
//!
//! let mut point = vec![0u8; reader.record_size()];
//! reader.read_one(&mut point)?;
//! # Ok(())
//! # }
//! ```
//!
//! Only LAS point data format 0 (the POINT10 + GPSTIME11 item pair) is
//! implemented; RGB, extra bytes, wave packets and the POINT14 family
//! are recognized in the VLR's item list but have no registered decoder
//! yet (see [`record::build_item_decoder`]). Writing LAZ data, and
//! decoding multiple streams from one file in parallel, are both out of
//! scope for this crate.

pub mod decoder;
pub mod error;
pub mod integer;
pub mod las;
pub mod laszip;
pub mod models;
pub mod record;

pub use error::{Error, Result};
pub use laszip::reader::LasZipReader;
pub use laszip::vlr::LazVlr;
