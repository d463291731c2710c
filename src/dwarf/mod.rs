//! this implements decoding of the DWARF address range tables (`.debug_aranges`)
//!
//! # how it works
//! every table starts with a header that tells us whether the unit uses the 32-bit or the 64-bit
//! DWARF format, which compilation unit it belongs to and how wide its addresses and segment
//! selectors are. after that come `(segment, address, length)` tuples until an all zero tuple.
//! See https://dwarfstd.org/doc/DWARF5.pdf for more information if more information is desired.
//!
//! everything here works on plain byte slices and an offset into them, so tables can be decoded
//! back-to-back out of a whole section.

pub mod aranges;
mod cursor;
mod error;

pub use aranges::{
    decode_body, decode_header, decode_table, AddressRange, AddressRanges, ArangeTable,
    ArangeTableHeader, ArangeTables, Format,
};
pub use error::{Error, Result, SizeKind};
