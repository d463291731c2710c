//! A decoder for DWARF address range tables.
//!
//! ```
//! let section = [
//!     0x1c, 0, 0, 0, // unit_length
//!     2, 0, // version
//!     0, 0, 0, 0, // debug_info_offset
//!     4, 0, // address_size, segment_size
//!     0, 0, 0, 0, // padding
//!     0x00, 0x10, 0, 0, 0x20, 0, 0, 0, // range
//!     0, 0, 0, 0, 0, 0, 0, 0, // terminator
//! ];
//!
//! let mut offset = 0;
//! let table = uwuranges::decode_table(&section, &mut offset).unwrap();
//! assert_eq!(table.ranges, [uwuranges::AddressRange::new(0, 0x1000, 0x20)]);
//! assert_eq!(offset, section.len());
//! ```
#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate tracing;

pub mod dwarf;

pub use dwarf::{
    decode_body, decode_header, decode_table, AddressRange, AddressRanges, ArangeTable,
    ArangeTableHeader, ArangeTables, Error, Format, Result, SizeKind,
};
