//! Implements parsing of DWARF address range tables.
//!
//! Source: https://dwarfstd.org/doc/DWARF5.pdf §6.1.2 Lookup by Address
//!
//! The `.debug_aranges` section is a sequence of units with the following
//! structure:
//! ```text
//! unit_length         4 bytes, or 0xffffffff followed by 8 bytes
//! version             2 bytes
//! debug_info_offset   4 bytes (32-bit DWARF) or 8 bytes (64-bit DWARF)
//! address_size        1 byte
//! segment_size        1 byte
//! padding             up to a multiple of the tuple size
//! (segment, address, length) tuples, terminated by an all zero tuple
//! ```
//!
//! Each unit describes the address ranges covered by one compilation unit in
//! `.debug_info`. Resolving `debug_info_offset` to that unit is left to the
//! caller.


use alloc::vec::Vec;
use core::iter::FusedIterator;

use super::cursor::{Cursor, UnexpectedEof};
use super::error::{Error, Result, SizeKind};

/// Initial length value that announces the 64-bit DWARF format.
const DWARF64_ESCAPE: u32 = 0xffff_ffff;

const HEADER_TRUNCATED: &str = "address range table header is truncated";
const BODY_TRUNCATED: &str = "address range table is truncated";

fn truncated(what: &'static str) -> impl FnOnce(UnexpectedEof) -> Error {
    move |eof| {
        trace!(offset = eof.offset, wanted = eof.wanted, "{what}");
        Error::Truncated {
            what,
            offset: eof.offset,
        }
    }
}

/// The 32-bit or 64-bit DWARF format of a unit.
///
/// Decided once by the first four bytes of the unit. It determines the width
/// of the length and of every section offset in the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Dwarf32,
    Dwarf64,
}

impl Format {
    /// The serialized size of the initial length field, escape included.
    pub fn initial_length_size(self) -> usize {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 12,
        }
    }

    /// The width of section offsets such as `debug_info_offset`.
    pub fn offset_size(self) -> usize {
        match self {
            Format::Dwarf32 => 4,
            Format::Dwarf64 => 8,
        }
    }

    fn read_offset(self, cursor: &mut Cursor<'_>) -> Result<u64, UnexpectedEof> {
        match self {
            Format::Dwarf32 => cursor.read_u32().map(u64::from),
            Format::Dwarf64 => cursor.read_u64(),
        }
    }
}

/// The header of one address range table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArangeTableHeader {
    /// Length of this table, not including the `unit_length` field itself.
    pub unit_length: u64,
    /// Format version of this table.
    pub version: u16,
    /// Location of this table's compilation unit as an offset into the
    /// `.debug_info` section.
    pub debug_info_offset: u64,
    /// Size of an address (and of a range length) in this table.
    pub address_size: u8,
    /// Size of a segment selector in this table. 0 means there is none.
    pub segment_size: u8,
    /// Whether the unit uses 32-bit or 64-bit offsets.
    pub format: Format,
}

impl ArangeTableHeader {
    pub fn new(
        unit_length: u64,
        version: u16,
        debug_info_offset: u64,
        address_size: u8,
        segment_size: u8,
        is_64_bit: bool,
    ) -> Self {
        Self {
            unit_length,
            version,
            debug_info_offset,
            address_size,
            segment_size,
            format: if is_64_bit {
                Format::Dwarf64
            } else {
                Format::Dwarf32
            },
        }
    }

    /// Whether this table uses the 64-bit DWARF format.
    pub fn is_64_bit(&self) -> bool {
        self.format == Format::Dwarf64
    }

    /// Size of the whole unit, including the initial length field.
    pub fn total_length(&self) -> u64 {
        (self.format.initial_length_size() as u64).saturating_add(self.unit_length)
    }
}

/// One `(segment, address, length)` entry of an address range table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    /// Segment selector. 0 if the table has no segment field.
    pub segment: u64,
    /// Start address.
    pub address: u64,
    /// Length of the range in bytes.
    pub length: u64,
}

impl AddressRange {
    pub const fn new(segment: u64, address: u64, length: u64) -> Self {
        Self {
            segment,
            address,
            length,
        }
    }

    /// The first address past the range.
    pub fn end(&self) -> u64 {
        self.address.saturating_add(self.length)
    }

    fn is_terminator(&self) -> bool {
        self.segment == 0 && self.address == 0 && self.length == 0
    }
}

/// A complete unit: its header and all of its ranges in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArangeTable {
    /// The header of the unit.
    pub header: ArangeTableHeader,
    /// The ranges of the unit, terminator excluded.
    pub ranges: Vec<AddressRange>,
}

/// Width of a field in a range tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Absent,
    U32,
    U64,
}

impl Width {
    fn size(self) -> usize {
        match self {
            Width::Absent => 0,
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }

    fn read(self, cursor: &mut Cursor<'_>) -> Result<u64, UnexpectedEof> {
        match self {
            Width::Absent => Ok(0),
            Width::U32 => cursor.read_u32().map(u64::from),
            Width::U64 => cursor.read_u64(),
        }
    }
}

/// The field widths of the tuples in one table.
///
/// The segment width is resolved up front. The address width is resolved for
/// each tuple after its segment field has been read, so a short buffer is
/// reported as truncated before an unsupported address size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecordLayout {
    segment: Width,
    address_size: u8,
}

impl RecordLayout {
    fn new(segment_size: u8, address_size: u8) -> Result<Self> {
        let segment = match segment_size {
            0 => Width::Absent,
            4 => Width::U32,
            8 => Width::U64,
            size => {
                return Err(Error::UnsupportedSize {
                    kind: SizeKind::Segment,
                    size,
                })
            }
        };
        Ok(Self {
            segment,
            address_size,
        })
    }

    fn address(self) -> Result<Width> {
        match self.address_size {
            4 => Ok(Width::U32),
            8 => Ok(Width::U64),
            size => Err(Error::UnsupportedSize {
                kind: SizeKind::Address,
                size,
            }),
        }
    }

    /// `None` if the address size is unsupported.
    fn tuple_size(self) -> Option<usize> {
        let address = self.address().ok()?;
        Some(self.segment.size() + 2 * address.size())
    }

    fn read(self, cursor: &mut Cursor<'_>) -> Result<AddressRange> {
        // The order is fixed: segment, address, length.
        let segment = self
            .segment
            .read(cursor)
            .map_err(truncated(BODY_TRUNCATED))?;
        let width = self.address()?;
        let address = width.read(cursor).map_err(truncated(BODY_TRUNCATED))?;
        let length = width.read(cursor).map_err(truncated(BODY_TRUNCATED))?;
        Ok(AddressRange::new(segment, address, length))
    }
}

fn read_header(cursor: &mut Cursor<'_>) -> Result<ArangeTableHeader, UnexpectedEof> {
    let length = cursor.read_u32()?;
    let (format, unit_length) = if length == DWARF64_ESCAPE {
        (Format::Dwarf64, cursor.read_u64()?)
    } else {
        (Format::Dwarf32, u64::from(length))
    };

    let version = cursor.read_u16()?;
    let debug_info_offset = format.read_offset(cursor)?;
    let address_size = cursor.read_u8()?;
    let segment_size = cursor.read_u8()?;

    Ok(ArangeTableHeader {
        unit_length,
        version,
        debug_info_offset,
        address_size,
        segment_size,
        format,
    })
}

/// Decodes the header of the table at `offset`.
///
/// On success `offset` is advanced past the header. No padding is skipped and
/// none of the header values are validated; unsupported sizes are reported by
/// the body decoder.
#[instrument(level = "trace", skip(buffer), ret)]
pub fn decode_header(buffer: &[u8], offset: &mut usize) -> Result<ArangeTableHeader> {
    let mut cursor = Cursor::new(buffer, *offset);
    let header = read_header(&mut cursor).map_err(truncated(HEADER_TRUNCATED))?;
    *offset = cursor.offset();
    Ok(header)
}

/// Decodes range tuples starting at `offset` up to and including the
/// terminating all zero tuple.
///
/// On success `offset` points right past the terminator, which is not part of
/// the result. On failure nothing is returned and `offset` is left untouched.
#[instrument(level = "trace", skip(buffer))]
pub fn decode_body(
    buffer: &[u8],
    offset: &mut usize,
    segment_size: u8,
    address_size: u8,
) -> Result<Vec<AddressRange>> {
    let mut ranges = AddressRanges::new(buffer, *offset, segment_size, address_size)?;
    let records = ranges.by_ref().collect::<Result<Vec<_>>>()?;
    *offset = ranges.offset();
    debug!(count = records.len(), end = *offset, "decoded address ranges");
    Ok(records)
}

/// Decodes a whole unit at `offset`: the header, the padding after it and the
/// ranges.
///
/// On success `offset` is moved to the end of the unit as given by its
/// length (clamped to the buffer), or just past the terminator if the length
/// claims less than that.
#[instrument(level = "trace", skip(buffer))]
pub fn decode_table(buffer: &[u8], offset: &mut usize) -> Result<ArangeTable> {
    let unit_start = *offset;
    let mut body_start = unit_start;
    let header = decode_header(buffer, &mut body_start)?;
    let layout = RecordLayout::new(header.segment_size, header.address_size)?;

    // Producers align the first tuple to the tuple size, counted from the
    // start of the unit. An unsupported address size has no tuple size and is
    // reported by the first tuple instead.
    let mut cursor = Cursor::new(buffer, body_start);
    if let Some(tuple_size) = layout.tuple_size() {
        let misalignment = (body_start - unit_start) % tuple_size;
        if misalignment != 0 {
            cursor
                .skip(tuple_size - misalignment)
                .map_err(truncated(BODY_TRUNCATED))?;
        }
    }

    let mut ranges = AddressRanges::with_layout(cursor, layout);
    let records = ranges.by_ref().collect::<Result<Vec<_>>>()?;

    let body_end = ranges.offset();
    let unit_end = usize::try_from(header.total_length())
        .ok()
        .and_then(|length| unit_start.checked_add(length))
        .map_or(buffer.len(), |end| end.min(buffer.len()));
    if unit_end < body_end {
        debug!(unit_end, body_end, "terminator lies past the unit length");
    }
    *offset = unit_end.max(body_end);

    debug!(
        debug_info_offset = header.debug_info_offset,
        count = records.len(),
        "decoded address range table"
    );
    Ok(ArangeTable {
        header,
        ranges: records,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    Terminated,
    Failed,
}

/// A lazy iterator over the range tuples of one table body.
///
/// Yields every range before the terminator, then `None`. A read failure is
/// yielded once as an error, after which the iterator is exhausted as well.
#[derive(Debug, Clone)]
pub struct AddressRanges<'a> {
    cursor: Cursor<'a>,
    layout: RecordLayout,
    state: State,
}

impl<'a> AddressRanges<'a> {
    /// Fails right away, before reading anything, if the segment size has no
    /// defined encoding. An unsupported address size is yielded as an error by
    /// the first tuple, once its segment field has been read.
    pub fn new(
        buffer: &'a [u8],
        offset: usize,
        segment_size: u8,
        address_size: u8,
    ) -> Result<Self> {
        let layout = RecordLayout::new(segment_size, address_size)?;
        Ok(Self::with_layout(Cursor::new(buffer, offset), layout))
    }

    fn with_layout(cursor: Cursor<'a>, layout: RecordLayout) -> Self {
        Self {
            cursor,
            layout,
            state: State::Reading,
        }
    }

    /// The offset of the next tuple, or the offset past the terminator once it
    /// has been read.
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Whether the terminator has been read.
    pub fn is_terminated(&self) -> bool {
        self.state == State::Terminated
    }
}

impl Iterator for AddressRanges<'_> {
    type Item = Result<AddressRange>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != State::Reading {
            return None;
        }

        match self.layout.read(&mut self.cursor) {
            Ok(range) if range.is_terminator() => {
                trace!(offset = self.cursor.offset(), "terminator");
                self.state = State::Terminated;
                None
            }
            Ok(range) => {
                trace!(
                    "range segment={:x} address={:x} length={:x}",
                    range.segment,
                    range.address,
                    range.length
                );
                Some(Ok(range))
            }
            Err(err) => {
                self.state = State::Failed;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for AddressRanges<'_> {}

/// An iterator over all tables of a `.debug_aranges` section, decoded
/// back-to-back with [`decode_table`].
///
/// Ends when the buffer is used up. The first error is yielded once and ends
/// the iteration.
#[derive(Debug, Clone)]
pub struct ArangeTables<'a> {
    buffer: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> ArangeTables<'a> {
    pub fn new(buffer: &'a [u8], offset: usize) -> Self {
        Self {
            buffer,
            offset,
            failed: false,
        }
    }

    /// The offset of the next table.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for ArangeTables<'_> {
    type Item = Result<ArangeTable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buffer.len() {
            return None;
        }

        match decode_table(self.buffer, &mut self.offset) {
            Ok(table) => Some(Ok(table)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

impl FusedIterator for ArangeTables<'_> {}
