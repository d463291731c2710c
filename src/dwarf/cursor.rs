//! Bounds-checked sequential reads of little-endian integers.


/// A read wanted more bytes than the buffer had left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnexpectedEof {
    /// Where the failed read started.
    pub(crate) offset: usize,
    pub(crate) wanted: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    fn read_bytes(&mut self, amount: usize) -> Result<&'a [u8], UnexpectedEof> {
        let eof = UnexpectedEof {
            offset: self.offset,
            wanted: amount,
        };
        let end = self.offset.checked_add(amount).ok_or(eof)?;
        let bytes = self.data.get(self.offset..end).ok_or(eof)?;
        self.offset = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], UnexpectedEof> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub(crate) fn skip(&mut self, amount: usize) -> Result<(), UnexpectedEof> {
        self.read_bytes(amount).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, UnexpectedEof> {
        self.read_array().map(u8::from_le_bytes)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, UnexpectedEof> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, UnexpectedEof> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64, UnexpectedEof> {
        self.read_array().map(u64::from_le_bytes)
    }
}
