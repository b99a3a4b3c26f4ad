//! Bounds-checked reading over a byte slice.

/// Forward-only reader that yields `None` instead of reading past the end.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at `pos`.  A position past the end yields an
    /// exhausted cursor.
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos: pos.min(data.len()),
        }
    }

    pub const fn position(&self) -> usize {
        self.pos
    }

    pub const fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Take the next `n` bytes, or `None` (without advancing) if fewer remain.
    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn u32_le(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reads_until_exhausted() {
        let mut c = Cursor::new(&[1, 2, 3]);
        assert_eq!(c.u8(), Some(1));
        assert_eq!(c.peek(), Some(2));
        assert_eq!(c.take(2).unwrap(), &[2, 3]);
        assert!(c.is_empty());
        assert_eq!(c.u8(), None);
    }

    #[test]
    fn short_take_does_not_advance() {
        let mut c = Cursor::new(&[1, 2]);
        assert!(c.take(3).is_none());
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn at_clamps_to_len() {
        let c = Cursor::at(&[1, 2], 10);
        assert!(c.is_empty());
    }

    #[test]
    fn u32_le() {
        let mut c = Cursor::new(&[0x78, 0x56, 0x34, 0x12, 0xFF]);
        assert_eq!(c.u32_le(), Some(0x1234_5678));
        assert_eq!(c.position(), 4);
    }
}
