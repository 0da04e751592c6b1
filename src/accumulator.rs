use bytes::{Bytes, BytesMut};

///
/// Collects fixed-length reads out of arbitrarily split input chunks.
///
/// One read is pending at a time.  A read is served straight from the current chunk when it fits, otherwise its bytes are copied into `retained` until enough have arrived.  Reads in `ignore` mode only count bytes off and never copy them.
///
#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    chunk: Bytes,
    cursor: usize,
    retained: BytesMut,
    missing: usize,
    ignore: bool,
    offset: u64,
}

impl Accumulator {
    pub fn new() -> Self {
        Default::default()
    }

    ///
    /// Absolute stream offset of the next unread byte.
    ///
    pub fn offset(&self) -> u64 {
        self.offset
    }

    ///
    /// Whether every byte of the current chunk has been consumed or retained.
    ///
    pub fn is_drained(&self) -> bool {
        self.cursor >= self.chunk.len()
    }

    pub fn push(&mut self, chunk: Bytes) {
        debug_assert!(self.is_drained(), "previous chunk should be drained before pushing more data");
        self.chunk = chunk;
        self.cursor = 0;
    }

    ///
    /// Starts a new pending read of `length` bytes.
    ///
    pub fn expect(&mut self, length: usize, ignore: bool) {
        self.retained.clear();
        self.missing = length;
        self.ignore = ignore;
    }

    ///
    /// Completes the pending read if enough input is available.
    ///
    /// Returns `None` after consuming whatever the current chunk had to offer.  Ignored reads complete with an empty buffer.
    ///
    pub fn take(&mut self) -> Option<Bytes> {
        let available = self.chunk.len() - self.cursor;
        let count = available.min(self.missing);

        if self.ignore {
            self.advance(count);
            return if self.missing == 0 { Some(Bytes::new()) } else { None };
        }

        if self.retained.is_empty() && count == self.missing {
            let data = self.chunk.slice(self.cursor..(self.cursor + count));
            self.advance(count);
            return Some(data);
        }

        self.retained.extend_from_slice(&self.chunk[self.cursor..(self.cursor + count)]);
        self.advance(count);
        if self.missing == 0 {
            Some(self.retained.split().freeze())
        } else {
            None
        }
    }

    fn advance(&mut self, count: usize) {
        self.cursor += count;
        self.missing -= count;
        self.offset += count as u64;
    }

    ///
    /// Drops all buffered input.
    ///
    pub fn clear(&mut self) {
        self.chunk = Bytes::new();
        self.cursor = 0;
        self.retained = BytesMut::new();
        self.missing = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_within_chunk_shares_memory() {
        let chunk = Bytes::from_static(&[1, 2, 3, 4]);
        let mut accumulator = Accumulator::new();
        accumulator.push(chunk.clone());

        accumulator.expect(2, false);
        let data = accumulator.take().expect("read should complete");

        assert_eq!(&[1, 2][..], &data[..]);
        assert_eq!(chunk.as_ptr(), data.as_ptr());
        assert_eq!(2, accumulator.offset());
        assert!(!accumulator.is_drained());
    }

    #[test]
    fn read_across_chunks() {
        let mut accumulator = Accumulator::new();
        accumulator.push(Bytes::from_static(&[1, 2]));
        accumulator.expect(5, false);

        assert_eq!(None, accumulator.take());
        assert!(accumulator.is_drained());

        accumulator.push(Bytes::from_static(&[3]));
        assert_eq!(None, accumulator.take());

        accumulator.push(Bytes::from_static(&[4, 5, 6]));
        assert_eq!(Some(Bytes::from_static(&[1, 2, 3, 4, 5])), accumulator.take());
        assert_eq!(5, accumulator.offset());
        assert!(!accumulator.is_drained());

        accumulator.expect(1, false);
        assert_eq!(Some(Bytes::from_static(&[6])), accumulator.take());
        assert!(accumulator.is_drained());
    }

    #[test]
    fn ignored_read_discards() {
        let mut accumulator = Accumulator::new();
        accumulator.push(Bytes::from_static(&[1, 2, 3]));
        accumulator.expect(4, true);

        assert_eq!(None, accumulator.take());
        accumulator.push(Bytes::from_static(&[4, 5]));
        assert_eq!(Some(Bytes::new()), accumulator.take());
        assert_eq!(4, accumulator.offset());

        accumulator.expect(1, false);
        assert_eq!(Some(Bytes::from_static(&[5])), accumulator.take());
    }

    #[test]
    fn empty_read_needs_no_input() {
        let mut accumulator = Accumulator::new();
        accumulator.expect(0, false);

        assert_eq!(Some(Bytes::new()), accumulator.take());
        assert_eq!(0, accumulator.offset());
    }
}
