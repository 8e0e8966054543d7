use core::fmt;

use crate::num::Addr;

/// A name inside dictionary memory, as the half-open range `start..end`.
///
/// A `Word` never owns or copies bytes. Read them back through
/// [`Dictionary::word_bytes`](crate::Dictionary::word_bytes), and compare
/// with [`Dictionary::equal`](crate::Dictionary::equal), which ignores case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Word {
    start: Addr,
    end: Addr,
}

impl Word {
    pub const fn new(start: Addr, end: Addr) -> Self {
        Self { start, end }
    }

    pub const fn from_len(start: Addr, len: Addr) -> Self {
        Self::new(start, start.wrapping_add(len))
    }

    pub const fn start(&self) -> Addr {
        self.start
    }

    pub const fn end(&self) -> Addr {
        self.end
    }

    pub const fn len(&self) -> Addr {
        self.end.wrapping_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses covered by this word, in order.
    pub fn addrs(&self) -> impl Iterator<Item = Addr> {
        let start = self.start;
        (0..self.len()).map(move |offset| start.wrapping_add(offset))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({:#06x}..{:#06x})", self.start, self.end)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes at {:#06x}", self.len(), self.start)
    }
}
