//! Backing memory for a [`Dictionary`](super::Dictionary)

use crate::num::{Addr, Cell};

/// The read/write contract a dictionary needs from its memory.
///
/// Cell accessors default to little-endian pairs of byte accesses, so a
/// backend only has to provide bytes. Backends are free to split the address
/// range over different media (read-only and writable, near and far) as long
/// as a cell-aligned access behaves as one unit from the dictionary's point of
/// view.
pub trait Storage {
    /// Number of addressable bytes.
    fn capacity(&self) -> usize;

    fn read_byte(&self, addr: Addr) -> u8;

    fn write_byte(&mut self, addr: Addr, value: u8);

    fn read(&self, addr: Addr) -> Cell {
        Cell::from_le_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    fn write(&mut self, addr: Addr, value: Cell) {
        let [low, high] = value.to_le_bytes();
        self.write_byte(addr, low);
        self.write_byte(addr.wrapping_add(1), high);
    }
}

/// Largest memory a 16-bit address can reach.
pub const MAX_CAPACITY: usize = Addr::MAX as usize + 1;

/// A flat, heap-allocated block of memory.
///
/// Reads past the end yield zero and writes past the end are dropped.
#[derive(Clone)]
pub struct MemoryStorage {
    bytes: Box<[u8]>,
}

impl MemoryStorage {
    /// Allocates `capacity` zeroed bytes, clamped to [`MAX_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity.min(MAX_CAPACITY)].into_boxed_slice(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(MAX_CAPACITY)
    }
}

impl Storage for MemoryStorage {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn read_byte(&self, addr: Addr) -> u8 {
        self.bytes.get(addr as usize).copied().unwrap_or(0)
    }

    fn write_byte(&mut self, addr: Addr, value: u8) {
        if let Some(byte) = self.bytes.get_mut(addr as usize) {
            *byte = value;
        }
    }

    fn read(&self, addr: Addr) -> Cell {
        match self.bytes.get(addr as usize..addr as usize + 2) {
            Some(&[low, high]) => Cell::from_le_bytes([low, high]),
            _ => Cell::from_le_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStorage, Storage, MAX_CAPACITY};
    use assert2::check;

    #[test]
    fn cells_are_little_endian() {
        let mut mem = MemoryStorage::new(16);
        mem.write(4, 0x1234);
        check!(mem.read_byte(4) == 0x34);
        check!(mem.read_byte(5) == 0x12);
        check!(mem.read(4) == 0x1234);
        mem.write(6, -2);
        check!(mem.read(6) == -2);
    }

    #[test]
    fn out_of_range_is_inert() {
        let mut mem = MemoryStorage::new(8);
        mem.write_byte(100, 7);
        check!(mem.read_byte(100) == 0);
        mem.write(7, 0x0101);
        check!(mem.read_byte(7) == 1);
        check!(mem.read(7) == 1);
        check!(MemoryStorage::new(1 << 20).capacity() == MAX_CAPACITY);
    }

    #[test]
    fn top_of_memory_wraps() {
        let mut mem = MemoryStorage::default();
        mem.write(0xFFFF, 0x0102);
        check!(mem.read_byte(0xFFFF) == 0x02);
        check!(mem.read_byte(0) == 0x01);
        check!(mem.read(0xFFFF) == 0x0102);
    }
}
