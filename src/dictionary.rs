//! The dictionary: one flat, byte-addressed memory holding both the
//! interpreter's bookkeeping cells and every user definition.
//!
//! Memory layout:
//!
//! ```text
//! 0x00 Base       numeric base for parsing and printing
//! 0x02 Here       next free address
//! 0x04 Latest     most recently linked entry
//! 0x06 Compiling  non-zero while a definition is being compiled
//! 0x08 CompToken  entry currently under construction
//! 0x0a Source     address of the text being interpreted
//! 0x0c SourceLen  its length
//! 0x0e Input      cursor into Source
//! 0x10 ..         80-byte input buffer
//! 0x60 Begin      first entry
//! ```
//!
//! Entry format:
//!
//! ```text
//! info cell   bits 0..=4  name length
//!             bit  5      immediate
//!             bits 6..=15 distance back to the previous entry,
//!                         all ones when the distance lives in the next cell
//! [distance]  only present for long links
//! name bytes
//! padding     up to cell alignment
//! body        execution tokens and inline literals
//! ```

pub mod storage;

use crate::{
    num::{Addr, Cell, CELL},
    word::Word,
    Error,
};

pub use storage::{MemoryStorage, Storage};

/// A linked definition, as produced by [`Dictionary::entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub addr: Addr,
    pub name: Word,
    pub immediate: bool,
    pub body: Addr,
}

pub struct Dictionary {
    storage: Box<dyn Storage>,
}

impl Dictionary {
    pub const BASE: Addr = 0;
    pub const HERE: Addr = CELL;
    pub const LATEST: Addr = CELL * 2;
    pub const COMPILING: Addr = CELL * 3;
    pub const COMP_TOKEN: Addr = CELL * 4;
    pub const SOURCE: Addr = CELL * 5;
    pub const SOURCE_LEN: Addr = CELL * 6;
    pub const INPUT: Addr = CELL * 7;
    pub const INPUT_BUFFER: Addr = CELL * 8;
    /// Size of the input buffer in bytes.
    pub const INPUT_CAPACITY: Addr = 80;
    pub const BEGIN: Addr = Self::INPUT_BUFFER + Self::INPUT_CAPACITY;

    pub const NAME_MASK: Cell = 0x1F;
    pub const MAX_NAME_LEN: usize = Self::NAME_MASK as usize;
    pub const IMMEDIATE: Cell = 1 << 5;
    pub const DISTANCE_SHIFT: u32 = 6;
    /// Distance field value marking a long link.
    pub const MAX_DISTANCE: Addr = (1 << (Cell::BITS - Self::DISTANCE_SHIFT)) - 1;

    /// Wraps `storage` without touching it. Call [`Self::initialize`] before
    /// use, unless the storage already holds an initialized image.
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// A flat in-memory dictionary of `capacity` bytes, initialized.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut dict = Self::new(MemoryStorage::new(capacity));
        dict.initialize();
        dict
    }

    /// Sets up the reserved cells for a fresh session.
    pub fn initialize(&mut self) {
        self.write(Self::BASE, 10);
        self.write(Self::HERE, Self::BEGIN as Cell);
        self.write(Self::LATEST, Self::BEGIN as Cell);
        self.write(Self::COMPILING, 0);
        self.write(Self::COMP_TOKEN, 0);
        self.write(Self::SOURCE, Self::INPUT_BUFFER as Cell);
        self.write(Self::SOURCE_LEN, 0);
        self.write(Self::INPUT, 0);
        self.write(Self::BEGIN, 0);
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    pub fn read(&self, addr: Addr) -> Cell {
        self.storage.read(addr)
    }

    pub fn write(&mut self, addr: Addr, value: Cell) {
        self.storage.write(addr, value)
    }

    pub fn read_byte(&self, addr: Addr) -> u8 {
        self.storage.read_byte(addr)
    }

    pub fn write_byte(&mut self, addr: Addr, value: u8) {
        self.storage.write_byte(addr, value)
    }

    pub fn here(&self) -> Addr {
        self.read(Self::HERE) as Addr
    }

    pub fn set_here(&mut self, addr: Addr) {
        self.write(Self::HERE, addr as Cell)
    }

    pub fn latest(&self) -> Addr {
        self.read(Self::LATEST) as Addr
    }

    pub fn set_latest(&mut self, addr: Addr) {
        self.write(Self::LATEST, addr as Cell)
    }

    pub fn base(&self) -> Cell {
        self.read(Self::BASE)
    }

    /// Moves `Here` forward by `amount` bytes and returns its old value.
    ///
    /// Requests that would run past [`Self::capacity`] or back below
    /// [`Self::BEGIN`] fail with [`Error::DictionaryFull`] and leave `Here`
    /// where it was.
    pub fn allot(&mut self, amount: Cell) -> Result<Addr, Error> {
        let old = self.here();
        let new = old as i64 + amount as i64;

        if new < Self::BEGIN as i64 || new >= self.capacity() as i64 {
            tracing::debug!(here = old, amount, "dictionary space exhausted");
            return Err(Error::DictionaryFull {
                here: old,
                requested: amount,
            });
        }

        self.set_here(new as Addr);
        Ok(old)
    }

    /// Appends one cell at `Here`.
    pub fn add(&mut self, value: Cell) -> Result<(), Error> {
        let addr = self.allot(CELL as Cell)?;
        self.write(addr, value);
        Ok(())
    }

    pub const fn aligned(addr: Addr) -> Addr {
        addr.wrapping_add(CELL - 1) & !(CELL - 1)
    }

    pub fn align_here(&mut self) -> Result<Addr, Error> {
        let here = self.here();
        let padding = Self::aligned(here).wrapping_sub(here);
        self.allot(padding as Cell)?;
        Ok(self.here())
    }

    /// Writes an entry header and name for `word` at (aligned) `Here`.
    ///
    /// The entry stays invisible to [`Self::find`] until [`Self::link`] is
    /// called with its address.
    pub fn add_definition(&mut self, word: Word) -> Result<(), Error> {
        let len = word.len() as usize;
        if len > Self::MAX_NAME_LEN {
            return Err(Error::NameTooLong(len));
        }

        let entry = self.align_here()?;
        let long = entry.wrapping_sub(self.latest()) >= Self::MAX_DISTANCE;
        let distance = if long { Self::MAX_DISTANCE } else { 0 };

        self.add(len as Cell | (distance << Self::DISTANCE_SHIFT) as Cell)?;
        if long {
            self.add(0)?;
        }

        let name = self.allot(len as Cell)?;
        for (offset, src) in word.addrs().enumerate() {
            let byte = self.read_byte(src);
            self.write_byte(name.wrapping_add(offset as Addr), byte);
        }

        self.align_here()?;
        Ok(())
    }

    /// Links the entry at `entry` into the `Latest` chain, making it
    /// visible to lookups.
    ///
    /// The entry must lie after `Latest`, at a distance its header can hold.
    /// Otherwise this fails with [`Error::BadLink`] and nothing changes.
    pub fn link(&mut self, entry: Addr) -> Result<(), Error> {
        let info = self.read(entry);
        let latest = self.latest();
        let long = Self::distance_field(info) == Self::MAX_DISTANCE;
        let distance = match entry.checked_sub(latest) {
            Some(distance) if long || distance < Self::MAX_DISTANCE => distance,
            _ => {
                tracing::debug!(entry, latest, "entry cannot be linked");
                return Err(Error::BadLink { entry, latest });
            }
        };

        let field = if long {
            self.write(entry.wrapping_add(CELL), distance as Cell);
            Self::MAX_DISTANCE
        } else {
            distance
        };

        let keep = info & (Self::NAME_MASK | Self::IMMEDIATE);
        self.write(entry, keep | (field << Self::DISTANCE_SHIFT) as Cell);
        self.set_latest(entry);
        tracing::debug!(entry, body = self.execution_token(entry), "linked definition");
        Ok(())
    }

    fn distance_field(info: Cell) -> Addr {
        (info as Addr) >> Self::DISTANCE_SHIFT
    }

    /// Byte distance from `entry` back to the entry before it.
    fn link_distance(&self, entry: Addr) -> Addr {
        match Self::distance_field(self.read(entry)) {
            Self::MAX_DISTANCE => self.read(entry.wrapping_add(CELL)) as Addr,
            distance => distance,
        }
    }

    /// The name of the entry at `entry`.
    pub fn entry_name(&self, entry: Addr) -> Word {
        let info = self.read(entry);
        let mut start = entry.wrapping_add(CELL);
        if Self::distance_field(info) == Self::MAX_DISTANCE {
            start = start.wrapping_add(CELL);
        }
        Word::from_len(start, (info & Self::NAME_MASK) as Addr)
    }

    pub fn is_immediate(&self, entry: Addr) -> bool {
        self.read(entry) & Self::IMMEDIATE != 0
    }

    /// The execution token (body address) of the entry at `entry`.
    pub fn execution_token(&self, entry: Addr) -> Addr {
        Self::aligned(self.entry_name(entry).end())
    }

    /// Whether lookups may see the entry at `entry`. Only the first entry
    /// slot needs checking: every later unlinked header sits outside the
    /// chain anyway.
    fn visible(&self, entry: Addr) -> bool {
        if self.here() == Self::BEGIN {
            return false;
        }
        let compiling = self.read(Self::COMPILING) != 0;
        !(compiling && self.read(Self::COMP_TOKEN) as Addr == entry)
    }

    /// Searches from `Latest` back to `Begin` for an entry named `word`,
    /// ignoring case. The most recent definition wins.
    pub fn find(&self, word: Word) -> Option<Addr> {
        if word.is_empty() {
            return None;
        }
        self.entries()
            .find(|entry| self.equal_words(word, entry.name))
            .map(|entry| entry.addr)
    }

    /// Linked entries, newest first.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            dict: self,
            next: Some(self.latest()),
        }
    }

    pub fn word_bytes(&self, word: Word) -> impl Iterator<Item = u8> + '_ {
        word.addrs().map(|addr| self.read_byte(addr))
    }

    /// Case-insensitive comparison of a dictionary word against host bytes.
    pub fn equal(&self, word: Word, other: &[u8]) -> bool {
        word.len() as usize == other.len()
            && self
                .word_bytes(word)
                .zip(other.iter().copied())
                .all(|(a, b)| a.eq_ignore_ascii_case(&b))
    }

    /// Case-insensitive comparison of two dictionary words.
    pub fn equal_words(&self, word: Word, other: Word) -> bool {
        word.len() == other.len()
            && self
                .word_bytes(word)
                .zip(self.word_bytes(other))
                .all(|(a, b)| a.eq_ignore_ascii_case(&b))
    }

    /// Copies `text` into the input buffer and points the input cursor at
    /// its start.
    pub fn load_input(&mut self, text: &[u8]) -> Result<(), Error> {
        if text.len() > Self::INPUT_CAPACITY as usize {
            return Err(Error::InputTooLong(text.len()));
        }

        self.write(Self::SOURCE, Self::INPUT_BUFFER as Cell);
        self.write(Self::SOURCE_LEN, text.len() as Cell);
        self.write(Self::INPUT, 0);

        let mut addr = Self::INPUT_BUFFER;
        for &byte in text {
            self.write_byte(addr, byte);
            addr += 1;
        }
        while addr < Self::BEGIN {
            self.write_byte(addr, 0);
            addr += 1;
        }
        Ok(())
    }

    fn cursor(&self) -> (Addr, Addr, Addr) {
        (
            self.read(Self::SOURCE) as Addr,
            self.read(Self::SOURCE_LEN) as Addr,
            self.read(Self::INPUT) as Addr,
        )
    }

    /// Whether anything but whitespace is left before the end of the
    /// source or a NUL byte.
    pub fn has_input(&self) -> bool {
        let (src, len, mut idx) = self.cursor();
        while idx < len {
            match self.read_byte(src.wrapping_add(idx)) {
                0 => break,
                ch if !ch.is_ascii_whitespace() => return true,
                _ => idx += 1,
            }
        }
        false
    }

    /// Takes the next whitespace-delimited word from the source and moves
    /// the cursor past it. Returns an empty word once the source is used up.
    pub fn input(&mut self) -> Word {
        let (src, len, mut idx) = self.cursor();

        let mut start = src.wrapping_add(idx);
        let mut end = start;
        while idx < len {
            let ch = self.read_byte(end);
            if ch.is_ascii_whitespace() {
                if end != start {
                    break;
                }
                start = start.wrapping_add(1);
            } else if ch == 0 {
                break;
            }
            end = end.wrapping_add(1);
            idx += 1;
        }

        self.write(Self::INPUT, idx.wrapping_add(1) as Cell);
        Word::new(start, end)
    }
}

pub struct Entries<'a> {
    dict: &'a Dictionary,
    next: Option<Addr>,
}

impl Iterator for Entries<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let addr = self.next.take()?;
            if addr < Dictionary::BEGIN {
                return None;
            }

            let distance = self.dict.link_distance(addr);
            if addr != Dictionary::BEGIN && distance != 0 {
                self.next = Some(addr.wrapping_sub(distance));
            }

            if self.dict.visible(addr) {
                return Some(Entry {
                    addr,
                    name: self.dict.entry_name(addr),
                    immediate: self.dict.is_immediate(addr),
                    body: self.dict.execution_token(addr),
                });
            }
        }
    }
}
