//! The boot image's in-process memory.
//!
//! The boot region's contents exist before the VM knows where they
//! will live, so its address is computed on first use and cached; all
//! later queries see the same value. Backing storage is word-typed to
//! guarantee word alignment of the region start.

use std::sync::OnceLock;

use crate::memory::region::MemoryRegion;
use crate::word::{Address, Size, WORD_SIZE};

#[derive(Debug)]
pub struct BootMemory {
    name: String,
    words: Box<[usize]>,
    address: OnceLock<Address>,
}

impl BootMemory {
    /// A zero-filled boot region of `size` bytes (rounded up to a word
    /// multiple).
    pub fn new(name: impl Into<String>, size: Size) -> Self {
        BootMemory {
            name: name.into(),
            words: vec![0usize; size.word_aligned().in_words()].into_boxed_slice(),
            address: OnceLock::new(),
        }
    }

    /// A boot region initialized from image words.
    pub fn from_words(name: impl Into<String>, words: Box<[usize]>) -> Self {
        BootMemory {
            name: name.into(),
            words,
            address: OnceLock::new(),
        }
    }

    /// Start address of the region; computed lazily and stable for the
    /// region's lifetime.
    pub fn address(&self) -> Address {
        *self
            .address
            .get_or_init(|| Address::from_ptr(self.words.as_ptr()))
    }
}

impl MemoryRegion for BootMemory {
    fn start(&self) -> Address {
        self.address()
    }

    fn size(&self) -> Size {
        Size(self.words.len() * WORD_SIZE)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
