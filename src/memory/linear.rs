//! Allocating regions: the lock-free bump region, the immortal region
//! that plants object headers under a lock, and the root-table region.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::actor::Hub;
use crate::error::MemoryError;
use crate::layout::scheme::LayoutScheme;
use crate::memory::region::MemoryRegion;
use crate::word::{Address, Size, Word, WORD_SIZE};

/// A region handing out word-aligned cells by advancing an atomic
/// mark. Allocation is lock-free; a failed attempt leaves the mark
/// untouched.
#[derive(Debug)]
pub struct LinearAllocationRegion {
    name: String,
    start: Address,
    size: Size,
    /// Absolute address of the next free byte; always word aligned and
    /// within `[start, end]`.
    mark: AtomicUsize,
}

impl LinearAllocationRegion {
    pub fn new(name: impl Into<String>, start: Address, size: Size) -> Self {
        debug_assert!(start.is_word_aligned());
        debug_assert!(size.is_word_aligned());
        LinearAllocationRegion {
            name: name.into(),
            start,
            size,
            mark: AtomicUsize::new(start.as_usize()),
        }
    }

    /// Reserves `size` bytes (rounded up to a word multiple) and
    /// returns the cell's start address.
    pub fn allocate(&self, size: Size) -> Result<Address, MemoryError> {
        let size = size.word_aligned();
        let end = self.end().as_usize();
        let mut mark = self.mark.load(Ordering::Relaxed);
        loop {
            let available = end - mark;
            if size.as_usize() > available {
                return Err(MemoryError::OutOfMemory {
                    region: self.name.clone(),
                    requested: size.as_usize(),
                    available,
                });
            }
            match self.mark.compare_exchange_weak(
                mark,
                mark + size.as_usize(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    trace!(region = %self.name, cell = %Address(mark), size = %size, "allocated");
                    return Ok(Address(mark));
                }
                Err(current) => mark = current,
            }
        }
    }

    /// Current allocation mark.
    pub fn mark(&self) -> Address {
        Address(self.mark.load(Ordering::Acquire))
    }

    /// Bytes handed out so far.
    pub fn used_memory(&self) -> Size {
        self.mark() - self.start
    }

    /// Bytes still available.
    pub fn available(&self) -> Size {
        self.end() - self.mark()
    }
}

impl MemoryRegion for LinearAllocationRegion {
    fn start(&self) -> Address {
        self.start
    }

    fn size(&self) -> Size {
        self.size
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// The region for objects that live for the whole VM run: VM-internal
/// tuples, hubs, interned metadata.
///
/// Unlike the plain bump region, allocation here also writes the
/// object header, and both steps happen under one lock so a heap
/// walker scanning `[start, mark)` under the same lock never sees a
/// reserved cell without a header. Exhaustion is unrecoverable: the
/// callers have no fallback address space.
#[derive(Debug)]
pub struct ImmortalMemoryRegion {
    region: LinearAllocationRegion,
    lock: Mutex<()>,
}

impl ImmortalMemoryRegion {
    pub fn new(name: impl Into<String>, start: Address, size: Size) -> Self {
        ImmortalMemoryRegion {
            region: LinearAllocationRegion::new(name, start, size),
            lock: Mutex::new(()),
        }
    }

    fn reserve(&self, size: Size) -> Address {
        match self.region.allocate(size) {
            Ok(origin) => origin,
            Err(err) => crate::fatal!("immortal memory exhausted: {err}"),
        }
    }

    /// Allocates and plants a tuple of `hub`'s class. The returned
    /// origin has its hub and misc words initialized; field contents
    /// are zero.
    pub fn allocate_tuple(&self, scheme: &LayoutScheme, hub: &Hub) -> Address {
        let _guard = self.lock.lock();
        let origin = self.reserve(hub.tuple_size);
        unsafe {
            scheme.general.write_hub(origin, hub);
            scheme.general.write_misc(origin, Word::ZERO);
        }
        origin
    }

    /// Allocates and plants an array of `length` elements of `hub`'s
    /// element kind.
    pub fn allocate_array(&self, scheme: &LayoutScheme, hub: &Hub, length: usize) -> Address {
        let Some(kind) = hub.element_kind else {
            crate::fatal!("array allocation with tuple hub {}", hub.name);
        };
        let size = scheme.array_layout(kind).array_size(length);
        let _guard = self.lock.lock();
        let origin = self.reserve(size);
        unsafe {
            scheme.general.write_hub(origin, hub);
            scheme.general.write_misc(origin, Word::ZERO);
            scheme.general.write_length(origin, length);
        }
        origin
    }

    /// Walks the planted objects in allocation order under the
    /// allocation lock.
    pub fn visit_cells(&self, scheme: &LayoutScheme, mut visit: impl FnMut(Address)) {
        let _guard = self.lock.lock();
        let mut cell = self.region.start();
        let mark = self.region.mark();
        while cell < mark {
            visit(cell);
            // Planted under the same lock, so the header is present.
            cell = cell + unsafe { scheme.general.size(scheme, cell) };
        }
    }

    pub fn used_memory(&self) -> Size {
        self.region.used_memory()
    }

    pub fn available(&self) -> Size {
        self.region.available()
    }
}

impl MemoryRegion for ImmortalMemoryRegion {
    fn start(&self) -> Address {
        self.region.start()
    }

    fn size(&self) -> Size {
        MemoryRegion::size(&self.region)
    }

    fn name(&self) -> &str {
        self.region.name()
    }
}

/// The fixed table of word slots holding external GC roots. The GC
/// refreshes `words_used` once per cycle and scans only that prefix.
#[derive(Debug)]
pub struct RootTableMemoryRegion {
    name: String,
    start: Address,
    size: Size,
    words_used: AtomicUsize,
}

impl RootTableMemoryRegion {
    pub fn new(name: impl Into<String>, start: Address, size: Size) -> Self {
        debug_assert!(size.is_word_aligned());
        RootTableMemoryRegion {
            name: name.into(),
            start,
            size,
            words_used: AtomicUsize::new(0),
        }
    }

    /// Capacity of the table in word slots.
    pub fn word_count(&self) -> usize {
        self.size.in_words()
    }

    pub fn words_used(&self) -> usize {
        self.words_used.load(Ordering::Acquire)
    }

    pub fn set_words_used(&self, words: usize) {
        debug_assert!(words <= self.word_count());
        self.words_used.store(words, Ordering::Release);
    }

    /// Address of slot `index`.
    pub fn slot_address(&self, index: usize) -> Address {
        debug_assert!(index < self.word_count());
        self.start + index * WORD_SIZE
    }
}

impl MemoryRegion for RootTableMemoryRegion {
    fn start(&self) -> Address {
        self.start
    }

    fn size(&self) -> Size {
        self.size
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::header::Category;
    use crate::layout::kind::ElementKind;
    use crate::memory::region::MemoryRegion;

    fn backing(words: usize) -> Vec<usize> {
        vec![0usize; words]
    }

    #[test]
    fn bump_allocation_advances_the_mark() {
        let memory = backing(8);
        let start = Address::from_ptr(memory.as_ptr());
        let region = LinearAllocationRegion::new("test", start, Size(64));

        let first = region.allocate(Size(40)).unwrap();
        assert_eq!(first, start);
        assert_eq!(region.used_memory(), Size(40));
        assert_eq!(region.available(), Size(24));

        // 30 rounds up to 32, which no longer fits.
        let err = region.allocate(Size(30)).unwrap_err();
        assert!(matches!(err, MemoryError::OutOfMemory { available: 24, .. }));
        assert_eq!(region.used_memory(), Size(40), "failed allocation moves nothing");

        let second = region.allocate(Size(24)).unwrap();
        assert_eq!(second, start + Size(40));
        assert_eq!(region.available(), Size::ZERO);
    }

    #[test]
    fn cells_are_word_aligned_and_disjoint() {
        let memory = backing(32);
        let start = Address::from_ptr(memory.as_ptr());
        let region = LinearAllocationRegion::new("test", start, Size::words(32));

        let mut cells = Vec::new();
        for request in [1, 7, 8, 9, 16] {
            let cell = region.allocate(Size(request)).unwrap();
            assert!(cell.is_word_aligned());
            cells.push((cell, Size(request).word_aligned()));
        }
        for pair in cells.windows(2) {
            assert_eq!(pair[0].0 + pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn concurrent_allocations_never_overlap() {
        let memory = backing(256);
        let start = Address::from_ptr(memory.as_ptr());
        let region = LinearAllocationRegion::new("race", start, Size::words(256));

        let mut all = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        (0..16)
                            .map(|_| region.allocate(Size::words(2)).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 64);
        assert_eq!(region.used_memory(), Size::words(128));
    }

    #[test]
    fn immortal_allocations_come_out_planted() {
        let scheme = LayoutScheme::new();
        let memory = backing(64);
        let start = Address::from_ptr(memory.as_ptr());
        let immortal = ImmortalMemoryRegion::new("immortal", start, Size::words(64));

        let tuple_hub = Hub::tuple("Monitor", Size::words(4), vec![]);
        let array_hub = Hub::array("char[]", ElementKind::Char);

        let tuple = immortal.allocate_tuple(&scheme, &tuple_hub);
        let array = immortal.allocate_array(&scheme, &array_hub, 10);
        unsafe {
            assert_eq!(scheme.general.category(tuple), Some(Category::Tuple));
            assert_eq!(scheme.general.read_misc(tuple), Word::ZERO);
            assert_eq!(scheme.general.size(&scheme, tuple), Size::words(4));

            assert_eq!(scheme.general.category(array), Some(Category::Array));
            assert_eq!(scheme.general.read_length(array), 10);
        }

        let mut walked = Vec::new();
        immortal.visit_cells(&scheme, |cell| walked.push(cell));
        assert_eq!(walked, vec![tuple, array]);
    }

    #[test]
    fn root_table_tracks_its_used_prefix() {
        let memory = backing(16);
        let start = Address::from_ptr(memory.as_ptr());
        let roots = RootTableMemoryRegion::new("roots", start, Size::words(16));

        assert_eq!(roots.word_count(), 16);
        assert_eq!(roots.words_used(), 0);
        roots.set_words_used(5);
        assert_eq!(roots.words_used(), 5);
        assert_eq!(roots.slot_address(0), start);
        assert_eq!(roots.slot_address(3), start + 3 * WORD_SIZE);
        assert!(roots.contains(roots.slot_address(15)));
    }
}
