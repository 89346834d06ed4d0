//! The sorted list of disjoint memory regions, keyed by start address.
//!
//! The list answers `find(address)` in logarithmic time, which is on
//! the hot path of every "is this a heap pointer" check. Its one
//! structural invariant is that members are sorted and pairwise
//! non-overlapping; [`add`](SortedMemoryRegionList::add) aborts the VM
//! rather than admit an overlap, since an overlapping region table
//! means two subsystems believe they own the same memory.

use crate::memory::region::{MemoryRegion, MemoryRegionExt};
use crate::word::Address;

const INITIAL_CAPACITY: usize = 10;

#[derive(Debug)]
pub struct SortedMemoryRegionList<R: MemoryRegion> {
    regions: Vec<R>,
}

impl<R: MemoryRegion> Default for SortedMemoryRegionList<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: MemoryRegion> SortedMemoryRegionList<R> {
    pub fn new() -> Self {
        SortedMemoryRegionList {
            regions: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// The region at `index` in start-address order.
    pub fn get(&self, index: usize) -> Option<&R> {
        self.regions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.regions.iter()
    }

    /// Inserts `region`, keeping the list sorted. Re-adding a region
    /// covering an identical interval is a no-op; a genuine overlap is
    /// fatal. Returns the index of the resident region.
    pub fn add(&mut self, region: R) -> usize {
        let index = self.regions.partition_point(|r| r.start() < region.start());

        if let Some(next) = self.regions.get(index) {
            if next.same_as(&region) {
                return index;
            }
            if next.overlaps(&region) {
                crate::fatal!(
                    "memory region {} [{}, {}) overlaps {} [{}, {})",
                    region.name(),
                    region.start(),
                    region.end(),
                    next.name(),
                    next.start(),
                    next.end()
                );
            }
        }
        if index > 0 {
            let previous = &self.regions[index - 1];
            if previous.overlaps(&region) {
                crate::fatal!(
                    "memory region {} [{}, {}) overlaps {} [{}, {})",
                    region.name(),
                    region.start(),
                    region.end(),
                    previous.name(),
                    previous.start(),
                    previous.end()
                );
            }
        }

        self.grow_if_full();
        self.regions.insert(index, region);
        index
    }

    /// The member containing `address`, if any.
    pub fn find(&self, address: Address) -> Option<&R> {
        let upper = self.regions.partition_point(|r| r.start() <= address);
        if upper == 0 {
            return None;
        }
        let candidate = &self.regions[upper - 1];
        candidate.contains(address).then_some(candidate)
    }

    // Growth is by halves so repeated single insertions stay amortized
    // constant without doubling a large table.
    fn grow_if_full(&mut self) {
        let capacity = self.regions.capacity();
        if self.regions.len() < capacity {
            return;
        }
        let target = std::cmp::max(INITIAL_CAPACITY, capacity + capacity / 2);
        self.regions.reserve_exact(target - self.regions.len());
    }
}

impl<'a, R: MemoryRegion> IntoIterator for &'a SortedMemoryRegionList<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
