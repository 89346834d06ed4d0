//! Named, contiguous address-space intervals.
//!
//! A region is the half-open interval `[start, start + size)`. Zero
//! size is legal and contains no address. Regions are the unit the
//! heap manager reasons about: allocation happens inside one, and the
//! sorted region list answers "which region owns this address".

use enum_dispatch::enum_dispatch;

use crate::memory::boot::BootMemory;
use crate::memory::linear::{ImmortalMemoryRegion, LinearAllocationRegion, RootTableMemoryRegion};
use crate::word::{Address, Size};

/// The interval and identity every region exposes.
#[enum_dispatch]
pub trait MemoryRegion {
    fn start(&self) -> Address;

    fn size(&self) -> Size;

    /// Diagnostic name; shows up in logs and error messages.
    fn name(&self) -> &str;

    /// One past the last byte of the region.
    fn end(&self) -> Address {
        self.start() + self.size()
    }

    /// Whether `address` lies inside the half-open interval.
    fn contains(&self, address: Address) -> bool {
        address >= self.start() && address < self.end()
    }
}

/// Interval comparisons between possibly different region types.
pub trait MemoryRegionExt: MemoryRegion {
    /// Whether the two intervals share at least one byte. Zero-size
    /// regions overlap nothing, including themselves.
    fn overlaps(&self, other: &impl MemoryRegion) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// Whether the two regions cover exactly the same interval.
    fn same_as(&self, other: &impl MemoryRegion) -> bool {
        self.start() == other.start() && self.size() == other.size()
    }
}

impl<R: MemoryRegion + ?Sized> MemoryRegionExt for R {}

/// A plain interval with no allocation behavior. Used for the boot
/// image segments and for carving up reserved address space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedMemoryRegion {
    name: String,
    start: Address,
    size: Size,
}

impl FixedMemoryRegion {
    pub fn new(name: impl Into<String>, start: Address, size: Size) -> Self {
        FixedMemoryRegion {
            name: name.into(),
            start,
            size,
        }
    }
}

impl MemoryRegion for FixedMemoryRegion {
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

/// Any region the VM tracks, dispatched without boxing.
#[enum_dispatch(MemoryRegion)]
#[derive(Debug)]
pub enum AnyMemoryRegion {
    Fixed(FixedMemoryRegion),
    Linear(LinearAllocationRegion),
    Immortal(ImmortalMemoryRegion),
    RootTable(RootTableMemoryRegion),
    Boot(BootMemory),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(name: &str, start: usize, size: usize) -> FixedMemoryRegion {
        FixedMemoryRegion::new(name, Address(start), Size(size))
    }

    #[test]
    fn contains_is_half_open() {
        let r = region("code", 100, 100);
        assert!(!r.contains(Address(99)));
        assert!(r.contains(Address(100)));
        assert!(r.contains(Address(199)));
        assert!(!r.contains(Address(200)));
        assert_eq!(r.end(), Address(200));
    }

    #[test]
    fn zero_size_contains_nothing() {
        let r = region("empty", 100, 0);
        assert!(!r.contains(Address(100)));
        assert!(!r.overlaps(&r.clone()));
    }

    #[test]
    fn overlap_cases() {
        let a = region("a", 0, 100);
        let b = region("b", 100, 100);
        let c = region("c", 50, 100);
        assert!(!a.overlaps(&b), "adjacent regions do not overlap");
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
        assert!(a.overlaps(&a.clone()));
    }

    #[test]
    fn same_as_is_interval_equality() {
        let a = region("a", 0, 100);
        let also_a = region("other name", 0, 100);
        let b = region("b", 0, 50);
        assert!(a.same_as(&also_a));
        assert!(!a.same_as(&b));
    }

    #[test]
    fn dispatches_through_the_enum() {
        let r: AnyMemoryRegion = region("boot", 0x1000, 0x100).into();
        assert_eq!(r.start(), Address(0x1000));
        assert_eq!(r.name(), "boot");
        assert!(r.contains(Address(0x10ff)));
    }
}
