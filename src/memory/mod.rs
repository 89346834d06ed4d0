//! Memory regions: the intervals the VM carves its address space
//! into, the allocators that hand out cells inside them, and the OS
//! mapping layer underneath.

pub mod boot;
pub mod linear;
pub mod os;
pub mod region;
pub mod sorted;

pub use boot::BootMemory;
pub use linear::{ImmortalMemoryRegion, LinearAllocationRegion, RootTableMemoryRegion};
pub use os::VirtualMemory;
pub use region::{AnyMemoryRegion, FixedMemoryRegion, MemoryRegion, MemoryRegionExt};
pub use sorted::SortedMemoryRegionList;
