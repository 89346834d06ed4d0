//! Object representation and memory regions for a managed-runtime
//! heap.
//!
//! The crate has two halves. The `layout` half defines how objects
//! are arranged inside their cells: header words, field placement,
//! array elements, and the forwarding protocol a copying collector
//! races on. The `memory` half defines the regions those cells live
//! in: bump-allocated spaces, the immortal space, the boot image, the
//! root table, and the sorted region list that maps an address back to
//! its owner. `barrier` carries the memory-ordering vocabulary shared
//! with a compiler backend.
//!
//! Nothing here is a collector or a class loader; those are
//! collaborators that consume this crate's types.

pub mod actor;
pub mod barrier;
pub mod error;
pub mod layout;
pub mod memory;
pub mod word;

pub use actor::{FieldActor, Hub};
pub use barrier::{BarrierSet, MemoryBarrier, MemoryModel};
pub use error::{LayoutError, MemoryError};
pub use layout::{Category, ElementKind, HeaderField, LayoutScheme};
pub use memory::{MemoryRegion, SortedMemoryRegionList};
pub use word::{Address, Grip, Size, Word};
