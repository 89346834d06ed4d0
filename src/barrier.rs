//! Memory-barrier vocabulary shared by the compiler and runtime.
//!
//! A barrier element orders one class of earlier accesses against one
//! class of later ones. The compiler asks for the ordering a piece of
//! code needs as a [`BarrierSet`]; the target's [`MemoryModel`] says
//! which elements the hardware already guarantees, and
//! [`MemoryModel::required_fences`] is the difference, the fences that
//! actually need emitting.

use std::fmt;
use std::ops::BitOr;

/// One elementary ordering guarantee.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemoryBarrier {
    /// Earlier loads complete before later loads.
    LoadLoad,
    /// Earlier loads complete before later stores.
    LoadStore,
    /// Earlier stores complete before later loads.
    StoreLoad,
    /// Earlier stores complete before later stores.
    StoreStore,
}

impl MemoryBarrier {
    pub const ALL: [MemoryBarrier; 4] = [
        MemoryBarrier::LoadLoad,
        MemoryBarrier::LoadStore,
        MemoryBarrier::StoreLoad,
        MemoryBarrier::StoreStore,
    ];

    const fn bit(self) -> u8 {
        match self {
            MemoryBarrier::LoadLoad => 1 << 0,
            MemoryBarrier::LoadStore => 1 << 1,
            MemoryBarrier::StoreLoad => 1 << 2,
            MemoryBarrier::StoreStore => 1 << 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            MemoryBarrier::LoadLoad => "LOAD_LOAD",
            MemoryBarrier::LoadStore => "LOAD_STORE",
            MemoryBarrier::StoreLoad => "STORE_LOAD",
            MemoryBarrier::StoreStore => "STORE_STORE",
        }
    }
}

/// A set of barrier elements, packed into one byte.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct BarrierSet(u8);

impl BarrierSet {
    pub const EMPTY: Self = BarrierSet(0);

    pub const fn of(barrier: MemoryBarrier) -> Self {
        BarrierSet(barrier.bit())
    }

    /// Loads ordered against later loads.
    pub const fn load_load() -> Self {
        Self::of(MemoryBarrier::LoadLoad)
    }

    /// Stores ordered against later stores.
    pub const fn store_store() -> Self {
        Self::of(MemoryBarrier::StoreStore)
    }

    /// Any memory operation ordered against later stores.
    pub const fn memop_store() -> Self {
        BarrierSet(MemoryBarrier::LoadStore.bit() | MemoryBarrier::StoreStore.bit())
    }

    /// Every element; a full fence.
    pub const fn all() -> Self {
        BarrierSet(
            MemoryBarrier::LoadLoad.bit()
                | MemoryBarrier::LoadStore.bit()
                | MemoryBarrier::StoreLoad.bit()
                | MemoryBarrier::StoreStore.bit(),
        )
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, barrier: MemoryBarrier) -> bool {
        self.0 & barrier.bit() != 0
    }

    pub const fn contains_all(self, other: BarrierSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: BarrierSet) -> Self {
        BarrierSet(self.0 | other.0)
    }

    /// The elements of `self` not present in `other`.
    pub const fn minus(self, other: BarrierSet) -> Self {
        BarrierSet(self.0 & !other.0)
    }
}

impl BitOr for BarrierSet {
    type Output = BarrierSet;

    fn bitor(self, rhs: BarrierSet) -> BarrierSet {
        self.union(rhs)
    }
}

impl fmt::Debug for BarrierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("{}");
        }
        let mut first = true;
        f.write_str("{")?;
        for barrier in MemoryBarrier::ALL {
            if self.contains(barrier) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(barrier.name())?;
                first = false;
            }
        }
        f.write_str("}")
    }
}

/// The ordering model of a hardware target.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MemoryModel {
    SequentialConsistency,
    TotalStoreOrder,
    PartialStoreOrder,
    RelaxedMemoryOrder,
}

impl MemoryModel {
    /// The barrier elements the model guarantees without any explicit
    /// fence instruction.
    pub const fn implied_barriers(self) -> BarrierSet {
        match self {
            MemoryModel::SequentialConsistency => BarrierSet::all(),
            // Stores may pass later loads; everything else is ordered.
            MemoryModel::TotalStoreOrder => {
                BarrierSet::all().minus(BarrierSet::of(MemoryBarrier::StoreLoad))
            }
            // Only loads stay ordered against later accesses.
            MemoryModel::PartialStoreOrder => BarrierSet::load_load()
                .union(BarrierSet::of(MemoryBarrier::LoadStore)),
            MemoryModel::RelaxedMemoryOrder => BarrierSet::EMPTY,
        }
    }

    /// The fences that must actually be emitted to obtain `requested`
    /// ordering on this model.
    pub const fn required_fences(self, requested: BarrierSet) -> BarrierSet {
        requested.minus(self.implied_barriers())
    }
}
