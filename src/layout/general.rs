//! Category-independent header access: hub and misc words, lengths,
//! and the forwarding protocol used by copying collectors.
//!
//! The hub word does double duty. An untagged value is the grip of the
//! object's [`Hub`]; a value with the low bit set is a forwarding
//! pointer to the object's new origin. Hubs are word aligned, so the
//! low bit is always free for the tag. All hub-word and misc-word
//! access goes through atomics because the collector and the monitor
//! subsystem race mutators on these words.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::actor::Hub;
use crate::layout::header::{Category, HUB_OFFSET, LENGTH_OFFSET, MISC_OFFSET};
use crate::layout::scheme::LayoutScheme;
use crate::word::{Address, Grip, Size, Word};

/// Low-bit tag marking a hub word as a forwarding pointer.
const FORWARD_TAG: usize = 1;

/// Displacement from a cell's start to its origin. Identical for every
/// category under this scheme, which keeps cell/origin conversion free
/// of hub lookups.
pub const fn origin_displacement(_category: Category) -> Size {
    Size::ZERO
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneralLayout;

impl GeneralLayout {
    pub const fn new() -> Self {
        GeneralLayout
    }

    /// The origin of the cell starting at `cell`.
    #[inline]
    pub const fn cell_to_origin(&self, cell: Address) -> Address {
        cell
    }

    /// The start of the cell whose origin is `origin`.
    #[inline]
    pub const fn origin_to_cell(&self, origin: Address) -> Address {
        origin
    }

    #[inline]
    unsafe fn header_atomic(&self, origin: Address, offset: usize) -> &AtomicUsize {
        debug_assert!(origin.is_word_aligned());
        unsafe { AtomicUsize::from_ptr((origin + offset).as_mut_ptr()) }
    }

    /// Reads the raw hub word, tag bit included.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    #[inline]
    pub unsafe fn read_hub_word(&self, origin: Address) -> Word {
        Word(unsafe { self.header_atomic(origin, HUB_OFFSET) }.load(Ordering::Acquire))
    }

    /// Reads the hub grip of a non-forwarded object.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    pub unsafe fn read_hub_grip(&self, origin: Address) -> Grip {
        let word = unsafe { self.read_hub_word(origin) }.as_usize();
        if word == 0 {
            crate::fatal!("zero hub word at origin {origin}");
        }
        if word & FORWARD_TAG != 0 {
            crate::fatal!("hub read on forwarded cell at origin {origin}");
        }
        Grip(word)
    }

    /// Installs `hub` as the hub word. Used when planting a fresh
    /// object.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a cell large enough for its
    /// header, and `hub` must outlive the object.
    pub unsafe fn write_hub(&self, origin: Address, hub: &Hub) {
        let grip = hub.grip();
        debug_assert_eq!(grip.to_origin().as_usize() & FORWARD_TAG, 0);
        unsafe { self.header_atomic(origin, HUB_OFFSET) }
            .store(grip.to_origin().as_usize(), Ordering::Release);
    }

    /// Recovers the hub of a non-forwarded object.
    ///
    /// # Safety
    ///
    /// As [`read_hub_grip`](Self::read_hub_grip), and the hub behind
    /// the grip must still be alive.
    pub unsafe fn read_hub<'a>(&self, origin: Address) -> &'a Hub {
        unsafe { Hub::from_grip(self.read_hub_grip(origin)) }
    }

    /// The category of the object at `origin`, or `None` when the hub
    /// word is zero or holds a forwarding pointer. The GC uses the
    /// `None` cases; everything else treats them as corruption and
    /// goes through [`read_hub`](Self::read_hub).
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    pub unsafe fn category(&self, origin: Address) -> Option<Category> {
        let word = unsafe { self.read_hub_word(origin) }.as_usize();
        if word == 0 || word & FORWARD_TAG != 0 {
            return None;
        }
        Some(unsafe { Hub::from_grip(Grip(word)) }.category)
    }

    /// # Safety
    ///
    /// As [`category`](Self::category).
    #[inline]
    pub unsafe fn is_tuple(&self, origin: Address) -> bool {
        (unsafe { self.category(origin) }) == Some(Category::Tuple)
    }

    /// # Safety
    ///
    /// As [`category`](Self::category).
    #[inline]
    pub unsafe fn is_array(&self, origin: Address) -> bool {
        (unsafe { self.category(origin) }) == Some(Category::Array)
    }

    /// # Safety
    ///
    /// As [`category`](Self::category).
    #[inline]
    pub unsafe fn is_hybrid(&self, origin: Address) -> bool {
        (unsafe { self.category(origin) }) == Some(Category::Hybrid)
    }

    /// Total cell size of the object at `origin`, derived from its hub
    /// and, for arrays and hybrids, its length word.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live, non-forwarded cell.
    pub unsafe fn size(&self, scheme: &LayoutScheme, origin: Address) -> Size {
        let hub = unsafe { self.read_hub(origin) };
        match hub.category {
            Category::Tuple => hub.tuple_size,
            Category::Array => {
                let Some(kind) = hub.element_kind else {
                    crate::fatal!("array hub {} has no element kind", hub.name);
                };
                let length = unsafe { self.read_length(origin) };
                scheme.array_layout(kind).array_size(length)
            }
            Category::Hybrid => {
                let length = unsafe { self.read_length(origin) };
                scheme.hybrid.array_size(length)
            }
        }
    }

    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    #[inline]
    pub unsafe fn read_misc(&self, origin: Address) -> Word {
        Word(unsafe { self.header_atomic(origin, MISC_OFFSET) }.load(Ordering::Acquire))
    }

    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    #[inline]
    pub unsafe fn write_misc(&self, origin: Address, value: Word) {
        unsafe { self.header_atomic(origin, MISC_OFFSET) }
            .store(value.as_usize(), Ordering::Release);
    }

    /// Atomically replaces the misc word if it still holds `expected`.
    /// Returns the witness value, which equals `expected` exactly when
    /// the swap took effect.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    pub unsafe fn compare_and_swap_misc(
        &self,
        origin: Address,
        expected: Word,
        new: Word,
    ) -> Word {
        let atomic = unsafe { self.header_atomic(origin, MISC_OFFSET) };
        match atomic.compare_exchange(
            expected.as_usize(),
            new.as_usize(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(witness) | Err(witness) => Word(witness),
        }
    }

    /// # Safety
    ///
    /// `origin` must be the origin of a live array or hybrid cell.
    #[inline]
    pub unsafe fn read_length(&self, origin: Address) -> usize {
        unsafe { (origin + LENGTH_OFFSET).as_ptr::<usize>().read() }
    }

    /// # Safety
    ///
    /// `origin` must be the origin of an array or hybrid cell whose
    /// payload accommodates `length` elements.
    #[inline]
    pub unsafe fn write_length(&self, origin: Address, length: usize) {
        unsafe { (origin + LENGTH_OFFSET).as_mut_ptr::<usize>().write(length) };
    }

    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    #[inline]
    pub unsafe fn is_forwarded(&self, origin: Address) -> bool {
        unsafe { self.read_hub_word(origin) }.as_usize() & FORWARD_TAG != 0
    }

    /// The forward grip installed at `origin`, or [`Grip::ZERO`] when
    /// the object has not been forwarded.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell.
    pub unsafe fn read_forward_grip(&self, origin: Address) -> Grip {
        let word = unsafe { self.read_hub_word(origin) }.as_usize();
        if word & FORWARD_TAG != 0 {
            Grip(word & !FORWARD_TAG)
        } else {
            Grip::ZERO
        }
    }

    /// Unconditionally installs `grip` as the forwarding pointer.
    /// Only safe while mutators are stopped; racing installers use
    /// [`compare_and_swap_forward_grip`](Self::compare_and_swap_forward_grip).
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell and `grip` a
    /// non-zero, word-aligned origin.
    pub unsafe fn write_forward_grip(&self, origin: Address, grip: Grip) {
        debug_assert!(!grip.is_zero());
        debug_assert!(grip.to_origin().is_word_aligned());
        unsafe { self.header_atomic(origin, HUB_OFFSET) }
            .store(grip.0 | FORWARD_TAG, Ordering::Release);
    }

    /// Races to install `new` as the forwarding pointer of the object
    /// at `origin`. `expected` is [`Grip::ZERO`] when the caller
    /// expects the object not to be forwarded yet.
    ///
    /// Returns the grip that ended up installed: `new` for the winner,
    /// the winner's grip for every losing racer.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live cell and `new` a
    /// non-zero, word-aligned origin.
    pub unsafe fn compare_and_swap_forward_grip(
        &self,
        origin: Address,
        expected: Grip,
        new: Grip,
    ) -> Grip {
        debug_assert!(!new.is_zero());
        debug_assert!(new.to_origin().is_word_aligned());
        let atomic = unsafe { self.header_atomic(origin, HUB_OFFSET) };
        let new_word = new.0 | FORWARD_TAG;
        loop {
            let expected_word = if expected.is_zero() {
                let current = atomic.load(Ordering::Acquire);
                if current & FORWARD_TAG != 0 {
                    // Lost before we even tried.
                    return Grip(current & !FORWARD_TAG);
                }
                current
            } else {
                expected.0 | FORWARD_TAG
            };
            match atomic.compare_exchange(
                expected_word,
                new_word,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return new,
                Err(witness) => {
                    if witness & FORWARD_TAG != 0 {
                        return Grip(witness & !FORWARD_TAG);
                    }
                    // The hub word changed underneath an expected-zero
                    // race without being forwarded; re-read and retry.
                    if !expected.is_zero() {
                        return Grip::ZERO;
                    }
                }
            }
        }
    }

    /// Follows a forwarding pointer of length at most one: the final
    /// location of the object `grip` refers to.
    ///
    /// # Safety
    ///
    /// A non-zero `grip` must refer to a live cell.
    pub unsafe fn forwarded(&self, grip: Grip) -> Grip {
        if grip.is_zero() {
            return grip;
        }
        let forward = unsafe { self.read_forward_grip(grip.to_origin()) };
        if forward.is_zero() {
            grip
        } else {
            forward
        }
    }
}
