//! Class metadata consumed by the layout subsystem.
//!
//! The classfile loader (an external collaborator) hands this layer an
//! ordered list of [`FieldActor`]s per class and keeps one [`Hub`] per
//! class alive for the lifetime of the VM. Nothing here parses class
//! files; these are plain input records.

use crate::layout::header::Category;
use crate::layout::kind::ElementKind;
use crate::word::{Address, Grip, Size};

/// A field descriptor, as provided by the class-metadata collaborator.
///
/// `offset` starts out unassigned; `layout_fields` fills it in with an
/// origin-relative byte offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldActor {
    pub name: String,
    pub kind: ElementKind,
    /// Origin-relative byte offset, assigned by the layout subsystem.
    pub offset: Option<usize>,
}

impl FieldActor {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        FieldActor {
            name: name.into(),
            kind,
            offset: None,
        }
    }
}

/// Per-class metadata referenced from every object header.
///
/// A hub determines the category and layout of its instances. Hubs are
/// constructed once (at class creation or boot-image build) and must
/// stay at a stable, word-aligned address for the lifetime of the VM:
/// the header stores their raw address, and the forwarding protocol
/// claims the low bit of that word as a tag.
#[derive(Debug)]
pub struct Hub {
    pub name: String,
    pub category: Category,
    /// Element kind of array instances; `Word` for hybrids, `None` for
    /// tuples.
    pub element_kind: Option<ElementKind>,
    /// Total size of a tuple instance (header plus fields), or of the
    /// field-bearing prefix of a hybrid. Zero for plain arrays.
    pub tuple_size: Size,
    /// Origin-relative byte offsets of reference-kind fields, used by
    /// the collector to visit a tuple's reference cells.
    pub reference_offsets: Vec<usize>,
}

impl Hub {
    pub fn tuple(name: impl Into<String>, tuple_size: Size, reference_offsets: Vec<usize>) -> Self {
        debug_assert!(tuple_size.is_word_aligned());
        Hub {
            name: name.into(),
            category: Category::Tuple,
            element_kind: None,
            tuple_size,
            reference_offsets,
        }
    }

    pub fn array(name: impl Into<String>, element_kind: ElementKind) -> Self {
        Hub {
            name: name.into(),
            category: Category::Array,
            element_kind: Some(element_kind),
            tuple_size: Size::ZERO,
            reference_offsets: Vec::new(),
        }
    }

    pub fn hybrid(
        name: impl Into<String>,
        tuple_size: Size,
        reference_offsets: Vec<usize>,
    ) -> Self {
        debug_assert!(tuple_size.is_word_aligned());
        Hub {
            name: name.into(),
            category: Category::Hybrid,
            element_kind: Some(ElementKind::Word),
            tuple_size,
            reference_offsets,
        }
    }

    /// The grip value written into an object's hub word.
    pub fn grip(&self) -> Grip {
        let address = Address::from_ptr(self as *const Hub);
        debug_assert!(address.is_word_aligned());
        Grip::from_origin(address)
    }

    /// Recovers the hub behind a grip previously produced by
    /// [`Hub::grip`].
    ///
    /// # Safety
    ///
    /// `grip` must have been produced by `Hub::grip` on a hub that is
    /// still alive.
    pub unsafe fn from_grip<'a>(grip: Grip) -> &'a Hub {
        debug_assert!(!grip.is_zero());
        unsafe { &*grip.to_origin().as_ptr::<Hub>() }
    }
}
