//! The layout scheme: one value of every specific layout plus the
//! general layout, built once at VM configuration time and threaded by
//! reference to whoever needs it. There is deliberately no global
//! instance.

use enum_dispatch::enum_dispatch;

use crate::layout::array::ArrayLayout;
use crate::layout::general::GeneralLayout;
use crate::layout::header::{Category, ARRAY_HEADER_SIZE, TUPLE_HEADER_SIZE};
use crate::layout::hybrid::HybridLayout;
use crate::layout::kind::ElementKind;
use crate::layout::tuple::TupleLayout;
use crate::word::Size;

/// Behavior shared by every specific (per-category) layout.
#[enum_dispatch]
pub trait CellLayout {
    /// The category of cell this layout describes.
    fn category(&self) -> Category;

    /// Size of the header this layout puts in front of the payload.
    fn header_size(&self) -> Size;

    /// Whether cells of this layout carry a length word.
    fn has_length(&self) -> bool {
        self.category() != Category::Tuple
    }
}

impl CellLayout for TupleLayout {
    fn category(&self) -> Category {
        Category::Tuple
    }

    fn header_size(&self) -> Size {
        TUPLE_HEADER_SIZE
    }
}

impl CellLayout for ArrayLayout {
    fn category(&self) -> Category {
        Category::Array
    }

    fn header_size(&self) -> Size {
        ARRAY_HEADER_SIZE
    }
}

impl CellLayout for HybridLayout {
    fn category(&self) -> Category {
        Category::Hybrid
    }

    fn header_size(&self) -> Size {
        ARRAY_HEADER_SIZE
    }
}

/// A specific layout, dispatched without dynamic allocation. The set
/// is closed: every cell in the heap is a tuple, an array, or a
/// hybrid.
#[enum_dispatch(CellLayout)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpecificLayout {
    Tuple(TupleLayout),
    Array(ArrayLayout),
    Hybrid(HybridLayout),
}

/// The complete layout configuration of a running VM.
#[derive(Debug)]
pub struct LayoutScheme {
    pub general: GeneralLayout,
    pub tuple: TupleLayout,
    pub hybrid: HybridLayout,
    arrays: [ArrayLayout; ElementKind::ALL.len()],
}

impl Default for LayoutScheme {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutScheme {
    pub fn new() -> Self {
        let mut arrays = [ArrayLayout::new(ElementKind::Boolean); ElementKind::ALL.len()];
        for (slot, kind) in arrays.iter_mut().zip(ElementKind::ALL) {
            *slot = ArrayLayout::new(kind);
        }
        LayoutScheme {
            general: GeneralLayout::new(),
            tuple: TupleLayout::new(),
            hybrid: HybridLayout::new(),
            arrays,
        }
    }

    /// The array layout for elements of `kind`.
    pub fn array_layout(&self, kind: ElementKind) -> &ArrayLayout {
        &self.arrays[kind as usize]
    }

    /// The array layout for reference elements; the collector's most
    /// common lookup.
    pub fn reference_array_layout(&self) -> &ArrayLayout {
        self.array_layout(ElementKind::Reference)
    }

    /// The specific layout for cells of `category`; arrays resolve
    /// through their element kind.
    pub fn specific_layout(&self, category: Category, kind: Option<ElementKind>) -> SpecificLayout {
        match category {
            Category::Tuple => SpecificLayout::Tuple(self.tuple),
            Category::Hybrid => SpecificLayout::Hybrid(self.hybrid),
            Category::Array => match kind {
                Some(kind) => SpecificLayout::Array(*self.array_layout(kind)),
                None => crate::fatal!("array layout requested without an element kind"),
            },
        }
    }
}
