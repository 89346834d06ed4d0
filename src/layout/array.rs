//! Array cell layout, one instance per element kind.
//!
//! An array cell is `[hub, misc, length, elements..., padding]`; the
//! first element starts immediately after the header and elements are
//! packed at the kind's natural width, so element offsets are strictly
//! increasing and injective in the index. The cell is padded up to a
//! word boundary at the end.

use crate::layout::header::{ARRAY_HEADER_SIZE, LENGTH_OFFSET};
use crate::layout::kind::ElementKind;
use crate::word::{Address, Grip, Size, Word};

/// Largest accepted array length. Guards the size computation against
/// corrupted metadata before the multiplication can wrap.
const MAX_ARRAY_LENGTH: usize = 0x4000_0000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArrayLayout {
    element_kind: ElementKind,
}

impl ArrayLayout {
    pub const fn new(element_kind: ElementKind) -> Self {
        ArrayLayout { element_kind }
    }

    pub const fn element_kind(&self) -> ElementKind {
        self.element_kind
    }

    pub const fn header_size(&self) -> Size {
        ARRAY_HEADER_SIZE
    }

    /// Total cell size of an array of `length` elements, including the
    /// header and end padding to word alignment. A zero-length array
    /// occupies exactly the array header.
    pub fn array_size(&self, length: usize) -> Size {
        if length > MAX_ARRAY_LENGTH {
            crate::fatal!(
                "massive array allocation attempt: length={}, element kind {}",
                length,
                self.element_kind.name()
            );
        }
        let payload = self.element_kind.width() * length;
        (ARRAY_HEADER_SIZE + payload).word_aligned()
    }

    /// Byte offset of element `index` from the origin.
    #[inline]
    pub const fn element_offset_from_origin(&self, index: usize) -> usize {
        ARRAY_HEADER_SIZE.as_usize() + index * self.element_kind.width()
    }

    /// Byte offset of element `index` from the cell start. The origin
    /// coincides with the cell start under this scheme.
    #[inline]
    pub const fn element_offset_in_cell(&self, index: usize) -> usize {
        self.element_offset_from_origin(index)
    }

    /// Reads the length word of the array at `origin`.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live array or hybrid cell.
    #[inline]
    pub unsafe fn read_length(&self, origin: Address) -> usize {
        let length = unsafe { (origin + LENGTH_OFFSET).as_ptr::<usize>().read() };
        debug_assert!(length <= MAX_ARRAY_LENGTH, "corrupt length word");
        length
    }

    /// Writes the length word of the array at `origin`.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of an array or hybrid cell whose
    /// payload accommodates `length` elements.
    #[inline]
    pub unsafe fn write_length(&self, origin: Address, length: usize) {
        debug_assert!(length <= MAX_ARRAY_LENGTH);
        unsafe { (origin + LENGTH_OFFSET).as_mut_ptr::<usize>().write(length) };
    }

    /// Copies `length` elements between two same-kind arrays with
    /// memmove semantics: overlapping ranges within a single array
    /// behave as if copied through a temporary, and `length == 0` is a
    /// no-op.
    ///
    /// # Safety
    ///
    /// Both origins must be live arrays of this layout's kind, and the
    /// index ranges must lie within their respective lengths.
    pub unsafe fn copy_elements(
        &self,
        src_origin: Address,
        src_index: usize,
        dst_origin: Address,
        dst_index: usize,
        length: usize,
    ) {
        if length == 0 {
            return;
        }
        debug_assert!(src_index + length <= unsafe { self.read_length(src_origin) });
        debug_assert!(dst_index + length <= unsafe { self.read_length(dst_origin) });
        let width = self.element_kind.width();
        let src = (src_origin + self.element_offset_from_origin(src_index)).as_ptr::<u8>();
        let dst = (dst_origin + self.element_offset_from_origin(dst_index)).as_mut_ptr::<u8>();
        unsafe { std::ptr::copy(src, dst, length * width) };
    }

    #[inline]
    unsafe fn element_ptr<T>(&self, origin: Address, index: usize) -> *mut T {
        debug_assert_eq!(size_of::<T>(), self.element_kind.width());
        debug_assert!(index < unsafe { self.read_length(origin) });
        (origin + self.element_offset_from_origin(index)).as_mut_ptr::<T>()
    }
}

/// Typed element accessors. Each pair is only valid on the layout of
/// the matching kind; the kind match is checked in debug builds.
macro_rules! element_accessors {
    ($($get:ident, $set:ident, $ty:ty, $kind:ident;)*) => {
        impl ArrayLayout {
            $(
                /// # Safety
                ///
                /// `origin` must be a live array of this layout's kind
                /// and `index` must be within its length.
                #[inline]
                pub unsafe fn $get(&self, origin: Address, index: usize) -> $ty {
                    debug_assert_eq!(self.element_kind, ElementKind::$kind);
                    unsafe { self.element_ptr::<$ty>(origin, index).read() }
                }

                /// # Safety
                ///
                /// `origin` must be a live array of this layout's kind
                /// and `index` must be within its length.
                #[inline]
                pub unsafe fn $set(&self, origin: Address, index: usize, value: $ty) {
                    debug_assert_eq!(self.element_kind, ElementKind::$kind);
                    unsafe { self.element_ptr::<$ty>(origin, index).write(value) };
                }
            )*
        }
    };
}

element_accessors! {
    get_byte, set_byte, i8, Byte;
    get_short, set_short, i16, Short;
    get_char, set_char, u16, Char;
    get_int, set_int, i32, Int;
    get_float, set_float, f32, Float;
    get_long, set_long, i64, Long;
    get_double, set_double, f64, Double;
    get_word, set_word, Word, Word;
    get_grip, set_grip, Grip, Reference;
}

impl ArrayLayout {
    /// # Safety
    ///
    /// See the typed accessors above.
    #[inline]
    pub unsafe fn get_boolean(&self, origin: Address, index: usize) -> bool {
        debug_assert_eq!(self.element_kind, ElementKind::Boolean);
        unsafe { self.element_ptr::<u8>(origin, index).read() != 0 }
    }

    /// # Safety
    ///
    /// See the typed accessors above.
    #[inline]
    pub unsafe fn set_boolean(&self, origin: Address, index: usize, value: bool) {
        debug_assert_eq!(self.element_kind, ElementKind::Boolean);
        unsafe { self.element_ptr::<u8>(origin, index).write(value as u8) };
    }

    /// Applies `visit` to every non-zero grip stored in a reference
    /// array. This is the traversal primitive the collector uses.
    ///
    /// # Safety
    ///
    /// `origin` must be a live reference array.
    pub unsafe fn visit_reference_elements(&self, origin: Address, mut visit: impl FnMut(Grip)) {
        debug_assert_eq!(self.element_kind, ElementKind::Reference);
        let length = unsafe { self.read_length(origin) };
        for index in 0..length {
            let grip = unsafe { self.get_grip(origin, index) };
            if !grip.is_zero() {
                visit(grip);
            }
        }
    }
}
