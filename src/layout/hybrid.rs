//! Hybrid cell layout: a tuple-style field area carried inside a
//! word-array cell.
//!
//! Hubs are the canonical hybrid. Their field-bearing prefix is laid
//! out exactly like a tuple (after the three-word array header), and
//! the remainder of the cell is addressed as word-array elements
//! holding variable-length tables. [`first_available_word_index`]
//! marks the boundary: fields live strictly below it, table elements
//! at or above it, so the two views never alias.
//!
//! [`first_available_word_index`]: HybridLayout::first_available_word_index

use crate::actor::FieldActor;
use crate::error::LayoutError;
use crate::layout::array::ArrayLayout;
use crate::layout::header::ARRAY_HEADER_SIZE;
use crate::layout::kind::ElementKind;
use crate::layout::tuple::layout_fields_from;
use crate::word::{Address, Size, Word};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HybridLayout {
    word_array: ArrayLayout,
}

impl Default for HybridLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HybridLayout {
    pub const fn new() -> Self {
        HybridLayout {
            word_array: ArrayLayout::new(ElementKind::Word),
        }
    }

    pub const fn header_size(&self) -> Size {
        ARRAY_HEADER_SIZE
    }

    /// Places `fields` after the three-word header, with the same
    /// policy as tuple layout. Returns the word-aligned size of the
    /// field-bearing prefix (the hub's `tuple_size`).
    pub fn layout_fields(
        &self,
        super_size: Size,
        fields: &mut [FieldActor],
    ) -> Result<Size, LayoutError> {
        layout_fields_from(self.header_size(), super_size, fields)
    }

    /// The first word-array index not covered by field storage of size
    /// `tuple_size`. Elements at or beyond this index are free for
    /// variable-length tables.
    pub fn first_available_word_index(&self, tuple_size: Size) -> usize {
        debug_assert!(tuple_size >= self.header_size());
        (tuple_size.word_aligned() - self.header_size()).in_words()
    }

    /// Cell size of a hybrid whose word array holds `length` elements.
    pub fn array_size(&self, length: usize) -> Size {
        self.word_array.array_size(length)
    }

    /// The word-array length needed for a cell of `cell_size` bytes.
    pub fn length_for_cell(&self, cell_size: Size) -> usize {
        debug_assert!(cell_size >= self.header_size());
        (cell_size.word_aligned() - self.header_size()).in_words()
    }

    /// # Safety
    ///
    /// See [`ArrayLayout::read_length`].
    #[inline]
    pub unsafe fn read_length(&self, origin: Address) -> usize {
        unsafe { self.word_array.read_length(origin) }
    }

    /// # Safety
    ///
    /// See [`ArrayLayout::write_length`].
    #[inline]
    pub unsafe fn write_length(&self, origin: Address, length: usize) {
        unsafe { self.word_array.write_length(origin, length) };
    }

    /// # Safety
    ///
    /// `origin` must be a live hybrid cell and `index` within its
    /// length.
    #[inline]
    pub unsafe fn get_word(&self, origin: Address, index: usize) -> Word {
        unsafe { self.word_array.get_word(origin, index) }
    }

    /// # Safety
    ///
    /// `origin` must be a live hybrid cell and `index` within its
    /// length.
    #[inline]
    pub unsafe fn set_word(&self, origin: Address, index: usize, value: Word) {
        unsafe { self.word_array.set_word(origin, index, value) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::WORD_SIZE;

    #[test]
    fn fields_start_after_the_array_header() {
        let layout = HybridLayout::new();
        let mut fields = vec![FieldActor::new("tables", ElementKind::Reference)];
        let tuple_size = layout.layout_fields(Size::ZERO, &mut fields).unwrap();
        assert_eq!(fields[0].offset, Some(ARRAY_HEADER_SIZE.as_usize()));
        assert_eq!(tuple_size, ARRAY_HEADER_SIZE + Size::words(1));
    }

    #[test]
    fn fields_never_alias_available_elements() {
        let layout = HybridLayout::new();
        let mut fields = vec![
            FieldActor::new("a", ElementKind::Long),
            FieldActor::new("b", ElementKind::Int),
            FieldActor::new("c", ElementKind::Reference),
        ];
        let tuple_size = layout.layout_fields(Size::ZERO, &mut fields).unwrap();
        let first_free = layout.first_available_word_index(tuple_size);
        let first_free_offset = layout.array_size(first_free).as_usize();
        for field in &fields {
            let end = field.offset.unwrap() + field.kind.width();
            assert!(end <= first_free_offset, "field {} overlaps elements", field.name);
        }
    }

    #[test]
    fn first_available_word_index_tracks_tuple_size() {
        let layout = HybridLayout::new();
        assert_eq!(layout.first_available_word_index(ARRAY_HEADER_SIZE), 0);
        assert_eq!(
            layout.first_available_word_index(ARRAY_HEADER_SIZE + Size::words(4)),
            4
        );
    }

    #[test]
    fn cell_length_round_trip() {
        let layout = HybridLayout::new();
        for length in [0, 1, 7, 32] {
            let cell = layout.array_size(length);
            assert_eq!(layout.length_for_cell(cell), length);
        }
        assert_eq!(layout.array_size(0), ARRAY_HEADER_SIZE);
        assert_eq!(
            layout.array_size(2),
            Size(ARRAY_HEADER_SIZE.as_usize() + 2 * WORD_SIZE)
        );
    }

    #[test]
    fn word_elements_round_trip() {
        let layout = HybridLayout::new();
        let words = layout.array_size(3).in_words();
        let cell = vec![0usize; words];
        let origin = Address::from_ptr(cell.as_ptr());
        unsafe {
            layout.write_length(origin, 3);
            layout.set_word(origin, 1, Word(0xabcd));
            assert_eq!(layout.get_word(origin, 1), Word(0xabcd));
            assert_eq!(layout.read_length(origin), 3);
        }
    }
}
