//! Object header structure shared by every layout in the scheme.
//!
//! Every cell starts with a hub word and a misc word; array and hybrid
//! cells append a length word. The origin of a cell coincides with its
//! start address under this scheme, so header offsets below are both
//! origin-relative and cell-relative. The compiler collaborator bakes
//! these offsets into generated loads and stores, which is why they are
//! constants rather than methods.

use crate::word::{Size, WORD_SIZE};

/// A logical header slot. Its byte offset is a property of the active
/// layout scheme, not of the field itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeaderField {
    /// Reference to the object's hub (per-class metadata).
    Hub,
    /// Word raced on by the monitor subsystem (lock state, hash code).
    Misc,
    /// Element count; present in array and hybrid headers only.
    Length,
}

impl HeaderField {
    pub const fn description(self) -> &'static str {
        match self {
            HeaderField::Hub => "class metadata reference",
            HeaderField::Misc => "monitor and hash word",
            HeaderField::Length => "element count",
        }
    }
}

/// The category of an object, recoverable from its hub.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Tuple,
    Array,
    Hybrid,
}

/// Byte offset of the hub word from the origin.
pub const HUB_OFFSET: usize = 0;

/// Byte offset of the misc word from the origin.
pub const MISC_OFFSET: usize = WORD_SIZE;

/// Byte offset of the length word from the origin (arrays and hybrids).
pub const LENGTH_OFFSET: usize = 2 * WORD_SIZE;

/// Header size of a tuple cell: hub and misc words.
pub const TUPLE_HEADER_SIZE: Size = Size(2 * WORD_SIZE);

/// Header size of an array or hybrid cell: hub, misc, and length words.
pub const ARRAY_HEADER_SIZE: Size = Size(3 * WORD_SIZE);

/// Byte offset of a header field under this scheme, or `None` for
/// [`HeaderField::Length`] on a tuple.
pub const fn header_offset(category: Category, field: HeaderField) -> Option<usize> {
    match (category, field) {
        (_, HeaderField::Hub) => Some(HUB_OFFSET),
        (_, HeaderField::Misc) => Some(MISC_OFFSET),
        (Category::Tuple, HeaderField::Length) => None,
        (_, HeaderField::Length) => Some(LENGTH_OFFSET),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_offsets_dont_overlap() {
        assert!(HUB_OFFSET < MISC_OFFSET);
        assert!(MISC_OFFSET < LENGTH_OFFSET);
        assert_eq!(TUPLE_HEADER_SIZE.as_usize(), LENGTH_OFFSET);
        assert_eq!(ARRAY_HEADER_SIZE.as_usize(), LENGTH_OFFSET + WORD_SIZE);
    }

    #[test]
    fn tuples_have_no_length_slot() {
        assert_eq!(header_offset(Category::Tuple, HeaderField::Length), None);
        assert_eq!(
            header_offset(Category::Array, HeaderField::Length),
            Some(LENGTH_OFFSET)
        );
        assert_eq!(
            header_offset(Category::Hybrid, HeaderField::Hub),
            Some(HUB_OFFSET)
        );
    }
}
