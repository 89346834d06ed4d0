//! The closed set of array-element and field kinds.
//!
//! Kinds are carried as data (width and alignment live in a match, not
//! in a type hierarchy), so consumers dispatch on the value.

/// An element or field kind understood by the layout subsystem.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Float,
    Long,
    Double,
    Word,
    Reference,
}

impl ElementKind {
    /// All kinds, in a fixed order usable for building per-kind tables.
    pub const ALL: [ElementKind; 10] = [
        ElementKind::Boolean,
        ElementKind::Byte,
        ElementKind::Short,
        ElementKind::Char,
        ElementKind::Int,
        ElementKind::Float,
        ElementKind::Long,
        ElementKind::Double,
        ElementKind::Word,
        ElementKind::Reference,
    ];

    /// Storage width in bytes.
    pub const fn width(self) -> usize {
        match self {
            ElementKind::Boolean | ElementKind::Byte => 1,
            ElementKind::Short | ElementKind::Char => 2,
            ElementKind::Int | ElementKind::Float => 4,
            ElementKind::Long | ElementKind::Double => 8,
            ElementKind::Word | ElementKind::Reference => size_of::<usize>(),
        }
    }

    /// Natural alignment in bytes. Identical to the width for every
    /// kind in the set.
    pub const fn alignment(self) -> usize {
        self.width()
    }

    pub const fn is_reference(self) -> bool {
        matches!(self, ElementKind::Reference)
    }

    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::Boolean => "boolean",
            ElementKind::Byte => "byte",
            ElementKind::Short => "short",
            ElementKind::Char => "char",
            ElementKind::Int => "int",
            ElementKind::Float => "float",
            ElementKind::Long => "long",
            ElementKind::Double => "double",
            ElementKind::Word => "word",
            ElementKind::Reference => "reference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_are_natural() {
        assert_eq!(ElementKind::Byte.width(), 1);
        assert_eq!(ElementKind::Char.width(), 2);
        assert_eq!(ElementKind::Int.width(), 4);
        assert_eq!(ElementKind::Double.width(), 8);
        assert_eq!(ElementKind::Reference.width(), size_of::<usize>());
    }

    #[test]
    fn alignment_matches_width() {
        for kind in ElementKind::ALL {
            assert_eq!(kind.alignment(), kind.width(), "{}", kind.name());
            assert!(kind.alignment().is_power_of_two());
        }
    }
}
