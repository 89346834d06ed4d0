//! Tuple (plain object) cell layout and field placement.
//!
//! Placement policy: fields are sorted by decreasing alignment, with
//! declaration order preserved among equal alignments, each offset
//! aligned to the field kind's natural alignment, and the total size
//! rounded up to a word boundary. The policy is deterministic, so the
//! same field list always produces the same offsets — a requirement of
//! the boot image, which bakes these offsets into persisted objects.

use crate::actor::{FieldActor, Hub};
use crate::error::LayoutError;
use crate::layout::header::TUPLE_HEADER_SIZE;
use crate::word::{align_up, Address, Grip, Size};
use tracing::trace;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TupleLayout;

impl TupleLayout {
    pub const fn new() -> Self {
        TupleLayout
    }

    pub const fn header_size(&self) -> Size {
        TUPLE_HEADER_SIZE
    }

    /// Assigns an origin-relative byte offset to every field in
    /// `fields`, given that the superclass's storage (header included)
    /// occupies `[0, super_size)`. Returns the word-aligned total size
    /// of the instance.
    ///
    /// A zero `super_size` denotes the root class, whose first field
    /// goes directly after the header.
    pub fn layout_fields(
        &self,
        super_size: Size,
        fields: &mut [FieldActor],
    ) -> Result<Size, LayoutError> {
        layout_fields_from(self.header_size(), super_size, fields)
    }

    /// Applies `visit` to every non-zero grip stored in the instance's
    /// reference fields, using the reference map recorded in `hub`.
    ///
    /// # Safety
    ///
    /// `origin` must be the origin of a live tuple (or the tuple
    /// prefix of a hybrid) whose class is described by `hub`.
    pub unsafe fn visit_reference_fields(
        &self,
        origin: Address,
        hub: &Hub,
        mut visit: impl FnMut(Grip),
    ) {
        for &offset in &hub.reference_offsets {
            let grip = unsafe { (origin + offset).as_ptr::<Grip>().read() };
            if !grip.is_zero() {
                visit(grip);
            }
        }
    }
}

/// Shared placement engine for tuple and hybrid layouts; they differ
/// only in where field storage begins.
pub(crate) fn layout_fields_from(
    header_size: Size,
    super_size: Size,
    fields: &mut [FieldActor],
) -> Result<Size, LayoutError> {
    let first_offset = if super_size.is_zero() {
        header_size
    } else {
        if !super_size.is_word_aligned() {
            return Err(LayoutError::MalformedFieldInput(format!(
                "superclass size {} is not word aligned",
                super_size
            )));
        }
        if super_size < header_size {
            return Err(LayoutError::MalformedFieldInput(format!(
                "superclass size {} is smaller than the header ({})",
                super_size, header_size
            )));
        }
        super_size
    };

    for field in fields.iter() {
        if field.offset.is_some() {
            return Err(LayoutError::MalformedFieldInput(format!(
                "field {} already has an assigned offset",
                field.name
            )));
        }
    }

    // Sort by decreasing alignment to minimize padding; sort_by_key is
    // stable, so declaration order breaks ties.
    let mut order: Vec<usize> = (0..fields.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(fields[i].kind.alignment()));

    let mut offset = first_offset.as_usize();
    for index in order {
        let field = &mut fields[index];
        let aligned = align_up(offset, field.kind.alignment());
        field.offset = Some(aligned);
        offset = aligned + field.kind.width();
        trace!(
            field = %field.name,
            kind = field.kind.name(),
            offset = aligned,
            "placed field"
        );
    }

    Ok(Size(offset).word_aligned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::kind::ElementKind;
    use crate::word::WORD_SIZE;

    fn offsets(fields: &[FieldActor]) -> Vec<usize> {
        fields.iter().map(|f| f.offset.unwrap()).collect()
    }

    #[test]
    fn root_class_fields_start_after_the_header() {
        let layout = TupleLayout::new();
        let mut fields = vec![FieldActor::new("x", ElementKind::Long)];
        let size = layout.layout_fields(Size::ZERO, &mut fields).unwrap();
        assert_eq!(fields[0].offset, Some(TUPLE_HEADER_SIZE.as_usize()));
        assert_eq!(size, TUPLE_HEADER_SIZE + Size(8));
    }

    #[test]
    fn subclass_fields_start_after_the_superclass() {
        let layout = TupleLayout::new();
        let super_size = TUPLE_HEADER_SIZE + Size::words(2);
        let mut fields = vec![FieldActor::new("y", ElementKind::Int)];
        let size = layout.layout_fields(super_size, &mut fields).unwrap();
        assert_eq!(fields[0].offset, Some(super_size.as_usize()));
        assert!(size.is_word_aligned());
        assert!(size > super_size);
    }

    #[test]
    fn no_two_fields_overlap_and_all_are_aligned() {
        let layout = TupleLayout::new();
        let mut fields = vec![
            FieldActor::new("a", ElementKind::Byte),
            FieldActor::new("b", ElementKind::Double),
            FieldActor::new("c", ElementKind::Short),
            FieldActor::new("d", ElementKind::Reference),
            FieldActor::new("e", ElementKind::Byte),
            FieldActor::new("f", ElementKind::Int),
        ];
        let size = layout.layout_fields(Size::ZERO, &mut fields).unwrap();
        assert!(size.is_word_aligned());

        let mut spans: Vec<(usize, usize)> = fields
            .iter()
            .map(|f| {
                let offset = f.offset.unwrap();
                assert_eq!(offset % f.kind.alignment(), 0, "{} misaligned", f.name);
                (offset, offset + f.kind.width())
            })
            .collect();
        spans.sort();
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "fields overlap: {:?}", pair);
        }
        assert!(spans.last().unwrap().1 <= size.as_usize());
    }

    #[test]
    fn placement_is_deterministic() {
        let layout = TupleLayout::new();
        let build = || {
            vec![
                FieldActor::new("p", ElementKind::Int),
                FieldActor::new("q", ElementKind::Long),
                FieldActor::new("r", ElementKind::Int),
            ]
        };
        let mut first = build();
        let mut second = build();
        layout.layout_fields(Size::ZERO, &mut first).unwrap();
        layout.layout_fields(Size::ZERO, &mut second).unwrap();
        assert_eq!(offsets(&first), offsets(&second));
    }

    #[test]
    fn larger_alignment_goes_first() {
        let layout = TupleLayout::new();
        let mut fields = vec![
            FieldActor::new("small", ElementKind::Byte),
            FieldActor::new("big", ElementKind::Double),
        ];
        layout.layout_fields(Size::ZERO, &mut fields).unwrap();
        assert!(fields[1].offset.unwrap() < fields[0].offset.unwrap());
    }

    #[test]
    fn reference_field_visitation_follows_the_hub_map() {
        let layout = TupleLayout::new();
        let mut fields = vec![
            FieldActor::new("count", ElementKind::Int),
            FieldActor::new("next", ElementKind::Reference),
            FieldActor::new("owner", ElementKind::Reference),
        ];
        let size = layout.layout_fields(Size::ZERO, &mut fields).unwrap();
        let reference_offsets: Vec<usize> = fields
            .iter()
            .filter(|f| f.kind.is_reference())
            .map(|f| f.offset.unwrap())
            .collect();
        let hub = Hub::tuple("Node", size, reference_offsets.clone());

        let cell = vec![0usize; size.in_words()];
        let origin = Address::from_ptr(cell.as_ptr());
        unsafe {
            (origin + reference_offsets[0]).as_mut_ptr::<Grip>().write(Grip(0x3000));
            let mut seen = Vec::new();
            layout.visit_reference_fields(origin, &hub, |grip| seen.push(grip));
            // The zero grip in the second reference field is skipped.
            assert_eq!(seen, vec![Grip(0x3000)]);
        }
    }

    #[test]
    fn malformed_super_size_is_rejected() {
        let layout = TupleLayout::new();
        let mut fields = vec![FieldActor::new("x", ElementKind::Int)];
        let err = layout
            .layout_fields(Size(WORD_SIZE + 1), &mut fields)
            .unwrap_err();
        assert!(matches!(err, LayoutError::MalformedFieldInput(_)));

        let err = layout
            .layout_fields(Size(WORD_SIZE), &mut fields)
            .unwrap_err();
        assert!(matches!(err, LayoutError::MalformedFieldInput(_)));
    }
}
