//! Object layout: how tuples, arrays, and hybrids are arranged inside
//! their cells, and how headers are read, written, and raced on.

pub mod array;
pub mod general;
pub mod header;
pub mod hybrid;
pub mod kind;
pub mod scheme;
pub mod tuple;

pub use array::ArrayLayout;
pub use general::GeneralLayout;
pub use header::{Category, HeaderField};
pub use hybrid::HybridLayout;
pub use kind::ElementKind;
pub use scheme::{CellLayout, LayoutScheme, SpecificLayout};
pub use tuple::TupleLayout;
