//! Word-sized value newtypes used throughout the layout and region
//! subsystems: raw addresses, byte sizes, untyped machine words, and
//! object grips.

use std::fmt::{self, Debug, Display, Formatter};
use std::ops::{Add, AddAssign, Sub};

/// Bytes per machine word on the running platform.
pub const WORD_SIZE: usize = size_of::<usize>();

/// Rounds `value` up to the next multiple of `align`.
///
/// `align` must be a power of two.
#[inline]
pub const fn align_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Rounds `value` up to the next word boundary.
#[inline]
pub const fn word_align(value: usize) -> usize {
    align_up(value, WORD_SIZE)
}

/// A raw address in VM-managed space.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Address(pub usize);

impl Address {
    pub const ZERO: Self = Address(0);

    #[inline]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Address(ptr as usize)
    }

    #[inline]
    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    #[inline]
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_word_aligned(self) -> bool {
        self.0 % WORD_SIZE == 0
    }

    #[inline]
    pub const fn is_aligned_to(self, align: usize) -> bool {
        self.0 % align == 0
    }

    #[inline]
    pub const fn align_up(self, align: usize) -> Self {
        Address(align_up(self.0, align))
    }

    pub fn checked_add(self, size: Size) -> Option<Self> {
        self.0.checked_add(size.0).map(Address)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl Add<Size> for Address {
    type Output = Address;
    #[inline]
    fn add(self, rhs: Size) -> Address {
        Address(self.0 + rhs.0)
    }
}

impl Add<usize> for Address {
    type Output = Address;
    #[inline]
    fn add(self, rhs: usize) -> Address {
        Address(self.0 + rhs)
    }
}

impl Sub<Address> for Address {
    type Output = Size;
    #[inline]
    fn sub(self, rhs: Address) -> Size {
        Size(self.0 - rhs.0)
    }
}

impl Sub<usize> for Address {
    type Output = Address;
    #[inline]
    fn sub(self, rhs: usize) -> Address {
        Address(self.0 - rhs)
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A byte count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct Size(pub usize);

impl Size {
    pub const ZERO: Self = Size(0);

    #[inline]
    pub const fn words(n: usize) -> Self {
        Size(n * WORD_SIZE)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_word_aligned(self) -> bool {
        self.0 % WORD_SIZE == 0
    }

    #[inline]
    pub const fn word_aligned(self) -> Self {
        Size(word_align(self.0))
    }

    #[inline]
    pub const fn in_words(self) -> usize {
        debug_assert!(self.0 % WORD_SIZE == 0);
        self.0 / WORD_SIZE
    }

    pub fn checked_mul(self, n: usize) -> Option<Self> {
        self.0.checked_mul(n).map(Size)
    }

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl Add for Size {
    type Output = Size;
    #[inline]
    fn add(self, rhs: Size) -> Size {
        Size(self.0 + rhs.0)
    }
}

impl Add<usize> for Size {
    type Output = Size;
    #[inline]
    fn add(self, rhs: usize) -> Size {
        Size(self.0 + rhs)
    }
}

impl AddAssign for Size {
    #[inline]
    fn add_assign(&mut self, rhs: Size) {
        self.0 += rhs.0;
    }
}

impl Sub for Size {
    type Output = Size;
    #[inline]
    fn sub(self, rhs: Size) -> Size {
        Size(self.0 - rhs.0)
    }
}

impl Display for Size {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Size {
    fn from(bytes: usize) -> Self {
        Size(bytes)
    }
}

/// An untyped machine word read from or written into a cell.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Word(pub usize);

impl Word {
    pub const ZERO: Self = Word(0);

    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl Debug for Word {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A raw object reference value: the origin address of an object, or
/// [`Grip::ZERO`] for the null reference.
///
/// A copying collector installs the relocated origin of an object as a
/// forward grip; this layer only transports the value, it attaches no
/// lifetime to it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Grip(pub usize);

impl Grip {
    pub const ZERO: Self = Grip(0);

    #[inline]
    pub const fn from_origin(origin: Address) -> Self {
        Grip(origin.0)
    }

    #[inline]
    pub const fn to_origin(self) -> Address {
        Address(self.0)
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Debug for Grip {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            f.write_str("Grip(zero)")
        } else {
            write!(f, "Grip({:#x})", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_basics() {
        assert_eq!(align_up(0, 8), 0);
        assert_eq!(align_up(1, 8), 8);
        assert_eq!(align_up(8, 8), 8);
        assert_eq!(align_up(9, 8), 16);
        assert_eq!(align_up(17, 4), 20);
    }

    #[test]
    fn address_arithmetic() {
        let a = Address(0x1000);
        assert_eq!(a + Size(0x10), Address(0x1010));
        assert_eq!((a + Size(0x10)) - a, Size(0x10));
        assert!(a.is_word_aligned());
        assert!(Address(0x1001).align_up(WORD_SIZE).is_word_aligned());
    }

    #[test]
    fn size_words() {
        assert_eq!(Size::words(3).as_usize(), 3 * WORD_SIZE);
        assert_eq!(Size(WORD_SIZE + 1).word_aligned(), Size(2 * WORD_SIZE));
        assert_eq!(Size::words(4).in_words(), 4);
    }

    #[test]
    fn grip_round_trip() {
        let origin = Address(0xdead0);
        let grip = Grip::from_origin(origin);
        assert_eq!(grip.to_origin(), origin);
        assert!(Grip::ZERO.is_zero());
    }
}
