//! Tagged value representation.
//!
//! A MysoreScript value is a single pointer-sized word. The low three bits
//! form a tag:
//!
//! - Low bit set (`...1`): a small integer. The arithmetic value is the word
//!   shifted right by three (arithmetic shift), giving a 61-bit signed range.
//! - All low three bits zero: an object pointer, or null (the zero word).
//!   Every heap object is aligned to at least 8 bytes, so real pointers
//!   always satisfy this.
//!
//! No other tag patterns are ever produced. Integers are carried inline in
//! the word itself; they are never boxed on the heap.

use std::fmt;

/// Number of low bits used for the tag.
const TAG_BITS: u32 = 3;

/// Mask covering the tag bits.
const TAG_MASK: u64 = 0b111;

/// Smallest integer representable inline (61-bit signed).
pub const SMALL_INT_MIN: i64 = -(1_i64 << 60);

/// Largest integer representable inline (61-bit signed).
pub const SMALL_INT_MAX: i64 = (1_i64 << 60) - 1;

/// A tagged MysoreScript value: small integer, object pointer, or null.
///
/// `Value` is exactly one machine word and is freely copyable. It does not
/// own the object it may point to; object lifetimes are managed by the
/// garbage-collected heap.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Value(u64);

impl Value {
    /// The null value (the zero word).
    pub const NULL: Self = Self(0);

    /// Box a small integer.
    ///
    /// The value must be within the 61-bit signed range; this is checked in
    /// debug builds only, matching the silent-truncation behaviour of the
    /// encoding itself.
    #[inline]
    #[must_use]
    pub fn from_int(i: i64) -> Self {
        debug_assert!(
            (SMALL_INT_MIN..=SMALL_INT_MAX).contains(&i),
            "small integer out of range: {i}"
        );
        Self(((i as u64) << TAG_BITS) | 1)
    }

    /// Unbox a small integer with an arithmetic right shift.
    ///
    /// The result is meaningful only when [`is_int`](Self::is_int) holds,
    /// but the operation itself is total: comparisons deliberately apply it
    /// to arbitrary tagged words.
    #[inline]
    #[must_use]
    pub const fn as_int(self) -> i64 {
        (self.0 as i64) >> TAG_BITS
    }

    /// Is this a small integer (low bit set)?
    #[inline]
    #[must_use]
    pub const fn is_int(self) -> bool {
        self.0 & 1 == 1
    }

    /// Is this a non-null object pointer (non-zero, low three bits clear)?
    #[inline]
    #[must_use]
    pub const fn is_object(self) -> bool {
        self.0 != 0 && self.0 & TAG_MASK == 0
    }

    /// Is this the null value?
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Wrap an object pointer. The pointer must be 8-byte aligned.
    #[inline]
    #[must_use]
    pub fn from_obj_ptr<T>(ptr: *const T) -> Self {
        let addr = ptr as u64;
        debug_assert!(addr & TAG_MASK == 0, "object pointer not 8-byte aligned");
        Self(addr)
    }

    /// Recover the object pointer.
    ///
    /// The result is null or dangling unless [`is_object`](Self::is_object)
    /// holds; dereferencing it is up to the caller.
    #[inline]
    #[must_use]
    pub fn as_obj_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// The truth test used by `if` and `while`: true iff the word with its
    /// tag bits cleared is non-zero, i.e. a non-zero small integer or a
    /// non-null object.
    #[inline]
    #[must_use]
    pub const fn is_truthy(self) -> bool {
        self.0 & !TAG_MASK != 0
    }

    /// The raw word.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Reconstruct a value from a raw word.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() {
            write!(f, "Value({})", self.as_int())
        } else if self.is_null() {
            write!(f, "Value(null)")
        } else {
            write!(f, "Value(object@{:#x})", self.0)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_int() {
            write!(f, "{}", self.as_int())
        } else if self.is_null() {
            f.write_str("null")
        } else {
            write!(f, "<object at {:#x}>", self.0)
        }
    }
}
