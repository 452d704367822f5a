pub trait NumExt {
    /// Returns the base 2 logarithm of the number, rounding up to the next integer. Returns 0
    /// for 0 and 1.
    fn ilog2_ceil(self) -> Self;
}

impl NumExt for usize {
    #[inline]
    fn ilog2_ceil(self) -> Self {
        match self {
            0 | 1 => 0,
            n => (usize::BITS - (n - 1).leading_zeros()) as Self,
        }
    }
}
