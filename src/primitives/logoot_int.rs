//! `LogootInt`: the value type used for position atoms and removal clocks.
//!
//! This is a thin wrapper over [`BigInt`] rather than a type alias so that
//! atoms and clocks read as distinct domain concepts in the rest of the
//! engine, the same way a Lamport clock wraps a bare counter instead of
//! passing `u64` around directly.

use std::cmp::Ordering;

use super::bigint::BigInt;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogootInt(BigInt);

impl LogootInt {
    pub fn zero() -> LogootInt {
        return LogootInt(BigInt::zero());
    }

    pub fn from_i64(value: i64) -> LogootInt {
        return LogootInt(BigInt::from_i64(value));
    }

    pub fn from_u64(value: u64) -> LogootInt {
        return LogootInt(BigInt::from_u64(value));
    }

    pub fn add_i64(&self, delta: i64) -> LogootInt {
        return LogootInt(self.0.add_i64(delta));
    }

    pub fn to_i64(&self) -> Option<i64> {
        return self.0.to_i64();
    }

    pub fn is_zero(&self) -> bool {
        return self.0.is_zero();
    }
}

impl PartialOrd for LogootInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for LogootInt {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.0.cmp(&other.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_zero() {
        assert!(LogootInt::zero().is_zero());
    }

    #[test]
    fn ordering_follows_value() {
        let a = LogootInt::from_i64(1);
        let b = LogootInt::from_i64(2);
        assert!(a < b);
    }

    #[test]
    fn add_i64_advances_atom() {
        let a = LogootInt::from_i64(5);
        assert_eq!(a.add_i64(3).to_i64(), Some(8));
    }
}
