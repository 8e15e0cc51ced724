//! Arbitrary-precision signed integers for Logoot position atoms.
//!
//! Position atoms need unbounded range: a position generated deep inside a
//! densely populated document keeps doubling in magnitude, and a tree that
//! lives for a long editing session will eventually produce atoms that
//! overflow any fixed-width integer. Most atoms are small, though, so limbs
//! are stored in a [`SmallVec`] that keeps the common single-word case
//! inline and only spills to the heap for positions that have grown large.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

/// An arbitrary-precision signed integer, little-endian base-2^64 limbs.
///
/// `sign` is `false` for non-negative values (including zero) and `true`
/// for negative values. `limbs` is always normalized: no trailing zero
/// limb except to represent zero itself as a single `0` limb.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BigInt {
    sign: bool,
    limbs: SmallVec<[u64; 1]>,
}

impl BigInt {
    pub fn zero() -> BigInt {
        return BigInt {
            sign: false,
            limbs: smallvec![0],
        };
    }

    pub fn from_i64(value: i64) -> BigInt {
        if value == 0 {
            return BigInt::zero();
        }
        let sign = value < 0;
        let magnitude = value.unsigned_abs();
        return BigInt {
            sign,
            limbs: smallvec![magnitude],
        };
    }

    pub fn from_u64(value: u64) -> BigInt {
        return BigInt {
            sign: false,
            limbs: smallvec![value],
        };
    }

    pub fn is_zero(&self) -> bool {
        return self.limbs.len() == 1 && self.limbs[0] == 0;
    }

    pub fn is_negative(&self) -> bool {
        return self.sign && !self.is_zero();
    }

    /// Value as `i64`, if it fits.
    pub fn to_i64(&self) -> Option<i64> {
        if self.limbs.len() > 1 {
            return None;
        }
        let magnitude = self.limbs[0];
        if self.sign {
            if magnitude > (i64::MAX as u64) + 1 {
                return None;
            }
            return Some((magnitude as i128 * -1) as i64);
        }
        if magnitude > i64::MAX as u64 {
            return None;
        }
        return Some(magnitude as i64);
    }

    pub fn add(&self, other: &BigInt) -> BigInt {
        if self.sign == other.sign {
            let mut result = BigInt {
                sign: self.sign,
                limbs: add_magnitudes(&self.limbs, &other.limbs),
            };
            result.normalize();
            return result;
        }
        return self.sub(&other.negate());
    }

    pub fn sub(&self, other: &BigInt) -> BigInt {
        if self.sign != other.sign {
            let mut result = BigInt {
                sign: self.sign,
                limbs: add_magnitudes(&self.limbs, &other.limbs),
            };
            result.normalize();
            return result;
        }
        match cmp_magnitudes(&self.limbs, &other.limbs) {
            Ordering::Equal => BigInt::zero(),
            Ordering::Greater => {
                let mut result = BigInt {
                    sign: self.sign,
                    limbs: sub_magnitudes(&self.limbs, &other.limbs),
                };
                result.normalize();
                result
            }
            Ordering::Less => {
                let mut result = BigInt {
                    sign: !self.sign,
                    limbs: sub_magnitudes(&other.limbs, &self.limbs),
                };
                result.normalize();
                result
            }
        }
    }

    /// Add `delta` (may be negative) and return the result.
    pub fn add_i64(&self, delta: i64) -> BigInt {
        return self.add(&BigInt::from_i64(delta));
    }

    pub fn negate(&self) -> BigInt {
        if self.is_zero() {
            return self.clone();
        }
        return BigInt {
            sign: !self.sign,
            limbs: self.limbs.clone(),
        };
    }

    fn normalize(&mut self) {
        while self.limbs.len() > 1 && *self.limbs.last().unwrap() == 0 {
            self.limbs.pop();
        }
        if self.is_zero() {
            self.sign = false;
        }
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            (false, false) => return cmp_magnitudes(&self.limbs, &other.limbs),
            (true, true) => return cmp_magnitudes(&other.limbs, &self.limbs),
        }
    }
}

fn cmp_magnitudes(a: &[u64], b: &[u64]) -> Ordering {
    if a.len() != b.len() {
        return a.len().cmp(&b.len());
    }
    for i in (0..a.len()).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    return Ordering::Equal;
}

fn add_magnitudes(a: &[u64], b: &[u64]) -> SmallVec<[u64; 1]> {
    let mut result = SmallVec::new();
    let mut carry: u128 = 0;
    for i in 0..a.len().max(b.len()) {
        let x = *a.get(i).unwrap_or(&0) as u128;
        let y = *b.get(i).unwrap_or(&0) as u128;
        let sum = x + y + carry;
        result.push(sum as u64);
        carry = sum >> 64;
    }
    if carry > 0 {
        result.push(carry as u64);
    }
    return result;
}

/// Requires `a >= b` as magnitudes.
fn sub_magnitudes(a: &[u64], b: &[u64]) -> SmallVec<[u64; 1]> {
    let mut result = SmallVec::new();
    let mut borrow: i128 = 0;
    for i in 0..a.len() {
        let x = a[i] as i128;
        let y = *b.get(i).unwrap_or(&0) as i128;
        let mut diff = x - y - borrow;
        if diff < 0 {
            diff += 1i128 << 64;
            borrow = 1;
        } else {
            borrow = 0;
        }
        result.push(diff as u64);
    }
    return result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_negative() {
        assert!(!BigInt::zero().is_negative());
        assert!(BigInt::zero().is_zero());
    }

    #[test]
    fn add_small() {
        let a = BigInt::from_i64(3);
        let b = BigInt::from_i64(4);
        assert_eq!(a.add(&b).to_i64(), Some(7));
    }

    #[test]
    fn add_crosses_limb_boundary() {
        let a = BigInt::from_u64(u64::MAX);
        let b = BigInt::from_i64(1);
        let sum = a.add(&b);
        assert!(sum.to_i64().is_none());
        assert!(sum > a);
    }

    #[test]
    fn sub_below_zero_flips_sign() {
        let a = BigInt::from_i64(3);
        let b = BigInt::from_i64(10);
        assert_eq!(a.sub(&b).to_i64(), Some(-7));
    }

    #[test]
    fn ordering_respects_sign() {
        let neg = BigInt::from_i64(-5);
        let pos = BigInt::from_i64(5);
        assert!(neg < pos);
        assert!(neg < BigInt::zero());
        assert!(pos > BigInt::zero());
    }

    #[test]
    fn ordering_respects_magnitude() {
        let small = BigInt::from_i64(2);
        let big = BigInt::from_u64(u64::MAX).add(&BigInt::from_i64(1));
        assert!(small < big);
    }

    #[test]
    fn add_i64_delta() {
        let a = BigInt::from_i64(10);
        assert_eq!(a.add_i64(-3).to_i64(), Some(7));
    }

    #[test]
    fn negate_round_trips() {
        let a = BigInt::from_i64(42);
        assert_eq!(a.negate().negate(), a);
    }
}
