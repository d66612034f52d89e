// RSA Big Integer Operations
// Decimal digit-array arbitrary precision integers used by the RSA core

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use crate::error::BigIntError;

/// Radix of a single stored digit
const BASE: u8 = 10;

/// Arbitrary precision non-negative integer.
///
/// Digits are stored base 10, least significant first. The digit vector never
/// ends in a zero; zero itself is the empty vector. Every operation returns a
/// fresh, normalized value and leaves its operands untouched.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BigInt {
    digits: Vec<u8>,
}

impl BigInt {
    /// The value 0
    pub fn zero() -> Self {
        Self { digits: Vec::new() }
    }

    /// The value 1
    pub fn one() -> Self {
        Self { digits: vec![1] }
    }

    /// Build from least-significant-first digits and normalize
    fn from_digits(digits: Vec<u8>) -> Self {
        let mut value = Self { digits };
        value.normalize();
        value
    }

    /// Strip most significant zero digits
    fn normalize(&mut self) {
        while self.digits.last() == Some(&0) {
            self.digits.pop();
        }
    }

    pub fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_even(&self) -> bool {
        self.digits.first().map_or(true, |d| d % 2 == 0)
    }

    /// Number of decimal digits (zero has none)
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Parse a decimal literal. Leading zeros are accepted and normalized away.
    pub fn from_decimal_str(s: &str) -> Result<Self, BigIntError> {
        if s.is_empty() {
            return Err(BigIntError::Empty);
        }

        let mut digits = Vec::with_capacity(s.len());
        for c in s.chars().rev() {
            let digit = c.to_digit(10).ok_or(BigIntError::InvalidDigit(c))?;
            digits.push(digit as u8);
        }

        Ok(Self::from_digits(digits))
    }

    /// Convert from a native signed integer; negative values are rejected
    pub fn from_i64(n: i64) -> Result<Self, BigIntError> {
        if n < 0 {
            return Err(BigIntError::Negative(n));
        }
        Ok(Self::from(n as u64))
    }

    /// Convert back to a native signed integer
    pub fn to_i64(&self) -> Result<i64, BigIntError> {
        let mut x: i64 = 0;
        for &d in self.digits.iter().rev() {
            x = x
                .checked_mul(BASE as i64)
                .and_then(|x| x.checked_add(d as i64))
                .ok_or(BigIntError::Overflow)?;
        }
        Ok(x)
    }

    /// Floor division by two
    pub fn half(&self) -> Self {
        let mut result = vec![0u8; self.digits.len()];

        let mut carry = 0u8;
        for i in (0..self.digits.len()).rev() {
            let current = self.digits[i] + carry * BASE;
            result[i] = current / 2;
            carry = current % 2;
        }

        Self::from_digits(result)
    }

    /// self + 1
    pub fn increment(&self) -> Self {
        self + &Self::one()
    }

    /// self - 1
    ///
    /// # Panics
    /// Panics when called on zero.
    pub fn decrement(&self) -> Self {
        self - &Self::one()
    }

    /// Subtraction that reports underflow instead of panicking
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        if self < other {
            return None;
        }

        let mut result = Vec::with_capacity(self.digits.len());
        let mut borrow = 0i8;
        for (i, &a) in self.digits.iter().enumerate() {
            let b = other.digits.get(i).copied().unwrap_or(0) as i8;
            let mut current = a as i8 - b - borrow;
            if current < 0 {
                current += BASE as i8;
                borrow = 1;
            } else {
                borrow = 0;
            }
            result.push(current as u8);
        }

        Some(Self::from_digits(result))
    }

    /// Quotient and remainder of `self / divisor`.
    ///
    /// The quotient is found by binary search over `[0, self]`, testing
    /// `mid * divisor <= self` at every step.
    pub fn div_rem(&self, divisor: &Self) -> Result<(Self, Self), BigIntError> {
        if divisor.is_zero() {
            return Err(BigIntError::DivisionByZero);
        }
        if self < divisor {
            return Ok((Self::zero(), self.clone()));
        }

        let mut low = Self::zero();
        let mut high = self.clone();
        let mut quotient = Self::zero();

        while low <= high {
            let mid = (&low + &high).half();
            if &(&mid * divisor) <= self {
                low = mid.increment();
                quotient = mid;
            } else {
                // mid * divisor > self implies mid >= 1
                high = mid.decrement();
            }
        }

        let remainder = self - &(&quotient * divisor);
        Ok((quotient, remainder))
    }

    /// `self mod modulus`
    pub fn rem(&self, modulus: &Self) -> Result<Self, BigIntError> {
        self.div_rem(modulus).map(|(_, r)| r)
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        self.digits
            .len()
            .cmp(&other.digits.len())
            .then_with(|| self.digits.iter().rev().cmp(other.digits.iter().rev()))
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a, 'b> Add<&'b BigInt> for &'a BigInt {
    type Output = BigInt;

    fn add(self, other: &'b BigInt) -> BigInt {
        let len = self.digits.len().max(other.digits.len());
        let mut result = Vec::with_capacity(len + 1);

        let mut carry = 0u8;
        for i in 0..len {
            let a = self.digits.get(i).copied().unwrap_or(0);
            let b = other.digits.get(i).copied().unwrap_or(0);
            let sum = a + b + carry;
            result.push(sum % BASE);
            carry = sum / BASE;
        }
        if carry != 0 {
            result.push(carry);
        }

        BigInt::from_digits(result)
    }
}

impl<'a, 'b> Sub<&'b BigInt> for &'a BigInt {
    type Output = BigInt;

    /// # Panics
    /// Panics if `other > self`; callers must guarantee the ordering.
    fn sub(self, other: &'b BigInt) -> BigInt {
        match self.checked_sub(other) {
            Some(result) => result,
            None => panic!("BigInt subtraction underflow: {} - {}", self, other),
        }
    }
}

impl<'a, 'b> Mul<&'b BigInt> for &'a BigInt {
    type Output = BigInt;

    fn mul(self, other: &'b BigInt) -> BigInt {
        if self.is_zero() || other.is_zero() {
            return BigInt::zero();
        }

        // Full convolution first, carries afterwards
        let mut acc = vec![0u32; self.digits.len() + other.digits.len()];
        for (i, &a) in self.digits.iter().enumerate() {
            for (j, &b) in other.digits.iter().enumerate() {
                acc[i + j] += a as u32 * b as u32;
            }
        }

        let mut carry = 0u32;
        for slot in acc.iter_mut() {
            let current = *slot + carry;
            *slot = current % BASE as u32;
            carry = current / BASE as u32;
        }

        BigInt::from_digits(acc.into_iter().map(|d| d as u8).collect())
    }
}

impl Add for BigInt {
    type Output = BigInt;

    fn add(self, other: BigInt) -> BigInt {
        &self + &other
    }
}

impl Sub for BigInt {
    type Output = BigInt;

    fn sub(self, other: BigInt) -> BigInt {
        &self - &other
    }
}

impl Mul for BigInt {
    type Output = BigInt;

    fn mul(self, other: BigInt) -> BigInt {
        &self * &other
    }
}

impl From<u64> for BigInt {
    fn from(mut n: u64) -> Self {
        let mut digits = Vec::new();
        while n > 0 {
            digits.push((n % BASE as u64) as u8);
            n /= BASE as u64;
        }
        Self { digits }
    }
}

impl From<u32> for BigInt {
    fn from(n: u32) -> Self {
        Self::from(n as u64)
    }
}

impl From<u8> for BigInt {
    fn from(n: u8) -> Self {
        Self::from(n as u64)
    }
}

impl FromStr for BigInt {
    type Err = BigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digits.is_empty() {
            return f.write_str("0");
        }
        let text: String = self
            .digits
            .iter()
            .rev()
            .map(|&d| char::from(b'0' + d))
            .collect();
        f.write_str(&text)
    }
}

impl fmt::Debug for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BigInt({})", self)
    }
}
