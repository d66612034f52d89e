// Number Theory
// Modular arithmetic and prime helpers built only from BigInt operations

use super::bigint::BigInt;
use crate::error::BigIntError;

/// Modular exponentiation: base^exp mod modulus
///
/// Recursively halves the exponent, squaring on the way back up.
/// Recursion depth is the bit length of `exp`.
pub fn mod_pow(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> Result<BigInt, BigIntError> {
    if modulus.is_zero() {
        return Err(BigIntError::DivisionByZero);
    }
    if exp.is_zero() {
        return Ok(BigInt::one());
    }

    let partial = mod_pow(base, &exp.half(), modulus)?;
    let squared = (&partial * &partial).rem(modulus)?;

    if exp.is_even() {
        Ok(squared)
    } else {
        (&squared * base).rem(modulus)
    }
}

/// Euler's totient by trial-division factorization.
///
/// Only practical while every prime factor but the largest is small, which
/// holds for the demonstration-sized moduli this crate generates.
pub fn euler_totient(n: &BigInt) -> Result<BigInt, BigIntError> {
    let mut result = n.clone();
    let mut rest = n.clone();

    let mut i = BigInt::from(2u8);
    while &i * &i <= rest {
        if rest.rem(&i)?.is_zero() {
            // Divide out every factor of i
            loop {
                let (quotient, remainder) = rest.div_rem(&i)?;
                if !remainder.is_zero() {
                    break;
                }
                rest = quotient;
            }
            let (share, _) = result.div_rem(&i)?;
            result = &result - &share;
        }
        i = i.increment();
    }

    // Whatever is left is a single prime factor
    if rest > BigInt::one() {
        let (share, _) = result.div_rem(&rest)?;
        result = &result - &share;
    }

    Ok(result)
}

/// Compute modular inverse: a^(-1) mod m
///
/// Uses Euler's theorem, a^(phi(m) - 1) mod m. The result is only an inverse
/// when gcd(a, m) = 1; callers are responsible for that.
pub fn mod_inverse(a: &BigInt, m: &BigInt) -> Result<BigInt, BigIntError> {
    if m.is_zero() {
        return Err(BigIntError::DivisionByZero);
    }
    let exponent = euler_totient(m)?.decrement();
    mod_pow(a, &exponent, m)
}

/// Deterministic primality test by odd trial division
pub fn is_prime(x: &BigInt) -> Result<bool, BigIntError> {
    let two = BigInt::from(2u8);
    if *x < two {
        return Ok(false);
    }
    if *x == two {
        return Ok(true);
    }
    if x.is_even() {
        return Ok(false);
    }

    let mut i = BigInt::from(3u8);
    while &i * &i <= *x {
        if x.rem(&i)?.is_zero() {
            return Ok(false);
        }
        i = &i + &two;
    }

    Ok(true)
}

/// Smallest prime strictly greater than `x`
pub fn next_prime(x: &BigInt) -> Result<BigInt, BigIntError> {
    let mut candidate = x.increment();
    while !is_prime(&candidate)? {
        candidate = candidate.increment();
    }
    Ok(candidate)
}

/// Greatest common divisor
pub fn gcd(a: &BigInt, b: &BigInt) -> Result<BigInt, BigIntError> {
    if b.is_zero() {
        return Ok(a.clone());
    }
    gcd(b, &a.rem(b)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_mod_pow(base: u64, exp: u64, modulus: u64) -> u64 {
        let mut result = 1u64;
        for _ in 0..exp {
            result = result * base % modulus;
        }
        result
    }

    fn native_is_prime(x: u64) -> bool {
        x >= 2 && (2..x).take_while(|i| i * i <= x).all(|i| x % i != 0)
    }

    fn native_gcd(a: u64, b: u64) -> u64 {
        if b == 0 {
            a
        } else {
            native_gcd(b, a % b)
        }
    }

    #[test]
    fn test_mod_pow() {
        // 3^5 mod 7 = 243 mod 7 = 5
        let result = mod_pow(&BigInt::from(3u8), &BigInt::from(5u8), &BigInt::from(7u8)).unwrap();
        assert_eq!(result, BigInt::from(5u8));

        for base in [0u64, 1, 2, 7, 12, 100] {
            for exp in [0u64, 1, 2, 3, 10, 31] {
                for modulus in [2u64, 7, 13, 97, 1000] {
                    let expected = native_mod_pow(base, exp, modulus);
                    let actual =
                        mod_pow(&BigInt::from(base), &BigInt::from(exp), &BigInt::from(modulus))
                            .unwrap();
                    assert_eq!(actual, BigInt::from(expected), "{}^{} mod {}", base, exp, modulus);
                }
            }
        }
    }

    #[test]
    fn test_mod_pow_zero_modulus() {
        let result = mod_pow(&BigInt::from(3u8), &BigInt::from(5u8), &BigInt::zero());
        assert_eq!(result, Err(BigIntError::DivisionByZero));
    }

    #[test]
    fn test_euler_totient() {
        let cases = [
            (1u64, 1u64),
            (2, 1),
            (9, 6),
            (10, 4),
            (36, 12),
            (97, 96),
            (3120, 768),
            (1_000_000, 400_000),
        ];
        for (n, phi) in cases {
            assert_eq!(euler_totient(&BigInt::from(n)).unwrap(), BigInt::from(phi), "phi({})", n);
        }
    }

    #[test]
    fn test_mod_inverse() {
        // 3 * 5 = 15 ≡ 1 mod 7, so inverse of 3 mod 7 is 5
        let a = BigInt::from(3u8);
        let m = BigInt::from(7u8);
        let inv = mod_inverse(&a, &m).unwrap();
        assert_eq!(inv, BigInt::from(5u8));

        for (a, m) in [(17u64, 3120u64), (65537, 3120), (10, 21), (7, 40), (123, 4567)] {
            assert_eq!(native_gcd(a, m), 1);
            let inv = mod_inverse(&BigInt::from(a), &BigInt::from(m)).unwrap();
            let check = (&inv * &BigInt::from(a)).rem(&BigInt::from(m)).unwrap();
            assert_eq!(check, BigInt::one(), "inverse of {} mod {}", a, m);
        }
    }

    #[test]
    fn test_is_prime() {
        let expected = [
            (0u64, false),
            (1, false),
            (2, true),
            (3, true),
            (4, false),
            (17, true),
            (561, false),
            (1009, true),
            (7919, true),
            (7917, false),
        ];
        for (x, prime) in expected {
            assert_eq!(is_prime(&BigInt::from(x)).unwrap(), prime, "is_prime({})", x);
        }
        for x in 0u64..200 {
            assert_eq!(is_prime(&BigInt::from(x)).unwrap(), native_is_prime(x), "is_prime({})", x);
        }
    }

    #[test]
    fn test_next_prime() {
        assert_eq!(next_prime(&BigInt::zero()).unwrap(), BigInt::from(2u8));
        assert_eq!(next_prime(&BigInt::from(2u8)).unwrap(), BigInt::from(3u8));
        assert_eq!(next_prime(&BigInt::from(13u8)).unwrap(), BigInt::from(17u8));
        assert_eq!(next_prime(&BigInt::from(1000u32)).unwrap(), BigInt::from(1009u32));
    }

    #[test]
    fn test_gcd() {
        for (a, b) in [(0u64, 5u64), (5, 0), (12, 18), (17, 65537), (1071, 462)] {
            let expected = BigInt::from(native_gcd(a, b));
            assert_eq!(gcd(&BigInt::from(a), &BigInt::from(b)).unwrap(), expected);
        }
    }
}
