//! Field arithmetic and FFT over the aggregation prime.
//!
//! The scalar field `F` (aliased at the crate root) is `ark_bn254::Fr`: a
//! well-audited ~254-bit prime with a documented two-adicity of 28, i.e. its
//! multiplicative group has a subgroup of order `2^28`. That subgroup is what
//! the radix-2 FFT below runs over. Bit-exact interoperability with any
//! specific legacy deployment's modulus is not a goal here (see DESIGN.md);
//! what is required, and what this field provides, is a prime `p` with
//! `p - 1` divisible by a large power of two and large enough to hold every
//! realistic aggregate without wraparound.

#![forbid(unsafe_code)]

use ark_ff::{FftField, Field, One, Zero};
use thiserror::Error;

use crate::F;

/// Errors from FFT/polynomial operations.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The requested transform length is not a power of two.
    #[error("length {0} is not a power of two")]
    NotPowerOfTwo(usize),
    /// The requested transform length exceeds the field's two-adic subgroup.
    #[error("length {len} exceeds the maximum supported domain size 2^{max_log}")]
    DomainTooLarge { len: usize, max_log: u32 },
    /// The field has no root of unity of the requested order (should not
    /// happen once `DomainTooLarge` has been ruled out, but kept explicit).
    #[error("no root of unity of order {0} in this field")]
    NoRootOfUnity(usize),
}

#[inline]
fn is_pow2(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}

/// Returns `true` iff `n` is a power of two not exceeding the field's
/// two-adic subgroup order.
pub fn domain_size_ok(n: usize) -> bool {
    is_pow2(n) && (n as u64).trailing_zeros() <= F::TWO_ADICITY
}

/// A primitive `n`-th root of unity in `F`, or an error if `n` is not a
/// supported power of two.
pub fn root_of_unity(n: usize) -> Result<F, FieldError> {
    if !is_pow2(n) {
        return Err(FieldError::NotPowerOfTwo(n));
    }
    if (n as u64).trailing_zeros() > F::TWO_ADICITY {
        return Err(FieldError::DomainTooLarge { len: n, max_log: F::TWO_ADICITY });
    }
    F::get_root_of_unity(n as u64).ok_or(FieldError::NoRootOfUnity(n))
}

#[inline]
fn pow_u64(mut base: F, mut exp: u64) -> F {
    let mut acc = F::one();
    while exp > 0 {
        if (exp & 1) == 1 {
            acc *= base;
        }
        base.square_in_place();
        exp >>= 1;
    }
    acc
}

/// In-place radix-2 Cooley-Tukey FFT/IFFT over the roots of unity of order
/// `points.len()`. When `invert` is true, the output is additionally scaled
/// by `n^{-1}` so that `fft(fft(v, false), true) == v`.
pub fn fft(points: &mut [F], invert: bool) -> Result<(), FieldError> {
    let n = points.len();
    if n <= 1 {
        return Ok(());
    }
    if !is_pow2(n) {
        return Err(FieldError::NotPowerOfTwo(n));
    }

    // Bit-reversal permutation.
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            points.swap(i, j);
        }
    }

    let root = root_of_unity(n)?;
    let root = if invert { root.inverse().expect("root of unity is non-zero") } else { root };

    let mut len = 2usize;
    while len <= n {
        let half = len / 2;
        let step = n / len;
        let w_len = pow_u64(root, step as u64);
        let mut start = 0usize;
        while start < n {
            let mut w = F::one();
            for k in 0..half {
                let u = points[start + k];
                let v = points[start + k + half] * w;
                points[start + k] = u + v;
                points[start + k + half] = u - v;
                w *= w_len;
            }
            start += len;
        }
        len <<= 1;
    }

    if invert {
        let n_inv = F::from(n as u64).inverse().expect("n is non-zero");
        for p in points.iter_mut() {
            *p *= n_inv;
        }
    }

    Ok(())
}

/// Evaluate a polynomial given by its coefficients (low-to-high) at `x` via
/// Horner's method.
pub fn poly_eval(coeffs: &[F], x: F) -> F {
    let mut acc = F::zero();
    for c in coeffs.iter().rev() {
        acc = acc * x + c;
    }
    acc
}

/// Interpret `points` as the evaluations of a polynomial on the
/// `points.len()`-th roots of unity, and return its value at `x`.
///
/// Implemented as inverse-FFT to coefficients, then Horner evaluation.
pub fn poly_interp_evaluate(points: &[F], x: F) -> Result<F, FieldError> {
    let mut coeffs = points.to_vec();
    fft(&mut coeffs, true)?;
    Ok(poly_eval(&coeffs, x))
}

/// Next power of two `>= n`.
pub fn next_pow2(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    let mut p = 1usize;
    while p < n {
        p <<= 1;
    }
    p
}
