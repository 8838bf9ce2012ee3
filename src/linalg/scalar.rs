//! Closed set of scalar types the kernels are instantiated for
//!
//! `f32`, `f64`, `Complex32` and `Complex64`. Dispatch is static: every kernel
//! is generic over [`Scalar`], so there is no runtime type inspection.

use num_complex::{Complex32, Complex64};
use num_traits::{Float, One, Zero};
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

pub trait Scalar:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
{
    type Real: RealScalar;

    /// Complex conjugate (identity for real types)
    fn conj(self) -> Self;

    /// |x|
    fn modulus(self) -> Self::Real;

    /// |x|²
    fn modulus_sqr(self) -> Self::Real;

    /// Real part
    fn re(self) -> Self::Real;

    fn from_real(r: Self::Real) -> Self;

    fn from_f64(v: f64) -> Self;

    /// Multiply by a real factor
    fn scale(self, r: Self::Real) -> Self;

    fn finite(self) -> bool;
}

pub trait RealScalar: Scalar<Real = Self> + Float {
    fn as_f64(self) -> f64;
}

impl Scalar for f32 {
    type Real = f32;
    #[inline]
    fn conj(self) -> Self { self }
    #[inline]
    fn modulus(self) -> f32 { self.abs() }
    #[inline]
    fn modulus_sqr(self) -> f32 { self * self }
    #[inline]
    fn re(self) -> f32 { self }
    #[inline]
    fn from_real(r: f32) -> Self { r }
    #[inline]
    fn from_f64(v: f64) -> Self { v as f32 }
    #[inline]
    fn scale(self, r: f32) -> Self { self * r }
    #[inline]
    fn finite(self) -> bool { f32::is_finite(self) }
}

impl RealScalar for f32 {
    #[inline]
    fn as_f64(self) -> f64 { self as f64 }
}

impl Scalar for f64 {
    type Real = f64;
    #[inline]
    fn conj(self) -> Self { self }
    #[inline]
    fn modulus(self) -> f64 { self.abs() }
    #[inline]
    fn modulus_sqr(self) -> f64 { self * self }
    #[inline]
    fn re(self) -> f64 { self }
    #[inline]
    fn from_real(r: f64) -> Self { r }
    #[inline]
    fn from_f64(v: f64) -> Self { v }
    #[inline]
    fn scale(self, r: f64) -> Self { self * r }
    #[inline]
    fn finite(self) -> bool { f64::is_finite(self) }
}

impl RealScalar for f64 {
    #[inline]
    fn as_f64(self) -> f64 { self }
}

impl Scalar for Complex32 {
    type Real = f32;
    #[inline]
    fn conj(self) -> Self { Complex32::new(self.re, -self.im) }
    #[inline]
    fn modulus(self) -> f32 { self.norm() }
    #[inline]
    fn modulus_sqr(self) -> f32 { self.norm_sqr() }
    #[inline]
    fn re(self) -> f32 { self.re }
    #[inline]
    fn from_real(r: f32) -> Self { Complex32::new(r, 0.0) }
    #[inline]
    fn from_f64(v: f64) -> Self { Complex32::new(v as f32, 0.0) }
    #[inline]
    fn scale(self, r: f32) -> Self { Complex32::new(self.re * r, self.im * r) }
    #[inline]
    fn finite(self) -> bool { self.re.is_finite() && self.im.is_finite() }
}

impl Scalar for Complex64 {
    type Real = f64;
    #[inline]
    fn conj(self) -> Self { Complex64::new(self.re, -self.im) }
    #[inline]
    fn modulus(self) -> f64 { self.norm() }
    #[inline]
    fn modulus_sqr(self) -> f64 { self.norm_sqr() }
    #[inline]
    fn re(self) -> f64 { self.re }
    #[inline]
    fn from_real(r: f64) -> Self { Complex64::new(r, 0.0) }
    #[inline]
    fn from_f64(v: f64) -> Self { Complex64::new(v, 0.0) }
    #[inline]
    fn scale(self, r: f64) -> Self { Complex64::new(self.re * r, self.im * r) }
    #[inline]
    fn finite(self) -> bool { self.re.is_finite() && self.im.is_finite() }
}
