// ========================================================================================
//                             Single-precision complex samples
// ========================================================================================
//
// The quadrature (IQ) samples produced by the acquisition hardware, and everything the
// kernel computes from them, are plain float32 complex numbers. This type is the whole
// numeric vocabulary of the engine: componentwise add/sub, the standard complex product,
// and the magnitude. No normalization, no NaN scrubbing; IEEE-754 arithmetic propagates
// whatever the inputs contain.

use std::ops::{Add, Mul, Sub};

/// A float32 complex number, laid out as two consecutive floats so that a
/// `&[Complex32]` is byte-compatible with the interleaved re/im buffers the
/// acquisition side hands over.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Complex32 {
    pub re: f32,
    pub im: f32,
}

impl Complex32 {
    pub const ZERO: Complex32 = Complex32 { re: 0.0, im: 0.0 };

    #[inline(always)]
    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    /// Lifts a real scalar into the complex plane. The interpolation weights are
    /// real-valued but participate in complex products, so they pass through here.
    #[inline(always)]
    pub const fn from_real(re: f32) -> Self {
        Self { re, im: 0.0 }
    }

    /// `sqrt(re^2 + im^2)`, computed exactly in that form. Downstream envelope
    /// detection depends on this matching the plain expression, so this is
    /// deliberately not `f32::hypot`.
    #[inline(always)]
    pub fn magnitude(self) -> f32 {
        (self.re * self.re + self.im * self.im).sqrt()
    }
}

impl Add for Complex32 {
    type Output = Complex32;

    #[inline(always)]
    fn add(self, rhs: Complex32) -> Complex32 {
        Complex32 {
            re: self.re + rhs.re,
            im: self.im + rhs.im,
        }
    }
}

impl Sub for Complex32 {
    type Output = Complex32;

    #[inline(always)]
    fn sub(self, rhs: Complex32) -> Complex32 {
        Complex32 {
            re: self.re - rhs.re,
            im: self.im - rhs.im,
        }
    }
}

impl Mul for Complex32 {
    type Output = Complex32;

    /// The standard complex product: `(ac - bd) + (ad + bc)i`.
    #[inline(always)]
    fn mul(self, rhs: Complex32) -> Complex32 {
        Complex32 {
            re: self.re * rhs.re - self.im * rhs.im,
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}
