//! Dense single-variable polynomials with exact rational coefficients.

use super::rational::Rational;

/// Highest degree the parser will build. Anything above is handed to the model.
pub const MAX_DEGREE: usize = 12;

/// Coefficients stored lowest power first, with no trailing zeros.
/// The zero polynomial has no coefficients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poly(Vec<Rational>);

impl Poly {
    pub fn zero() -> Self {
        Self(Vec::new())
    }

    pub fn constant(c: Rational) -> Self {
        Self::from_coeffs(vec![c])
    }

    /// The polynomial `x`.
    pub fn var() -> Self {
        Self(vec![Rational::ZERO, Rational::ONE])
    }

    pub fn from_coeffs(mut coeffs: Vec<Rational>) -> Self {
        while coeffs.last().is_some_and(|c| c.is_zero()) {
            coeffs.pop();
        }
        Self(coeffs)
    }

    pub fn coeffs(&self) -> &[Rational] {
        &self.0
    }

    /// `None` for the zero polynomial.
    pub fn degree(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    pub fn as_constant(&self) -> Option<Rational> {
        match self.0.len() {
            0 => Some(Rational::ZERO),
            1 => Some(self.0[0]),
            _ => None,
        }
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let len = self.0.len().max(other.0.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(Rational::ZERO);
            let b = other.0.get(i).copied().unwrap_or(Rational::ZERO);
            out.push(a.checked_add(b)?);
        }
        Some(Self::from_coeffs(out))
    }

    pub fn checked_neg(&self) -> Option<Self> {
        let coeffs = self
            .0
            .iter()
            .map(|c| c.checked_neg())
            .collect::<Option<Vec<_>>>()?;
        Some(Self(coeffs))
    }

    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.checked_add(&other.checked_neg()?)
    }

    pub fn checked_mul(&self, other: &Self) -> Option<Self> {
        if self.0.is_empty() || other.0.is_empty() {
            return Some(Self::zero());
        }
        let len = self.0.len() + other.0.len() - 1;
        if len - 1 > MAX_DEGREE {
            return None;
        }
        let mut out = vec![Rational::ZERO; len];
        for (i, a) in self.0.iter().enumerate() {
            for (j, b) in other.0.iter().enumerate() {
                out[i + j] = out[i + j].checked_add(a.checked_mul(*b)?)?;
            }
        }
        Some(Self::from_coeffs(out))
    }

    pub fn checked_div_const(&self, divisor: Rational) -> Option<Self> {
        let coeffs = self
            .0
            .iter()
            .map(|c| c.checked_div(divisor))
            .collect::<Option<Vec<_>>>()?;
        Some(Self::from_coeffs(coeffs))
    }

    pub fn checked_pow(&self, exp: u32) -> Option<Self> {
        let mut out = Self::constant(Rational::ONE);
        for _ in 0..exp {
            out = out.checked_mul(self)?;
        }
        Some(out)
    }

    pub fn eval(&self, x: Rational) -> Option<Rational> {
        self.0
            .iter()
            .rev()
            .try_fold(Rational::ZERO, |acc, c| acc.checked_mul(x)?.checked_add(*c))
    }

    /// Divides by `(x - root)`, assuming `root` is a root. Returns the quotient.
    pub fn deflate(&self, root: Rational) -> Option<Self> {
        let n = self.0.len();
        if n < 2 {
            return None;
        }
        let mut quotient = vec![Rational::ZERO; n - 1];
        let mut carry = Rational::ZERO;
        for i in (1..n).rev() {
            carry = carry.checked_mul(root)?.checked_add(self.0[i])?;
            quotient[i - 1] = carry;
        }
        Some(Self::from_coeffs(quotient))
    }

    /// Drops a factor of `x`, assuming the constant term is zero.
    pub fn shift_down(&self) -> Self {
        Self::from_coeffs(self.0.iter().skip(1).copied().collect())
    }
}
