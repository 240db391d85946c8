//! Exact root finding for the polynomials the parser produces.

use std::cmp::Ordering;

use super::poly::Poly;
use super::rational::Rational;
use super::NotApplicable;

/// Largest magnitude we trial-divide when hunting rational roots or
/// extracting square factors.
const FACTOR_LIMIT: i128 = 1_000_000_000_000;

/// Most `(numerator, denominator)` divisor pairs one rational-root search
/// may try before giving up.
const CANDIDATE_BUDGET: usize = 20_000;

/// One exact root: `center + scale * sqrt(radicand)`.
///
/// `radicand` is square-free and never `0` or `1`; a negative radicand makes
/// the root complex. Rational roots use `Root::Rational` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    Rational(Rational),
    Surd {
        center: Rational,
        scale: Rational,
        radicand: i128,
    },
}

impl Root {
    #[cfg(test)]
    fn is_real(&self) -> bool {
        match self {
            Root::Rational(_) => true,
            Root::Surd { radicand, .. } => *radicand > 0,
        }
    }

    fn sort_key(&self) -> (bool, f64, f64) {
        match self {
            Root::Rational(r) => (false, r.to_f64(), 0.0),
            Root::Surd {
                center,
                scale,
                radicand,
            } => {
                let magnitude = (radicand.unsigned_abs() as f64).sqrt() * scale.to_f64();
                if *radicand > 0 {
                    (false, center.to_f64() + magnitude, 0.0)
                } else {
                    (true, center.to_f64(), magnitude)
                }
            }
        }
    }
}

/// Solves `poly = 0` exactly. Real roots come first in ascending order,
/// complex pairs after them.
pub fn solve(poly: &Poly) -> Result<Vec<Root>, NotApplicable> {
    let Some(degree) = poly.degree() else {
        // 0 = 0 holds for every value; there is no finite root set to report.
        return Err(NotApplicable::NoSolution);
    };
    if degree == 0 {
        return Err(NotApplicable::NoSolution);
    }

    let mut roots: Vec<Root> = Vec::new();
    let mut rest = poly.clone();

    if rest.coeffs()[0].is_zero() {
        roots.push(Root::Rational(Rational::ZERO));
        while rest.coeffs().first().is_some_and(|c| c.is_zero()) {
            rest = rest.shift_down();
        }
    }

    while rest.degree().is_some_and(|d| d > 2) {
        let root = find_rational_root(&rest)?.ok_or(NotApplicable::Unsupported)?;
        rest = rest.deflate(root).ok_or(NotApplicable::Unsupported)?;
        roots.push(Root::Rational(root));
    }

    match rest.degree() {
        Some(1) => roots.push(Root::Rational(solve_linear(&rest)?)),
        Some(2) => roots.extend(solve_quadratic(&rest)?),
        _ => {}
    }

    roots.sort_by(|a, b| {
        a.sort_key()
            .partial_cmp(&b.sort_key())
            .unwrap_or(Ordering::Equal)
    });
    roots.dedup();

    if roots.is_empty() {
        return Err(NotApplicable::NoSolution);
    }
    Ok(roots)
}

fn solve_linear(p: &Poly) -> Result<Rational, NotApplicable> {
    let c = p.coeffs();
    c[0].checked_neg()
        .and_then(|n| n.checked_div(c[1]))
        .ok_or(NotApplicable::Unsupported)
}

fn solve_quadratic(p: &Poly) -> Result<Vec<Root>, NotApplicable> {
    let c = p.coeffs();
    let (a, b, cc) = (c[2], c[1], c[0]);
    let overflow = || NotApplicable::Unsupported;

    let two_a = a.checked_mul(Rational::integer(2)).ok_or_else(overflow)?;
    let disc = b
        .checked_mul(b)
        .and_then(|bb| {
            a.checked_mul(cc)
                .and_then(|ac| ac.checked_mul(Rational::integer(4)))
                .and_then(|four_ac| bb.checked_sub(four_ac))
        })
        .ok_or_else(overflow)?;
    let center = b
        .checked_neg()
        .and_then(|nb| nb.checked_div(two_a))
        .ok_or_else(overflow)?;

    if disc.is_zero() {
        return Ok(vec![Root::Rational(center)]);
    }

    // sqrt(n/d) = sqrt(n*d) / d, then pull square factors out of n*d.
    let product = disc
        .numer()
        .checked_mul(disc.denom())
        .ok_or_else(overflow)?;
    let (outside, radicand) = split_square(product).ok_or_else(overflow)?;
    let scale = Rational::new(outside, disc.denom())
        .and_then(|s| s.checked_div(two_a))
        .and_then(|s| s.checked_abs())
        .ok_or_else(overflow)?;

    if radicand == 1 {
        let lo = center.checked_sub(scale).ok_or_else(overflow)?;
        let hi = center.checked_add(scale).ok_or_else(overflow)?;
        return Ok(vec![Root::Rational(lo), Root::Rational(hi)]);
    }

    let minus = scale.checked_neg().ok_or_else(overflow)?;
    Ok(vec![
        Root::Surd {
            center,
            scale: minus,
            radicand,
        },
        Root::Surd {
            center,
            scale,
            radicand,
        },
    ])
}

/// Writes `n` as `s^2 * r` with `r` square-free, keeping the sign on `r`.
fn split_square(n: i128) -> Option<(i128, i128)> {
    if n.unsigned_abs() > FACTOR_LIMIT as u128 {
        return None;
    }
    let sign = n.signum();
    let mut rest = n.abs();
    let (mut outside, mut inside) = (1i128, 1i128);
    let mut f = 2i128;
    while f * f <= rest {
        let mut exp = 0;
        while rest % f == 0 {
            rest /= f;
            exp += 1;
        }
        for _ in 0..exp / 2 {
            outside *= f;
        }
        if exp % 2 == 1 {
            inside *= f;
        }
        f += 1;
    }
    Some((outside, sign * inside * rest))
}

/// Rational root theorem over the integer-scaled coefficients.
fn find_rational_root(p: &Poly) -> Result<Option<Rational>, NotApplicable> {
    let ints = integer_coefficients(p).ok_or(NotApplicable::Unsupported)?;
    let content = ints.iter().fold(0, |acc, &c| gcd(acc, c));
    let (constant, leading) = match (ints.first(), ints.last()) {
        (Some(&c), Some(&l)) => (c / content, l / content),
        _ => return Ok(None),
    };
    if constant.abs() > FACTOR_LIMIT || leading.abs() > FACTOR_LIMIT {
        return Err(NotApplicable::Unsupported);
    }
    let denominators = divisors(leading);
    let numerators = divisors(constant);
    if denominators.len().saturating_mul(numerators.len()) > CANDIDATE_BUDGET {
        return Err(NotApplicable::Unsupported);
    }
    for &q in &denominators {
        for &num in &numerators {
            for candidate in [num, -num] {
                let Some(r) = Rational::new(candidate, q) else {
                    continue;
                };
                if p.eval(r).is_some_and(|v| v.is_zero()) {
                    return Ok(Some(r));
                }
            }
        }
    }
    Ok(None)
}

fn integer_coefficients(p: &Poly) -> Option<Vec<i128>> {
    let mut lcm: i128 = 1;
    for c in p.coeffs() {
        let d = c.denom();
        let g = gcd(lcm, d);
        lcm = (lcm / g).checked_mul(d)?;
    }
    p.coeffs()
        .iter()
        .map(|c| c.numer().checked_mul(lcm / c.denom()))
        .collect()
}

fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs().max(1)
}

fn divisors(n: i128) -> Vec<i128> {
    let n = n.abs();
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1i128;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d != n / d {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    small
}
