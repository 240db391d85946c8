//! Renders root sets in the LaTeX list notation the frontend already displays,
//! e.g. `\left[ -1, \  \frac{1}{2}\right]`.

use super::rational::Rational;
use super::roots::Root;

pub fn render_roots(roots: &[Root]) -> String {
    let items: Vec<String> = roots.iter().map(render_root).collect();
    format!(r"\left[ {}\right]", items.join(r", \  "))
}

pub fn render_root(root: &Root) -> String {
    match root {
        Root::Rational(r) => render_rational(*r),
        Root::Surd {
            center,
            scale,
            radicand,
        } => {
            let term = render_surd(*scale, *radicand);
            let negative = scale.is_negative();
            match (center.is_zero(), negative) {
                (true, true) => format!("- {}", term),
                (true, false) => term,
                (false, true) => format!("{} - {}", render_rational(*center), term),
                (false, false) => format!("{} + {}", render_rational(*center), term),
            }
        }
    }
}

pub fn render_rational(r: Rational) -> String {
    if r.is_integer() {
        return r.numer().to_string();
    }
    let body = format!(r"\frac{{{}}}{{{}}}", r.numer().unsigned_abs(), r.denom());
    if r.is_negative() {
        format!("- {}", body)
    } else {
        body
    }
}

/// Renders `|scale| * sqrt(radicand)`; the caller supplies the sign.
fn render_surd(scale: Rational, radicand: i128) -> String {
    let unit = match radicand {
        -1 => "i".to_string(),
        r if r < 0 => format!(r"\sqrt{{{}}} i", r.unsigned_abs()),
        r => format!(r"\sqrt{{{}}}", r),
    };
    let num = scale.numer().unsigned_abs();
    let den = scale.denom();
    match (num, den) {
        (1, 1) => unit,
        (n, 1) => format!("{} {}", n, unit),
        (1, d) => format!(r"\frac{{{}}}{{{}}}", unit, d),
        (n, d) => format!(r"\frac{{{} {}}}{{{}}}", n, unit, d),
    }
}
