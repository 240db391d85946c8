//! crates/math_tutor_core/src/solver/mod.rs
//!
//! The symbolic solver adapter. It tries an exact solve of a single-unknown
//! polynomial equality and otherwise reports `NotApplicable`, which tells the
//! caller to fall back to the completion model. It never returns an error.

mod latex;
mod normalize;
mod parser;
mod poly;
mod rational;
mod roots;

use std::fmt;

use tracing::debug;

pub use latex::render_roots;
pub use rational::Rational;
pub use roots::Root;

/// Why the solver declined a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApplicable {
    /// The text holds no single `=`.
    NoEquality,
    /// The text could not be read as a polynomial in one unknown, or the
    /// polynomial is outside what can be solved exactly.
    Unsupported,
    /// The equality has an empty (or unbounded) solution set.
    NoSolution,
}

impl fmt::Display for NotApplicable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            NotApplicable::NoEquality => "no single equality",
            NotApplicable::Unsupported => "unsupported expression",
            NotApplicable::NoSolution => "empty solution set",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolicOutcome {
    Solved {
        variable: char,
        roots: Vec<Root>,
        latex: String,
    },
    NotApplicable(NotApplicable),
}

#[cfg(test)]
impl SymbolicOutcome {
    fn latex(&self) -> Option<&str> {
        match self {
            SymbolicOutcome::Solved { latex, .. } => Some(latex),
            SymbolicOutcome::NotApplicable(_) => None,
        }
    }
}

/// Attempts an exact solve of `text` for its single unknown.
pub fn solve_equation(text: &str) -> SymbolicOutcome {
    match try_solve(text) {
        Ok((variable, roots)) => {
            let latex = render_roots(&roots);
            SymbolicOutcome::Solved {
                variable,
                roots,
                latex,
            }
        }
        Err(reason) => {
            debug!(%reason, "symbolic solver declined problem");
            SymbolicOutcome::NotApplicable(reason)
        }
    }
}

/// Longest input the solver will look at. Anything longer goes to the model.
pub const MAX_EQUATION_LEN: usize = 4096;

fn try_solve(text: &str) -> Result<(char, Vec<Root>), NotApplicable> {
    if text.len() > MAX_EQUATION_LEN {
        return Err(NotApplicable::Unsupported);
    }
    let normalized = normalize::normalize(text).ok_or(NotApplicable::Unsupported)?;

    let sides: Vec<&str> = normalized.split('=').collect();
    let [lhs, rhs] = sides.as_slice() else {
        return Err(NotApplicable::NoEquality);
    };

    let lhs = parser::tokenize(lhs).ok_or(NotApplicable::Unsupported)?;
    let rhs = parser::tokenize(rhs).ok_or(NotApplicable::Unsupported)?;

    let mut symbols = parser::symbols(&lhs);
    symbols.extend(parser::symbols(&rhs));
    let variable = match symbols.len() {
        1 => symbols.into_iter().next().ok_or(NotApplicable::Unsupported)?,
        _ => return Err(NotApplicable::Unsupported),
    };

    let lhs = parser::parse_polynomial(&lhs).ok_or(NotApplicable::Unsupported)?;
    let rhs = parser::parse_polynomial(&rhs).ok_or(NotApplicable::Unsupported)?;
    let difference = lhs.checked_sub(&rhs).ok_or(NotApplicable::Unsupported)?;

    let roots = roots::solve(&difference)?;
    Ok((variable, roots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn latex_of(text: &str) -> Option<String> {
        solve_equation(text).latex().map(str::to_string)
    }

    #[test]
    fn text_without_equality_is_not_applicable() {
        for text in ["2*x + 3", "", "what is the derivative of x^2?", "x > 3"] {
            assert_eq!(
                solve_equation(text),
                SymbolicOutcome::NotApplicable(NotApplicable::NoEquality),
                "input: {text:?}"
            );
        }
    }

    #[test]
    fn solves_simple_linear_equation() {
        match solve_equation("2*x + 3 = 7") {
            SymbolicOutcome::Solved {
                variable,
                roots,
                latex,
            } => {
                assert_eq!(variable, 'x');
                assert_eq!(roots, vec![Root::Rational(Rational::integer(2))]);
                assert_eq!(latex, r"\left[ 2\right]");
            }
            other => panic!("expected a solution, got {other:?}"),
        }
    }

    #[test]
    fn accepts_typeset_input() {
        assert_eq!(
            latex_of(r"$x^{2} - 5x + 6 = 0$").as_deref(),
            Some(r"\left[ 2, \  3\right]")
        );
        assert_eq!(
            latex_of(r"\frac{x}{2} + 1 = 4").as_deref(),
            Some(r"\left[ 6\right]")
        );
    }

    #[test]
    fn solves_for_any_single_letter() {
        match solve_equation("3y = 12") {
            SymbolicOutcome::Solved { variable, .. } => assert_eq!(variable, 'y'),
            other => panic!("expected a solution, got {other:?}"),
        }
    }

    #[test]
    fn empty_solution_set_falls_through() {
        assert_eq!(
            solve_equation("x + 1 = x + 2"),
            SymbolicOutcome::NotApplicable(NotApplicable::NoSolution)
        );
        assert_eq!(
            solve_equation("2x = 2x"),
            SymbolicOutcome::NotApplicable(NotApplicable::NoSolution)
        );
    }

    #[test]
    fn word_problems_and_functions_fall_through() {
        for text in [
            "A train leaves at 3pm = how fast?",
            r"\sin(x) = 1",
            "x + y = 3",
            "x = 1 = 2",
        ] {
            assert!(
                matches!(solve_equation(text), SymbolicOutcome::NotApplicable(_)),
                "input: {text:?}"
            );
        }
    }

    #[test]
    fn overlong_input_is_declined_before_parsing() {
        let text = format!("{}x = 1", r"\frac{1}{2}+".repeat(MAX_EQUATION_LEN));
        assert_eq!(
            solve_equation(&text),
            SymbolicOutcome::NotApplicable(NotApplicable::Unsupported)
        );
    }

    #[test]
    fn huge_cubic_coefficients_decline_quickly() {
        let started = std::time::Instant::now();
        for text in [
            "963761198400x^3 + 963761198400x + 963761198400 = 0",
            "963761198400x^3 + x + 963761198400 = 0",
        ] {
            assert_eq!(
                solve_equation(text),
                SymbolicOutcome::NotApplicable(NotApplicable::Unsupported),
                "input: {text:?}"
            );
        }
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn common_factor_does_not_hide_rational_roots() {
        // 720720 (x^3 - 6x^2 + 11x - 6)
        assert_eq!(
            latex_of("720720x^3 - 4324320x^2 + 7927920x - 4324320 = 0").as_deref(),
            Some(r"\left[ 1, \  2, \  3\right]")
        );
    }

    #[test]
    fn renders_irrational_and_complex_roots() {
        assert_eq!(
            latex_of("x^2 = 2").as_deref(),
            Some(r"\left[ - \sqrt{2}, \  \sqrt{2}\right]")
        );
        assert_eq!(
            latex_of("x^2 + 1 = 0").as_deref(),
            Some(r"\left[ - i, \  i\right]")
        );
    }
}
