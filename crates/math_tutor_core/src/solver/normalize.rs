//! Rewrites typeset or OCR-flavoured math into the plain infix form the
//! parser accepts.

const REPLACEMENTS: &[(&str, &str)] = &[
    ("$", ""),
    (r"\(", ""),
    (r"\)", ""),
    (r"\[", ""),
    (r"\]", ""),
    (r"\left", ""),
    (r"\right", ""),
    (r"\times", "*"),
    (r"\cdot", "*"),
    (r"\div", "/"),
    (r"\dfrac", r"\frac"),
    (r"\tfrac", r"\frac"),
    (r"\,", " "),
    (r"\;", " "),
    (r"\!", ""),
    (r"\ ", " "),
    ("**", "^"),
    ("×", "*"),
    ("·", "*"),
    ("÷", "/"),
    ("−", "-"),
    ("²", "^2"),
    ("³", "^3"),
];

/// Returns `None` when a `\frac` is malformed.
pub fn normalize(text: &str) -> Option<String> {
    let mut out = text.to_string();
    for (from, to) in REPLACEMENTS {
        out = out.replace(from, to);
    }
    let out = expand_fracs(&out)?;
    Some(out.replace('{', "(").replace('}', ")"))
}

/// Rewrites each `\frac{a}{b}` as `((a)/(b))` in one left-to-right pass,
/// expanding the groups recursively.
fn expand_fracs(text: &str) -> Option<String> {
    const FRAC: &str = r"\frac";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(FRAC) {
        out.push_str(&rest[..start]);
        let (numer, after) = take_group(&rest[start + FRAC.len()..])?;
        let (denom, after) = take_group(after)?;
        out.push_str("((");
        out.push_str(&expand_fracs(numer)?);
        out.push_str(")/(");
        out.push_str(&expand_fracs(denom)?);
        out.push_str("))");
        rest = after;
    }
    out.push_str(rest);
    Some(out)
}

/// Splits a leading `{...}` group (after optional whitespace) off `text`.
fn take_group(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    for (i, c) in trimmed.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&trimmed[1..i], &trimmed[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}
