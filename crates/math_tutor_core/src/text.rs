//! crates/math_tutor_core/src/text.rs
//!
//! Post-processing for model output: doubled math delimiters, markdown
//! headers, bullet markers and code fences are stripped before anything
//! reaches the frontend.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*#{1,6}[ \t]*").expect("valid header regex"));

static BULLET_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:[*•]|-)[ \t]+").expect("valid bullet regex"));

/// Turns every display or paren-style delimiter into a single `$`.
pub fn collapse_math_delimiters(text: &str) -> String {
    text.replace("$$", "$")
        .replace(r"\[", "$")
        .replace(r"\]", "$")
        .replace(r"\(", "$")
        .replace(r"\)", "$")
}

/// Drops leading `#` markers but keeps the heading text.
pub fn strip_markdown_headers(text: &str) -> String {
    HEADER_MARKERS.replace_all(text, "").into_owned()
}

/// Drops list markers at line start and lone `*` outside math, keeping
/// `**bold**` step markers intact.
pub fn strip_bullet_artifacts(text: &str) -> String {
    let without_bullets = BULLET_MARKERS.replace_all(text, "");
    let chars: Vec<char> = without_bullets.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut in_math = false;
    for (i, &c) in chars.iter().enumerate() {
        if c == '$' {
            in_math = !in_math;
        }
        if c == '*' && !in_math {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            if prev != Some('*') && next != Some('*') {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Unwraps a reply fenced in triple backticks, with or without a language tag.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
        .to_string()
}

/// `$x = 2$`, `$$x = 2$$` and `\[x = 2\]` all become `x = 2`.
pub fn strip_outer_math_delimiters(text: &str) -> String {
    let trimmed = text.trim();
    for (open, close) in [("$$", "$$"), (r"\[", r"\]"), (r"\(", r"\)"), ("$", "$")] {
        if let Some(inner) = trimmed
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            // `$a$ and $b$` is two inline spans, not one wrapped expression.
            if !inner.contains('$') {
                return inner.trim().to_string();
            }
        }
    }
    trimmed.to_string()
}

pub fn sanitize_explanation(text: &str) -> String {
    let collapsed = collapse_math_delimiters(text);
    let headerless = strip_markdown_headers(&collapsed);
    strip_bullet_artifacts(&headerless).trim().to_string()
}

pub fn sanitize_reply(text: &str) -> String {
    collapse_math_delimiters(text).trim().to_string()
}

pub fn clean_extracted_text(text: &str) -> String {
    collapse_math_delimiters(&strip_code_fences(text))
        .trim()
        .to_string()
}
