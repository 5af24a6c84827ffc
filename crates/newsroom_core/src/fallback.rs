use crate::{clean_text, truncate_chars, Language};

/// Characters of extracted text kept in a fallback body.
pub const FALLBACK_EXCERPT_CHARS: usize = 1000;

/// `<label> <source_name> (<link>)` in the target language.
pub fn attribution_line(language: Language, source_name: &str, link: &str) -> String {
    let label = language.attribution_label();
    if link.trim().is_empty() {
        format!("{label} {source_name}")
    } else {
        format!("{label} {source_name} ({})", link.trim())
    }
}

/// Minimal body built locally from title, excerpt and attribution.
///
/// Labels quoted in the feed text are removed from the excerpt, so the
/// appended `attribution` is the only one. Never empty.
pub fn fallback_body(language: Language, title: &str, text: &str, attribution: &str) -> String {
    let label = language.attribution_label();
    let title = remove_label(title.trim(), label);
    let text = strip_labels(text, label);
    let excerpt = truncate_chars(&text, FALLBACK_EXCERPT_CHARS).trim_end();
    let parts: Vec<&str> = [title.as_str(), excerpt]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    append_attribution(&parts.join("\n\n"), attribution)
}

/// Make the localized label appear exactly once, as the final attribution line.
///
/// A body whose only label sits in a last line equal to `attribution` is kept
/// as is. Otherwise stale attribution lines are dropped, labels quoted in
/// prose are removed and `attribution` is appended.
pub fn ensure_attribution(language: Language, body: &str, attribution: &str) -> String {
    let label = language.attribution_label();
    let body = body.trim();
    let ends_with_attribution = body.lines().last().map(str::trim) == Some(attribution.trim());
    if ends_with_attribution && body.matches(label).count() == 1 {
        return body.to_string();
    }
    append_attribution(&strip_attribution(language, body), attribution)
}

/// Body without attribution lines or labels, e.g. before it is translated.
pub fn strip_attribution(language: Language, body: &str) -> String {
    let label = language.attribution_label();
    let kept: Vec<String> = body
        .lines()
        .filter(|line| !is_attribution_line(line, label))
        .map(|line| remove_label(line, label))
        .collect();
    kept.join("\n").trim().to_string()
}

fn append_attribution(head: &str, attribution: &str) -> String {
    let head = head.trim();
    if head.is_empty() {
        attribution.to_string()
    } else {
        format!("{head}\n\n{attribution}")
    }
}

// `<label> <name>` or `<label> <name> (<link>)` on a line of its own.
fn is_attribution_line(line: &str, label: &str) -> bool {
    let Some(rest) = line.trim().strip_prefix(label) else {
        return false;
    };
    let rest = rest.trim();
    rest.is_empty()
        || !rest.contains(char::is_whitespace)
        || (rest.ends_with(')') && rest.contains(" (") && !rest.contains(". "))
}

fn strip_labels(text: &str, label: &str) -> String {
    let lines: Vec<String> = text.lines().map(|line| remove_label(line, label)).collect();
    lines.join("\n").trim().to_string()
}

fn remove_label(line: &str, label: &str) -> String {
    if line.contains(label) {
        clean_text(&line.replace(label, " "))
    } else {
        line.to_string()
    }
}
