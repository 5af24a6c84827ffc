use url::Url;

/// Collapse every whitespace run to a single space and trim.
pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(input: &str, max_chars: usize) -> &str {
    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => &input[..idx],
        None => input,
    }
}

/// Human-readable publisher name: the entry host without `www.`, then the
/// feed host, then a literal placeholder.
pub fn source_name(link: &str, feed_url: &str) -> String {
    [link, feed_url]
        .iter()
        .filter_map(|candidate| Url::parse(candidate).ok())
        .find_map(|url| url.host_str().map(str::to_string))
        .map(|host| host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
        .unwrap_or_else(|| "source".to_string())
}
