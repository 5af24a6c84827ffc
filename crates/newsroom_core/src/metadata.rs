use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverDescriptor {
    pub image: String,
    pub alt: String,
    pub caption: String,
}

/// Front matter of one output document. The field set is fixed; both
/// languages go through [`render_document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMetadata {
    pub title: String,
    pub date: String,
    pub draft: bool,
    pub description: String,
    pub source: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub players: Vec<String>,
    pub teams: Vec<String>,
    pub leagues: Vec<String>,
    pub countries: Vec<String>,
    pub topics: Vec<String>,
    pub kind: String,
    pub cover: Option<CoverDescriptor>,
}

impl Default for PostMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            date: String::new(),
            draft: false,
            description: String::new(),
            source: String::new(),
            categories: vec!["news".to_string()],
            tags: Vec::new(),
            players: Vec::new(),
            teams: Vec::new(),
            leagues: Vec::new(),
            countries: Vec::new(),
            topics: Vec::new(),
            kind: "posts".to_string(),
            cover: None,
        }
    }
}

/// YAML front matter followed by the body. Output is a pure function of the
/// inputs, so rewriting unchanged inputs yields identical bytes.
pub fn render_document(meta: &PostMetadata, body: &str) -> String {
    let mut out = String::from("---\n");
    push_scalar(&mut out, "title", &meta.title);
    push_scalar(&mut out, "date", &meta.date);
    let _ = writeln!(out, "draft: {}", meta.draft);
    push_scalar(&mut out, "description", &meta.description);
    push_scalar(&mut out, "source", &meta.source);
    push_list(&mut out, "categories", &meta.categories);
    push_list(&mut out, "tags", &meta.tags);
    push_list(&mut out, "players", &meta.players);
    push_list(&mut out, "teams", &meta.teams);
    push_list(&mut out, "leagues", &meta.leagues);
    push_list(&mut out, "countries", &meta.countries);
    push_list(&mut out, "topics", &meta.topics);
    push_scalar(&mut out, "type", &meta.kind);
    if let Some(cover) = &meta.cover {
        out.push_str("cover:\n");
        push_scalar(&mut out, "  image", &cover.image);
        push_scalar(&mut out, "  alt", &cover.alt);
        push_scalar(&mut out, "  caption", &cover.caption);
    }
    out.push_str("---\n\n");
    out.push_str(body.trim());
    out.push('\n');
    out
}

fn push_scalar(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "{key}: {}", quote(value));
}

fn push_list(out: &mut String, key: &str, values: &[String]) {
    let items: Vec<String> = values.iter().map(|v| quote(v)).collect();
    let _ = writeln!(out, "{key}: [{}]", items.join(", "));
}

// YAML double-quoted scalar.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(quoted, "\\u{:04x}", c as u32);
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Reads the `source` field back out of a rendered document, if present.
pub fn read_source_field(content: &str) -> Option<String> {
    let mut lines = content.lines();
    if lines.next() != Some("---") {
        return None;
    }
    for line in lines {
        if line.trim() == "---" {
            break;
        }
        if let Some(value) = line.strip_prefix("source:") {
            let value = unquote(value.trim());
            return (!value.is_empty()).then_some(value);
        }
    }
    None
}
