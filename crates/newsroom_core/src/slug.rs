use std::collections::HashMap;

use crate::short_hash;

pub const MAX_SLUG_LEN: usize = 80;
const FALLBACK_SLUG: &str = "news";
const SUFFIX_HEX_LEN: usize = 6;
const MAX_SUFFIX_HEX_LEN: usize = 64;

/// URL-safe token: ASCII-folded, lowercase, `-` separated, length-bounded.
pub fn normalize_slug(candidate: &str) -> String {
    let folded = deunicode::deunicode(candidate).to_ascii_lowercase();
    let mut slug = String::with_capacity(folded.len());
    let mut prev_dash = true;
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let slug = slug.trim_matches('-');
    let bounded = bound_length(slug).trim_matches('-');
    if bounded.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        bounded.to_string()
    }
}

// Cut at the last word boundary that fits; `slug` is pure ASCII here.
fn bound_length(slug: &str) -> &str {
    if slug.len() <= MAX_SLUG_LEN {
        return slug;
    }
    let cut = &slug[..MAX_SLUG_LEN];
    if slug.as_bytes()[MAX_SLUG_LEN] == b'-' {
        return cut;
    }
    match cut.rfind('-') {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut,
    }
}

/// Hands out slugs that are unique within the output namespace.
///
/// Each used slug remembers the entry link it was written for (when known),
/// so an entry retried after a partial failure gets its old slug back.
#[derive(Debug, Clone, Default)]
pub struct SlugAllocator {
    used: HashMap<String, Option<String>>,
}

impl SlugAllocator {
    /// Seeds the working set from documents already present on disk.
    pub fn from_existing<I>(existing: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let mut used = HashMap::new();
        for (slug, owner) in existing {
            let slot = used.entry(slug).or_insert(None);
            if slot.is_none() {
                *slot = owner.filter(|o: &String| !o.is_empty());
            }
        }
        Self { used }
    }

    /// Picks the slug for an entry and reserves it.
    ///
    /// The base comes from the title, then the link, then a placeholder. On a
    /// collision with another entry the base gets a suffix derived from the
    /// link hash, so the result does not depend on processing order.
    pub fn allocate(&mut self, title: &str, link: &str) -> String {
        let title = title.trim();
        let link = link.trim();
        let candidate = if !title.is_empty() {
            title
        } else if !link.is_empty() {
            link
        } else {
            FALLBACK_SLUG
        };
        let base = normalize_slug(candidate);
        let owner = (!link.is_empty()).then(|| link.to_string());
        let hash_basis = if link.is_empty() { candidate } else { link };

        if self.is_available(&base, owner.as_deref()) {
            return self.reserve(base, owner);
        }
        for len in SUFFIX_HEX_LEN..=MAX_SUFFIX_HEX_LEN {
            let slug = format!("{base}-{}", short_hash(hash_basis, len));
            if self.is_available(&slug, owner.as_deref()) {
                return self.reserve(slug, owner);
            }
        }
        let slug = format!("{base}-{}", short_hash(hash_basis, MAX_SUFFIX_HEX_LEN));
        self.reserve(slug, owner)
    }

    fn is_available(&self, slug: &str, owner: Option<&str>) -> bool {
        match self.used.get(slug) {
            None => true,
            Some(existing) => owner.is_some() && existing.as_deref() == owner,
        }
    }

    fn reserve(&mut self, slug: String, owner: Option<String>) -> String {
        self.used.insert(slug.clone(), owner);
        slug
    }
}
