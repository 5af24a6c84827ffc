use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{clean_text, FeedDescriptor, FeedEntry};

/// Known entities to look for in entry text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Taxonomy {
    pub teams: Vec<String>,
    pub players: Vec<String>,
    pub leagues: Vec<String>,
}

/// Taxonomy lists derived for one entry. Sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagSet {
    pub tags: Vec<String>,
    pub players: Vec<String>,
    pub teams: Vec<String>,
    pub leagues: Vec<String>,
    pub countries: Vec<String>,
}

impl TagSet {
    pub fn derive(entry: &FeedEntry, feed: &FeedDescriptor, taxonomy: &Taxonomy, text: &str) -> Self {
        let haystack = format!("{} {}", entry.title, text).to_lowercase();

        let players = collect(matches(&haystack, &taxonomy.players));
        let matched_teams: Vec<&String> = matches(&haystack, &taxonomy.teams).collect();
        let leagues = collect(matches(&haystack, &taxonomy.leagues));
        let teams = collect(feed.team.iter().chain(matched_teams.iter().copied()));
        let tags = collect(
            entry
                .categories
                .iter()
                .chain(feed.tags.iter())
                .chain(matched_teams.iter().copied())
                .chain(players.iter())
                .chain(leagues.iter()),
        );
        let countries = collect(feed.country.iter());

        Self {
            tags,
            players,
            teams,
            leagues,
            countries,
        }
    }
}

fn matches<'a>(haystack: &'a str, names: &'a [String]) -> impl Iterator<Item = &'a String> + 'a {
    names
        .iter()
        .filter(move |name| mentions(haystack, &name.to_lowercase()))
}

fn collect<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .map(|v| clean_text(v))
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// Whole-word, already-lowercased containment.
fn mentions(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::mentions;

    #[test]
    fn mentions_requires_word_boundaries() {
        assert!(mentions("olympiacos beat real madrid", "real madrid"));
        assert!(!mentions("unreal madridista", "real madrid"));
        assert!(!mentions("anything", "  "));
    }
}
