use newsroom_core::{
    normalize_slug, short_hash, Deduplicator, FeedEntry, Fingerprint, SeenStore, SlugAllocator,
};
use pretty_assertions::assert_eq;

fn entry(link: &str, title: &str) -> FeedEntry {
    FeedEntry {
        link: link.to_string(),
        title: title.to_string(),
        ..FeedEntry::default()
    }
}

#[test]
fn fingerprint_is_stable_and_link_based() {
    engine_logging::initialize_for_tests();
    let a = Fingerprint::of(&entry("https://a.test/1", "Team X wins"), "https://feed");
    let b = Fingerprint::of(&entry("https://a.test/1", "Retitled later"), "https://other");
    assert_eq!(a, b);
    assert_eq!(a.as_str(), short_hash("https://a.test/1", 24));
    assert_eq!(a.as_str().len(), 24);
}

#[test]
fn fingerprint_falls_back_to_title_then_feed() {
    let by_title = Fingerprint::of(&entry("", "Only a title"), "https://feed");
    assert_eq!(by_title.as_str(), short_hash("Only a title", 24));
    let by_feed = Fingerprint::of(&entry(" ", ""), "https://feed");
    assert_eq!(by_feed.as_str(), short_hash("https://feed", 24));
}

#[test]
fn deduplicator_marks_and_recognises_entries() {
    let mut store = SeenStore::new();
    let item = entry("https://a.test/1", "  Team   X wins ");
    {
        let mut dedup = Deduplicator::new(&mut store);
        dedup.set_feed("https://feed");
        assert!(dedup.is_new(&item));
        dedup.mark_seen(&item, "team-x-wins", 1_700_000_000);
        assert!(!dedup.is_new(&item));
    }
    assert_eq!(store.len(), 1);
    let (_, record) = store.records().next().unwrap();
    assert_eq!(record.title, "Team X wins");
    assert_eq!(record.slug, "team-x-wins");
    assert_eq!(record.ts, 1_700_000_000);
}

#[test]
fn seen_store_serializes_under_seen_key() {
    let mut store = SeenStore::new();
    Deduplicator::new(&mut store).mark_seen(&entry("https://a.test/1", "T"), "t", 5);
    let json = serde_json::to_value(&store).unwrap();
    let fp = short_hash("https://a.test/1", 24);
    assert_eq!(json["seen"][fp.as_str()]["slug"], "t");
    assert_eq!(json["seen"][fp.as_str()]["ts"], 5);

    let back: SeenStore = serde_json::from_value(json).unwrap();
    assert_eq!(back, store);
    let empty: SeenStore = serde_json::from_str("{}").unwrap();
    assert!(empty.is_empty());
}

#[test]
fn slugs_are_ascii_folded_and_lowercase() {
    assert_eq!(normalize_slug("Team X wins!"), "team-x-wins");
    let greek = normalize_slug("Ολυμπιακός νίκησε");
    assert!(greek.is_ascii() && greek.starts_with("ol") && greek.contains('-'), "{greek}");
    assert_eq!(greek, greek.to_ascii_lowercase());
    assert_eq!(normalize_slug("Crème brûlée -- déjà vu"), "creme-brulee-deja-vu");
    assert_eq!(normalize_slug("!!!"), "news");
}

#[test]
fn collisions_get_a_link_hash_suffix() {
    let mut slugs = SlugAllocator::default();
    let first = slugs.allocate("Team X wins", "https://a.test/1");
    let second = slugs.allocate("Team X wins", "https://b.test/2");
    assert_eq!(first, "team-x-wins");
    assert_eq!(second, format!("team-x-wins-{}", short_hash("https://b.test/2", 6)));
}

#[test]
fn suffix_does_not_depend_on_processing_order() {
    let mut forward = SlugAllocator::from_existing(vec![("team-x-wins".to_string(), None)]);
    let mut reverse = SlugAllocator::from_existing(vec![("team-x-wins".to_string(), None)]);
    let a1 = forward.allocate("Team X wins", "https://a.test/1");
    let b1 = forward.allocate("Team X wins", "https://b.test/2");
    let b2 = reverse.allocate("Team X wins", "https://b.test/2");
    let a2 = reverse.allocate("Team X wins", "https://a.test/1");
    assert_eq!(a1, a2);
    assert_eq!(b1, b2);
    assert_ne!(a1, b1);
}

#[test]
fn entry_reuses_a_slug_it_already_owns() {
    let mut slugs = SlugAllocator::from_existing(vec![(
        "team-x-wins".to_string(),
        Some("https://a.test/1".to_string()),
    )]);
    assert_eq!(slugs.allocate("Team X wins", "https://a.test/1"), "team-x-wins");
    assert_ne!(slugs.allocate("Team X wins", "https://b.test/2"), "team-x-wins");
}

#[test]
fn slug_candidate_falls_back_to_link_then_placeholder() {
    let mut slugs = SlugAllocator::default();
    assert_eq!(slugs.allocate("", "https://a.test/story/1"), "https-a-test-story-1");
    assert_eq!(slugs.allocate("  ", "  "), "news");
    let again = slugs.allocate("", "");
    assert!(again.starts_with("news-"));
    assert_ne!(slugs.allocate("", ""), again);
}

#[test]
fn many_distinct_entries_never_share_a_slug() {
    let mut slugs = SlugAllocator::default();
    let mut seen = std::collections::HashSet::new();
    for i in 0..200 {
        let slug = slugs.allocate("Same headline", &format!("https://a.test/{i}"));
        assert!(seen.insert(slug), "duplicate slug at {i}");
    }
}
