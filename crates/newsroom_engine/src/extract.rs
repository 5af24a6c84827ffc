use newsroom_core::clean_text;
use scraper::{ElementRef, Html, Selector};

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "iframe", "template"];
const MIN_ARTICLE_PARAGRAPH_CHARS: usize = 40;

/// What a separately fetched article page contributes to an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticlePage {
    /// Main text: the long paragraphs of the page.
    pub text: String,
    /// Social-preview image (`og:image`, then `twitter:image`).
    pub preview_image: Option<String>,
}

/// Plain text of a feed summary/content fragment.
///
/// Paragraph-like blocks are joined with blank lines; fragments without any
/// fall back to their whole text.
pub fn extract_feed_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let blocks = select_blocks(&fragment, "p, li");
    let blocks = if blocks.is_empty() {
        select_blocks(&fragment, "div")
    } else {
        blocks
    };
    if blocks.is_empty() {
        visible_text(fragment.root_element())
    } else {
        blocks.join("\n\n")
    }
}

/// `src` of the first `<img>` in a feed fragment, unresolved.
pub fn first_inline_image(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").ok()?;
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Main text and social-preview image of a full article page.
pub fn extract_article(html: &str) -> ArticlePage {
    let doc = Html::parse_document(html);
    let paragraphs: Vec<String> = Selector::parse("p")
        .map(|sel| {
            doc.select(&sel)
                .map(visible_text)
                .filter(|p| p.chars().count() > MIN_ARTICLE_PARAGRAPH_CHARS)
                .collect()
        })
        .unwrap_or_default();

    ArticlePage {
        text: paragraphs.join("\n\n"),
        preview_image: preview_image(&doc),
    }
}

fn preview_image(doc: &Html) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        r#"meta[property="og:image"]"#,
        r#"meta[name="og:image"]"#,
        r#"meta[property="og:image:url"]"#,
        r#"meta[name="twitter:image"]"#,
        r#"meta[property="twitter:image"]"#,
    ];
    CANDIDATES.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        doc.select(&selector)
            .filter_map(|meta| meta.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}

fn select_blocks(fragment: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    fragment
        .select(&selector)
        .map(visible_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| SKIPPED_TAGS.contains(&a.value().name()));
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    clean_text(&out)
}
