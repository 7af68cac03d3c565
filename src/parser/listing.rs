use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

/// Labels and markers that tell thread links apart from navigation.
#[derive(Debug, Clone)]
pub struct ListingLabels {
    pub link_marker: String,
    pub next_label: String,
    pub previous_label: String,
}

/// One anchor kept by the forum-link filter.
#[derive(Debug, Clone)]
struct ForumAnchor {
    href: String,
    text: String,
}

/// Parse of a single listing page.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub thread_links: Vec<Url>,
    pub next_page: Option<Url>,
}

/// Anchors whose target contains `marker` and that are not icon-only.
fn forum_anchors(doc: &Html, marker: &str) -> Vec<ForumAnchor> {
    doc.select(&ANCHOR)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            if !href.contains(marker) || has_image(&a) {
                return None;
            }
            Some(ForumAnchor {
                href: href.to_string(),
                text: a.text().collect(),
            })
        })
        .collect()
}

fn has_image(anchor: &ElementRef) -> bool {
    anchor.select(&IMG).next().is_some()
}

/// First anchor whose whole text equals `name`, resolved against `base`.
pub fn find_section_link(html: &str, base: &Url, name: &str) -> Option<Url> {
    let doc = Html::parse_document(html);
    doc.select(&ANCHOR)
        .find(|a| a.text().collect::<String>() == name)
        .and_then(|a| base.join(a.value().attr("href")?).ok())
}

/// First forum anchor of a section page: the sub-forum listing to walk.
pub fn first_forum_link(html: &str, base: &Url, marker: &str) -> Option<Url> {
    let doc = Html::parse_document(html);
    forum_anchors(&doc, marker)
        .into_iter()
        .find_map(|a| base.join(&a.href).ok())
}

/// Split a listing page into thread links and the pagination-forward link.
///
/// Only the last forum anchor can be the forward link, and only when its text
/// carries the "next" label. Anchors labelled "previous" or "next" are never
/// thread links. A page without forum anchors has no forward link.
pub fn parse_listing(html: &str, page_url: &Url, labels: &ListingLabels) -> ListingPage {
    let doc = Html::parse_document(html);
    let anchors = forum_anchors(&doc, &labels.link_marker);

    let next_page = anchors
        .last()
        .filter(|a| a.text.contains(&labels.next_label))
        .and_then(|a| page_url.join(&a.href).ok());

    let thread_links = anchors
        .iter()
        .filter(|a| !a.text.contains(&labels.previous_label) && !a.text.contains(&labels.next_label))
        .filter_map(|a| page_url.join(&a.href).ok())
        .collect();

    ListingPage {
        thread_links,
        next_page,
    }
}

// ── Tests ──
