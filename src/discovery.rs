use anyhow::{anyhow, Context, Result};
use tracing::{debug, info};
use url::Url;

use crate::config::ScrapeSettings;
use crate::fetch::fetch_page;
use crate::parser::listing::{self, ListingLabels};

/// Walk the forum listing and return thread URLs in page order.
///
/// Visits at most `page_budget` listing pages and stops early on the first
/// page whose last forum anchor is not a "next" link. Duplicates are kept.
/// Any fetch or structural failure is fatal.
pub async fn discover_thread_links(
    client: &reqwest::Client,
    settings: &ScrapeSettings,
) -> Result<Vec<Url>> {
    let base = Url::parse(&settings.base_url)
        .with_context(|| format!("Invalid base URL {}", settings.base_url))?;

    info!("Fetching forum index: {}", base);
    let index_html = fetch_page(client, &base)
        .await
        .context("Failed to fetch forum index")?;
    let section_url = listing::find_section_link(&index_html, &base, &settings.section_name)
        .ok_or_else(|| anyhow!("No {:?} section link on {}", settings.section_name, base))?;

    info!("Fetching section {:?}: {}", settings.section_name, section_url);
    let section_html = fetch_page(client, &section_url)
        .await
        .context("Failed to fetch forum section")?;
    let listing_url = listing::first_forum_link(&section_html, &section_url, &settings.link_marker)
        .ok_or_else(|| anyhow!("No forum listing link on {}", section_url))?;

    let labels = ListingLabels {
        link_marker: settings.link_marker.clone(),
        next_label: settings.next_label.clone(),
        previous_label: settings.previous_label.clone(),
    };
    let links = walk_listing(client, listing_url, &labels, settings.page_budget).await?;

    let before = links.len();
    let links: Vec<Url> = links
        .into_iter()
        .filter(|u| !u.as_str().ends_with(&settings.quote_view_suffix))
        .collect();
    debug!("Dropped {} quote-view links", before - links.len());

    info!("Collected {} thread links", links.len());
    Ok(links)
}

/// Follow "next" links from `start`, at most `page_budget` pages.
pub async fn walk_listing(
    client: &reqwest::Client,
    start: Url,
    labels: &ListingLabels,
    page_budget: usize,
) -> Result<Vec<Url>> {
    let mut links = Vec::new();
    let mut page_url = start;
    let mut remaining = page_budget;

    while remaining > 0 {
        let html = fetch_page(client, &page_url)
            .await
            .with_context(|| format!("Failed to fetch listing page {}", page_url))?;
        let page = listing::parse_listing(&html, &page_url, labels);
        remaining -= 1;

        info!(
            "Listing page {}: {} thread links",
            page_url,
            page.thread_links.len()
        );
        links.extend(page.thread_links);

        match page.next_page {
            Some(next) => page_url = next,
            None => break,
        }
    }

    Ok(links)
}

// ── Tests ──
