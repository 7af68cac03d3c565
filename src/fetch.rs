use std::sync::LazyLock;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SNIFF_LEN: usize = 1024;

/// `charset=` inside a `<meta charset>` or `http-equiv` Content-Type tag.
/// Byte-oriented so undecoded Latin-1 before the tag does not stop the match.
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:-]+)"#).unwrap()
});

/// Plain client: library-default headers, no timeouts, no retries.
pub fn client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .context("Failed to create HTTP client")
}

/// GET a page and return its decoded body. Non-2xx statuses are errors.
pub async fn fetch_page(client: &reqwest::Client, url: &Url) -> reqwest::Result<String> {
    let resp = client.get(url.clone()).send().await?.error_for_status()?;
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = resp.bytes().await?;
    Ok(decode_body(content_type.as_deref(), &bytes))
}

/// Decode with the header charset, else the `<meta>` charset, else UTF-8.
/// A byte-order mark wins over both.
pub fn decode_body(content_type: Option<&str>, bytes: &[u8]) -> String {
    let encoding = content_type
        .and_then(header_charset)
        .or_else(|| meta_charset(bytes))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    let caps = META_CHARSET.captures(head)?;
    Encoding::for_label(caps.get(1)?.as_bytes())
}

// ── Tests ──
