use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

use super::text::{extract_title, split_dated_body, strip_footer};
use crate::config::ThreadSettings;
use crate::corpus::Message;

static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static AUTHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span.bold").unwrap());
static BODY_CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td.text").unwrap());

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("page has no <body>")]
    MissingBody,
    #[error("no thread title after {0:?}")]
    MissingTitle(String),
    #[error("message table (table #{0} of the body) not found")]
    MissingMessageTable(usize),
    #[error("message row has no body cell")]
    MissingBodyCell,
    #[error("message body has no post date")]
    MissingDate,
}

/// Compiled markers of the thread page template.
#[derive(Debug, Clone)]
pub struct ThreadMarkers {
    pub title_marker: String,
    pub date_re: Regex,
    pub signature_marker: String,
    pub edited_marker: String,
    pub message_table_index: usize,
}

impl ThreadMarkers {
    pub fn from_settings(s: &ThreadSettings) -> Result<Self, regex::Error> {
        Ok(ThreadMarkers {
            title_marker: s.title_marker.clone(),
            date_re: Regex::new(&s.date_pattern)?,
            signature_marker: s.signature_marker.clone(),
            edited_marker: s.edited_marker.clone(),
            message_table_index: s.message_table_index,
        })
    }
}

/// Messages read from one thread page, and the failure that stopped the read.
#[derive(Debug, Default)]
pub struct ParsedThread {
    pub messages: Vec<Message>,
    pub error: Option<ParseError>,
}

/// Extract the messages of a thread page, row by row.
///
/// Rows without an author element are not messages. A message whose body is
/// empty after trimming is dropped. A structural failure stops the read; the
/// messages of the rows before it are kept.
pub fn parse_thread(html: &str, markers: &ThreadMarkers) -> ParsedThread {
    let mut messages = Vec::new();
    let error = read_messages(html, markers, &mut messages).err();
    ParsedThread { messages, error }
}

fn read_messages(
    html: &str,
    markers: &ThreadMarkers,
    out: &mut Vec<Message>,
) -> Result<(), ParseError> {
    let doc = Html::parse_document(html);
    let body = doc.select(&BODY).next().ok_or(ParseError::MissingBody)?;

    let body_text: String = body.text().collect();
    let title = extract_title(&body_text, &markers.title_marker)
        .ok_or_else(|| ParseError::MissingTitle(markers.title_marker.clone()))?;

    let container = message_container(body, markers.message_table_index)
        .ok_or(ParseError::MissingMessageTable(markers.message_table_index))?;

    for row in direct_rows(container) {
        let Some(author) = row.select(&AUTHOR).next() else {
            continue;
        };
        let user: String = author.text().collect();

        let cell = row.select(&BODY_CELL).next().ok_or(ParseError::MissingBodyCell)?;
        let raw: String = cell.text().collect();
        let text = strip_footer(&raw, &markers.signature_marker, &markers.edited_marker);
        let dated = split_dated_body(text, &markers.date_re).ok_or(ParseError::MissingDate)?;

        if dated.body.is_empty() || user.trim().is_empty() {
            continue;
        }
        out.push(Message {
            user,
            date: dated.date,
            title: title.clone(),
            text: dated.body,
        });
    }

    Ok(())
}

/// First table nested in the `index`-th table of the body (document order).
fn message_container(body: ElementRef<'_>, index: usize) -> Option<ElementRef<'_>> {
    let outer = body.select(&TABLE).nth(index)?;
    outer.select(&TABLE).find(|t| t.id() != outer.id())
}

/// Rows that are children of `table`, looking through the implicit
/// `<tbody>` an HTML5 parser inserts.
fn direct_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "tbody" | "thead" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|r| r.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

// ── Tests ──
