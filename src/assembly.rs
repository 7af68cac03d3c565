use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::corpus::{Corpus, Message};
use crate::fetch::fetch_page;
use crate::parser::{parse_thread, ParseError, ThreadMarkers};

/// Why one thread contributed nothing to the corpus.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Assembly stats returned after completion.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
    pub messages: usize,
}

/// Visit each thread link in order and append its messages to `corpus`.
///
/// A thread that fails to fetch contributes nothing. A thread whose parse
/// stops at a broken row keeps the messages read before it. Either way the
/// thread counts as an error and the walk goes on; failures are not logged.
/// Duplicate links append their messages again.
pub async fn assemble_corpus(
    client: &reqwest::Client,
    links: &[Url],
    markers: &ThreadMarkers,
    mut corpus: Corpus,
) -> Result<(Corpus, AssemblyStats)> {
    let total = links.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = AssemblyStats {
        total,
        ..AssemblyStats::default()
    };
    let start_len = corpus.len();

    for url in links {
        let (messages, error) = process_thread(client, url, markers).await;
        corpus.extend(messages);
        match error {
            None => stats.ok += 1,
            Some(_) => stats.errors += 1,
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    stats.messages = corpus.len() - start_len;
    info!(
        "Assembled {} messages from {} threads ({} ok, {} skipped)",
        stats.messages, stats.total, stats.ok, stats.errors
    );

    Ok((corpus, stats))
}

/// Messages a thread contributed, and why it stopped early if it did.
async fn process_thread(
    client: &reqwest::Client,
    url: &Url,
    markers: &ThreadMarkers,
) -> (Vec<Message>, Option<ThreadError>) {
    let html = match fetch_page(client, url).await {
        Ok(html) => html,
        Err(e) => return (Vec::new(), Some(e.into())),
    };
    let parsed = parse_thread(&html, markers);
    (parsed.messages, parsed.error.map(ThreadError::from))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreadSettings;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn markers() -> ThreadMarkers {
        ThreadMarkers::from_settings(&ThreadSettings::default()).unwrap()
    }

    async fn thread_server() -> MockServer {
        let server = MockServer::start().await;
        let good = std::fs::read_to_string("tests/fixtures/thread.html").unwrap();
        Mock::given(method("GET"))
            .and(path("/forum/forum_posts.asp"))
            .and(query_param("TID", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(good, "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forum/forum_posts.asp"))
            .and(query_param("TID", "2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let partial = std::fs::read_to_string("tests/fixtures/thread.html")
            .unwrap()
            .replace("Escrito el: 13/03/2010 a las 09:05", "sin fecha");
        Mock::given(method("GET"))
            .and(path("/forum/forum_posts.asp"))
            .and(query_param("TID", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(partial, "text/html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forum/forum_posts.asp"))
            .and(query_param("TID", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body><p>Tema: roto</p></body></html>", "text/html"),
            )
            .mount(&server)
            .await;
        server
    }

    fn link(server: &MockServer, tid: u32) -> Url {
        Url::parse(&format!("{}/forum/forum_posts.asp?TID={}", server.uri(), tid)).unwrap()
    }

    #[tokio::test]
    async fn failed_threads_are_skipped() {
        let server = thread_server().await;
        let links = vec![link(&server, 2), link(&server, 1), link(&server, 3)];

        let (corpus, stats) =
            assemble_corpus(&reqwest::Client::new(), &links, &markers(), Corpus::new())
                .await
                .unwrap();

        assert_eq!(
            stats,
            AssemblyStats {
                total: 3,
                ok: 1,
                errors: 2,
                messages: 2
            }
        );
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.messages()[0].user, "María");
        assert!(corpus.messages().iter().all(|m| m.title == "Cómo dejar de jugar"));
    }

    #[tokio::test]
    async fn broken_row_keeps_earlier_messages() {
        let server = thread_server().await;
        let links = vec![link(&server, 4), link(&server, 1)];

        let (corpus, stats) =
            assemble_corpus(&reqwest::Client::new(), &links, &markers(), Corpus::new())
                .await
                .unwrap();

        assert_eq!(
            stats,
            AssemblyStats {
                total: 2,
                ok: 1,
                errors: 1,
                messages: 3
            }
        );
        let users: Vec<&str> = corpus.messages().iter().map(|m| m.user.as_str()).collect();
        assert_eq!(users, vec!["María", "María", "José"]);
    }

    #[tokio::test]
    async fn duplicate_links_append_again() {
        let server = thread_server().await;
        let links = vec![link(&server, 1), link(&server, 1)];
        let (corpus, stats) =
            assemble_corpus(&reqwest::Client::new(), &links, &markers(), Corpus::new())
                .await
                .unwrap();
        assert_eq!(stats.ok, 2);
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus.messages()[0], corpus.messages()[2]);
    }

    #[tokio::test]
    async fn appends_to_existing_corpus() {
        let server = thread_server().await;
        let mut existing = Corpus::new();
        existing.push(Message {
            user: "Ana".into(),
            date: "01/01/2011 a las 10:00".into(),
            title: "Anterior".into(),
            text: "previo".into(),
        });
        let (corpus, stats) = assemble_corpus(
            &reqwest::Client::new(),
            &[link(&server, 1)],
            &markers(),
            existing,
        )
        .await
        .unwrap();
        assert_eq!(stats.messages, 2);
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus.messages()[0].user, "Ana");
    }
}
