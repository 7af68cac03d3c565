use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EmbeddingBackend, EmbeddingSettings};

/// Turns texts into dense vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

pub fn from_settings(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    Ok(match settings.backend {
        EmbeddingBackend::Http => Box::new(HttpEmbedder::new(settings)?),
        EmbeddingBackend::Hashing => Box::new(HashingEmbedder::default()),
    })
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

// ── OpenAI-compatible endpoint ──

pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to create embedding HTTP client")?;
        Ok(HttpEmbedder {
            client,
            endpoint: endpoint(&settings.base_url),
            model: settings.model.clone(),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            batch_size: settings.batch_size.max(1),
        })
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut req = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: batch,
        });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp: EmbeddingResponse = req
            .send()
            .await
            .context("Embedding request failed")?
            .error_for_status()
            .context("Embedding endpoint returned an error")?
            .json()
            .await
            .context("Failed to parse embedding response")?;

        let mut items = resp.data;
        if items.len() != batch.len() {
            bail!(
                "Embedding endpoint returned {} vectors for {} inputs",
                items.len(),
                batch.len()
            );
        }
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }
}

/// Resolve the embeddings endpoint from a base URL.
fn endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/embeddings") {
        base.to_string()
    } else if base.ends_with("/v1") {
        format!("{}/embeddings", base)
    } else {
        format!("{}/v1/embeddings", base)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
            debug!("Embedded {}/{}", out.len(), texts.len());
        }
        Ok(out)
    }
}

// ── Offline embedder ──

const HASHING_DIM: usize = 384;

/// Feature-hashed character trigrams of each word.
///
/// Texts sharing words get similar vectors, so a word scores high against a
/// document that repeats it. Stable within one build of the binary.
pub struct HashingEmbedder {
    dim: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        HashingEmbedder { dim: HASHING_DIM }
    }
}

impl HashingEmbedder {
    fn vector(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0f32; self.dim];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let padded: Vec<char> = format!("<{}>", word.to_lowercase()).chars().collect();
            for gram in padded.windows(3) {
                let mut hasher = DefaultHasher::new();
                gram.hash(&mut hasher);
                let h = hasher.finish();
                let slot = (h % self.dim as u64) as usize;
                let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
                out[slot] += sign;
            }
        }
        let norm = out.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|x| *x /= norm);
        }
        out
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn endpoint_resolution() {
        assert_eq!(endpoint("http://localhost:1234/v1"), "http://localhost:1234/v1/embeddings");
        assert_eq!(endpoint("http://localhost:1234/v1/"), "http://localhost:1234/v1/embeddings");
        assert_eq!(endpoint("http://host"), "http://host/v1/embeddings");
        assert_eq!(endpoint("http://host/v1/embeddings"), "http://host/v1/embeddings");
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn hashing_is_deterministic_and_normalised() {
        let e = HashingEmbedder::default();
        let v = e.embed(&strings(&["juego", "juego", "apuesta"])).await.unwrap();
        assert_eq!(v[0], v[1]);
        assert_ne!(v[0], v[2]);
        let norm: f32 = v[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn hashing_word_closer_to_containing_text() {
        let e = HashingEmbedder::default();
        let v = e
            .embed(&strings(&["tragaperras", "las tragaperras me arruinaron", "hoy hace sol"]))
            .await
            .unwrap();
        assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
    }

    #[tokio::test]
    async fn http_batches_and_reorders() {
        let server = MockServer::start().await;
        let body = serde_json::json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer secreto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(2)
            .mount(&server)
            .await;

        let settings = EmbeddingSettings {
            base_url: format!("{}/v1", server.uri()),
            api_key: Some("secreto".into()),
            batch_size: 2,
            ..EmbeddingSettings::default()
        };
        let e = HttpEmbedder::new(&settings).unwrap();
        let v = e.embed(&strings(&["a", "b", "c", "d"])).await.unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0], vec![1.0, 0.0]);
        assert_eq!(v[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn http_count_mismatch_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "index": 0, "embedding": [1.0] }]
            })))
            .mount(&server)
            .await;
        let settings = EmbeddingSettings {
            base_url: server.uri(),
            ..EmbeddingSettings::default()
        };
        let e = HttpEmbedder::new(&settings).unwrap();
        assert!(e.embed(&strings(&["a", "b"])).await.is_err());
    }
}
