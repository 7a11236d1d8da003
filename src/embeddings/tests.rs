use super::*;
use std::collections::HashMap;

/// Embedder backed by a fixed lookup table, for offline tests
pub(crate) struct TableEmbedder {
    pub vectors: HashMap<String, Vec<f32>>,
    pub fallback: Vec<f32>,
}

impl TableEmbedder {
    pub(crate) fn new(entries: &[(&str, Vec<f32>)], fallback: Vec<f32>) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
            fallback,
        }
    }
}

impl Embedder for TableEmbedder {
    fn model(&self) -> &str {
        "table"
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .cloned()
                    .unwrap_or_else(|| self.fallback.clone())
            })
            .collect())
    }
}

#[test]
fn embed_one_uses_batch_path() {
    let embedder = TableEmbedder::new(&[("rust", vec![1.0, 0.0])], vec![0.0, 1.0]);

    assert_eq!(embedder.embed_one("rust").expect("embeds"), vec![1.0, 0.0]);
    assert_eq!(embedder.embed_one("other").expect("embeds"), vec![0.0, 1.0]);
}

#[test]
fn check_batch_accepts_consistent_vectors() {
    assert!(check_batch(0, &[]).is_ok());
    assert!(check_batch(2, &[vec![1.0, 2.0], vec![3.0, 4.0]]).is_ok());
}

#[test]
fn check_batch_rejects_wrong_count() {
    let result = check_batch(3, &[vec![1.0], vec![2.0]]);
    assert!(matches!(result, Err(RagError::EmbeddingUnavailable(_))));
}

#[test]
fn check_batch_rejects_mixed_dimensions() {
    let result = check_batch(2, &[vec![1.0, 2.0], vec![3.0]]);
    assert!(matches!(result, Err(RagError::InvalidDimension(_))));

    let result = check_batch(1, &[Vec::new()]);
    assert!(matches!(result, Err(RagError::InvalidDimension(_))));
}
