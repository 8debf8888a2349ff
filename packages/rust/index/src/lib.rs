//! Semantic index over course-description fragments.
//!
//! The query side of the retrieval pipeline: load the artifact pair
//! produced by the offline build, then answer top-k nearest-neighbor
//! searches under squared Euclidean distance. The corpus is a few dozen
//! documents, so search is an exact linear scan — no approximate structure
//! is warranted at this scale.

pub mod artifact;
pub mod chunker;

use std::path::Path;

use tracing::{info, warn};

use courseadvisor_shared::{AdvisorError, FragmentMeta, Result};

pub use artifact::{load_artifacts, write_artifacts};
pub use chunker::{CHUNK_OVERLAP, CHUNK_SIZE, build_fragments, chunk_text};

/// Sentinel index meaning "no match" in a search result slot.
pub const NO_MATCH: usize = usize::MAX;

/// One search hit: a vector index (or [`NO_MATCH`]) and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub index: usize,
    pub distance: f32,
}

/// In-memory nearest-neighbor index with positionally aligned metadata.
#[derive(Debug)]
pub struct VectorIndex {
    dim: usize,
    /// Row-major `count * dim` vector data.
    vectors: Vec<f32>,
    meta: Vec<FragmentMeta>,
}

impl VectorIndex {
    /// Load the artifact pair from disk, refusing misaligned artifacts.
    pub fn load(index_path: &Path, metadata_path: &Path) -> Result<Self> {
        let (dim, vectors, meta) = load_artifacts(index_path, metadata_path)?;
        info!(fragments = meta.len(), dim, "semantic index ready");
        Ok(Self { dim, vectors, meta })
    }

    /// Build an index directly from vectors and metadata (used in tests and
    /// by the offline builder before persisting).
    pub fn from_parts(dim: usize, vectors: Vec<f32>, meta: Vec<FragmentMeta>) -> Result<Self> {
        if dim == 0 || vectors.len() != meta.len() * dim {
            return Err(AdvisorError::validation(
                "vector data does not align with metadata rows",
            ));
        }
        Ok(Self { dim, vectors, meta })
    }

    /// Number of indexed fragments.
    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    /// Embedding dimension of the indexed vectors.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Top-`k` nearest neighbors of `query` under squared Euclidean
    /// distance, nearest first. When fewer than `k` vectors exist, the
    /// remaining slots carry the [`NO_MATCH`] sentinel, matching the
    /// artifact contract that callers must discard such slots.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        if query.len() != self.dim {
            warn!(
                expected = self.dim,
                got = query.len(),
                "query embedding dimension mismatch, returning no hits"
            );
            return vec![
                SearchHit {
                    index: NO_MATCH,
                    distance: f32::INFINITY,
                };
                k
            ];
        }

        let mut hits: Vec<SearchHit> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, row)| SearchHit {
                index: i,
                distance: squared_l2(query, row),
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);

        while hits.len() < k {
            hits.push(SearchHit {
                index: NO_MATCH,
                distance: f32::INFINITY,
            });
        }
        hits
    }

    /// Metadata row for a hit index; `None` for the sentinel or an
    /// out-of-range index.
    pub fn metadata(&self, index: usize) -> Option<&FragmentMeta> {
        if index == NO_MATCH {
            return None;
        }
        self.meta.get(index)
    }

    /// Resolve hits to metadata rows, discarding sentinel and out-of-range
    /// slots, in hit order.
    pub fn resolve<'a>(&'a self, hits: &[SearchHit]) -> Vec<&'a FragmentMeta> {
        hits.iter().filter_map(|h| self.metadata(h.index)).collect()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(title: &str) -> FragmentMeta {
        FragmentMeta {
            fragment_text: format!("{title} fragment"),
            source_course_title: title.to_string(),
            source_url: format!("https://example.com/{}", title.to_lowercase()),
        }
    }

    fn small_index() -> VectorIndex {
        // Three 2-d vectors at distinct distances from the origin.
        let vectors = vec![
            0.0, 0.0, // A
            1.0, 0.0, // B
            3.0, 4.0, // C
        ];
        VectorIndex::from_parts(2, vectors, vec![meta("A"), meta("B"), meta("C")]).unwrap()
    }

    #[test]
    fn search_orders_by_distance() {
        let index = small_index();
        let hits = index.search(&[0.0, 0.0], 3);
        let titles: Vec<_> = index
            .resolve(&hits)
            .iter()
            .map(|m| m.source_course_title.as_str())
            .collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn search_pads_with_sentinel_when_corpus_smaller_than_k() {
        let index = small_index();
        let hits = index.search(&[0.0, 0.0], 5);
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[3].index, NO_MATCH);
        assert_eq!(hits[4].index, NO_MATCH);
        // Sentinels are discarded on resolution.
        assert_eq!(index.resolve(&hits).len(), 3);
    }

    #[test]
    fn out_of_range_index_discarded() {
        let index = small_index();
        assert!(index.metadata(99).is_none());
        assert!(index.metadata(NO_MATCH).is_none());
    }

    #[test]
    fn dimension_mismatch_yields_only_sentinels() {
        let index = small_index();
        let hits = index.search(&[1.0, 2.0, 3.0], 2);
        assert!(hits.iter().all(|h| h.index == NO_MATCH));
        assert!(index.resolve(&hits).is_empty());
    }

    #[test]
    fn from_parts_validates_alignment() {
        assert!(VectorIndex::from_parts(2, vec![1.0, 2.0, 3.0], vec![meta("A")]).is_err());
    }
}
