//! On-disk index artifact pair: a binary vector file and a parallel JSON
//! metadata array.
//!
//! Vector file layout (all integers little-endian):
//!
//! ```text
//! magic   4 bytes  b"CAVI"
//! version u32      1
//! count   u32      number of vectors
//! dim     u32      vector dimension
//! data    count * dim * f32
//! ```
//!
//! The metadata file is a JSON array of [`FragmentMeta`]; row `i` describes
//! vector `i`. Both files are written together and loaded together; a count
//! mismatch at load time is a validation error and the pair is refused.

use std::path::Path;

use tracing::{debug, info};

use courseadvisor_shared::{AdvisorError, FragmentMeta, Result};

/// Magic bytes identifying a CourseAdvisor vector file.
const MAGIC: &[u8; 4] = b"CAVI";

/// Current vector file format version.
const FORMAT_VERSION: u32 = 1;

/// Write the artifact pair. `vectors` and `meta` must be the same length and
/// every vector must share one dimension.
pub fn write_artifacts(
    index_path: &Path,
    metadata_path: &Path,
    vectors: &[Vec<f32>],
    meta: &[FragmentMeta],
) -> Result<()> {
    if vectors.len() != meta.len() {
        return Err(AdvisorError::validation(format!(
            "{} vectors but {} metadata rows; artifacts must align",
            vectors.len(),
            meta.len()
        )));
    }
    let dim = vectors.first().map(Vec::len).unwrap_or(0);
    if vectors.iter().any(|v| v.len() != dim) {
        return Err(AdvisorError::validation(
            "embedding vectors have inconsistent dimensions",
        ));
    }

    if let Some(parent) = index_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AdvisorError::io(parent, e))?;
    }

    let mut buf = Vec::with_capacity(16 + vectors.len() * dim * 4);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(vectors.len() as u32).to_le_bytes());
    buf.extend_from_slice(&(dim as u32).to_le_bytes());
    for vector in vectors {
        for value in vector {
            buf.extend_from_slice(&value.to_le_bytes());
        }
    }
    std::fs::write(index_path, &buf).map_err(|e| AdvisorError::io(index_path, e))?;

    let json = serde_json::to_string_pretty(meta)
        .map_err(|e| AdvisorError::validation(format!("metadata serialization failed: {e}")))?;
    std::fs::write(metadata_path, json).map_err(|e| AdvisorError::io(metadata_path, e))?;

    info!(
        vectors = vectors.len(),
        dim,
        index = %index_path.display(),
        metadata = %metadata_path.display(),
        "index artifacts written"
    );
    Ok(())
}

/// Load the artifact pair, enforcing the positional-alignment invariant.
pub fn load_artifacts(
    index_path: &Path,
    metadata_path: &Path,
) -> Result<(usize, Vec<f32>, Vec<FragmentMeta>)> {
    let bytes = std::fs::read(index_path).map_err(|e| AdvisorError::io(index_path, e))?;
    let (count, dim, vectors) = decode_vectors(&bytes)?;

    let meta_json =
        std::fs::read_to_string(metadata_path).map_err(|e| AdvisorError::io(metadata_path, e))?;
    let meta: Vec<FragmentMeta> = serde_json::from_str(&meta_json)
        .map_err(|e| AdvisorError::index(format!("malformed metadata file: {e}")))?;

    if meta.len() != count {
        return Err(AdvisorError::validation(format!(
            "metadata has {} rows but index has {count} vectors; refusing misaligned artifacts",
            meta.len()
        )));
    }

    debug!(count, dim, "index artifacts loaded");
    Ok((dim, vectors, meta))
}

fn decode_vectors(bytes: &[u8]) -> Result<(usize, usize, Vec<f32>)> {
    if bytes.len() < 16 {
        return Err(AdvisorError::index("vector file too short for header"));
    }
    if &bytes[0..4] != MAGIC {
        return Err(AdvisorError::index("vector file magic mismatch"));
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().expect("4-byte slice"));
    if version != FORMAT_VERSION {
        return Err(AdvisorError::index(format!(
            "unsupported vector file version {version}"
        )));
    }
    let count = u32::from_le_bytes(bytes[8..12].try_into().expect("4-byte slice")) as usize;
    let dim = u32::from_le_bytes(bytes[12..16].try_into().expect("4-byte slice")) as usize;

    let expected = 16 + count * dim * 4;
    if bytes.len() != expected {
        return Err(AdvisorError::index(format!(
            "vector file truncated: expected {expected} bytes, got {}",
            bytes.len()
        )));
    }

    let mut vectors = Vec::with_capacity(count * dim);
    for chunk in bytes[16..].chunks_exact(4) {
        vectors.push(f32::from_le_bytes(chunk.try_into().expect("4-byte chunk")));
    }
    Ok((count, dim, vectors))
}
