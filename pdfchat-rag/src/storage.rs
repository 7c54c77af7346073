//! On-disk persistence for [`FlatIndex`].
//!
//! An index is addressed by a folder and a name and stored as two files:
//!
//! - `{name}.vectors`: binary: magic `PDFCHAT\0`, format version (`u32`),
//!   metric tag (`u8`), dimensions (`u32`), entry count (`u64`), then
//!   `count * dimensions` little-endian `f32`s in insertion order.
//! - `{name}.json`: manifest: format version, metric, dimensions, embedding
//!   model, creation time and the chunk store, in the same order.
//!
//! Both files are written to a temporary path and renamed into place.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::index::{DistanceMetric, FlatIndex, IndexEntry};

const MAGIC: &[u8; 8] = b"PDFCHAT\0";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 8 + 4 + 1 + 4 + 8;

/// Where an index lives: a folder plus a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexLocation {
    /// Directory holding the index files.
    pub folder: PathBuf,
    /// Base name shared by the index files.
    pub name: String,
}

impl IndexLocation {
    /// Address the index `name` inside `folder`.
    pub fn new(folder: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { folder: folder.into(), name: name.into() }
    }

    /// Path of the binary vector file.
    pub fn vectors_path(&self) -> PathBuf {
        self.folder.join(format!("{}.vectors", self.name))
    }

    /// Path of the JSON manifest and chunk store.
    pub fn manifest_path(&self) -> PathBuf {
        self.folder.join(format!("{}.json", self.name))
    }
}

impl fmt::Display for IndexLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder.join(&self.name).display())
    }
}

#[derive(Serialize, Deserialize)]
struct Manifest {
    format_version: u32,
    metric: DistanceMetric,
    dimensions: usize,
    embedding_model: String,
    created_at: DateTime<Utc>,
    chunks: Vec<Chunk>,
}

impl FlatIndex {
    /// Persist the whole index at `location`, replacing any previous index there.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the folder cannot be created or written.
    pub async fn save(&self, location: &IndexLocation) -> Result<()> {
        tokio::fs::create_dir_all(&location.folder).await?;

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            metric: self.metric(),
            dimensions: self.dimensions(),
            embedding_model: self.embedding_model().to_string(),
            created_at: Utc::now(),
            chunks: self.entries().iter().map(|e| e.chunk.clone()).collect(),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| RagError::PipelineError(format!("failed to encode manifest: {e}")))?;

        write_atomically(&location.vectors_path(), &encode_vectors(self)).await?;
        write_atomically(&location.manifest_path(), &manifest_bytes).await?;

        info!(location = %location, entries = self.len(), "saved vector index");
        Ok(())
    }

    /// Load an index previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotFound`] if either file is missing.
    /// - [`RagError::IndexCorrupt`] if the files cannot be decoded, disagree
    ///   with each other, or hold no entries.
    pub async fn load(location: &IndexLocation) -> Result<Self> {
        let vectors_path = location.vectors_path();
        let manifest_path = location.manifest_path();
        let vector_bytes = read_index_file(&vectors_path).await?;
        let manifest_bytes = read_index_file(&manifest_path).await?;

        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| corrupt(&manifest_path, format!("invalid manifest: {e}")))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(corrupt(
                &manifest_path,
                format!("unsupported format version {}", manifest.format_version),
            ));
        }

        let (metric, dimensions, vectors) =
            decode_vectors(&vector_bytes).map_err(|message| corrupt(&vectors_path, message))?;

        if metric != manifest.metric || dimensions != manifest.dimensions {
            return Err(corrupt(
                &vectors_path,
                format!(
                    "vector file ({metric}, {dimensions} dims) does not match manifest ({}, {} dims)",
                    manifest.metric, manifest.dimensions
                ),
            ));
        }
        if vectors.len() != manifest.chunks.len() {
            return Err(corrupt(
                &vectors_path,
                format!(
                    "{} vectors but {} chunks in manifest",
                    vectors.len(),
                    manifest.chunks.len()
                ),
            ));
        }
        if vectors.is_empty() {
            return Err(corrupt(&vectors_path, "index holds no entries".to_string()));
        }

        let entries: Vec<IndexEntry> =
            vectors.into_iter().zip(manifest.chunks).map(|(v, c)| IndexEntry::new(v, c)).collect();

        debug!(location = %location, entries = entries.len(), "loaded vector index");
        Ok(FlatIndex::from_parts(metric, dimensions, manifest.embedding_model, entries))
    }
}

fn corrupt(path: &Path, message: String) -> RagError {
    RagError::IndexCorrupt { path: path.to_path_buf(), message }
}

async fn read_index_file(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RagError::IndexNotFound { path: path.to_path_buf() },
        _ => RagError::Io(e),
    })
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn metric_tag(metric: DistanceMetric) -> u8 {
    match metric {
        DistanceMetric::L2 => 0,
        DistanceMetric::Cosine => 1,
    }
}

fn encode_vectors(index: &FlatIndex) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + index.len() * index.dimensions() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.push(metric_tag(index.metric()));
    out.extend_from_slice(&(index.dimensions() as u32).to_le_bytes());
    out.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for entry in index.entries() {
        for value in &entry.vector {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

type DecodedVectors = (DistanceMetric, usize, Vec<Vec<f32>>);

fn decode_vectors(bytes: &[u8]) -> std::result::Result<DecodedVectors, String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("file is {} bytes, shorter than the header", bytes.len()));
    }
    let (header, body) = bytes.split_at(HEADER_LEN);
    if &header[..8] != MAGIC {
        return Err("bad magic bytes".to_string());
    }

    let version = u32::from_le_bytes([header[8], header[9], header[10], header[11]]);
    if version != FORMAT_VERSION {
        return Err(format!("unsupported format version {version}"));
    }
    let metric = match header[12] {
        0 => DistanceMetric::L2,
        1 => DistanceMetric::Cosine,
        tag => return Err(format!("unknown metric tag {tag}")),
    };
    let dimensions = u32::from_le_bytes([header[13], header[14], header[15], header[16]]) as usize;
    let mut count_bytes = [0u8; 8];
    count_bytes.copy_from_slice(&header[17..25]);
    let count = u64::from_le_bytes(count_bytes) as usize;

    if dimensions == 0 {
        return Err("dimensions must be non-zero".to_string());
    }
    let expected = count
        .checked_mul(dimensions)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| "entry count overflows".to_string())?;
    if body.len() != expected {
        return Err(format!(
            "expected {expected} bytes of vector data for {count} x {dimensions}, found {}",
            body.len()
        ));
    }

    let vectors = body
        .chunks_exact(dimensions * 4)
        .map(|row| {
            row.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()
        })
        .collect();
    Ok((metric, dimensions, vectors))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn sample_index() -> FlatIndex {
        let entries = (0..3)
            .map(|i| {
                IndexEntry::new(
                    vec![i as f32, 1.0 - i as f32, 0.25],
                    Chunk {
                        id: format!("doc_0_{i}"),
                        text: format!("chunk {i}"),
                        source: "doc.pdf".to_string(),
                        page: 0,
                        position: i,
                        start_index: i * 10,
                        metadata: HashMap::new(),
                    },
                )
            })
            .collect();
        FlatIndex::build(entries, DistanceMetric::Cosine).unwrap().with_embedding_model("test")
    }

    #[test]
    fn location_paths_share_the_name() {
        let location = IndexLocation::new("data/vectorstores", "vector_space");
        assert_eq!(location.vectors_path(), PathBuf::from("data/vectorstores/vector_space.vectors"));
        assert_eq!(location.manifest_path(), PathBuf::from("data/vectorstores/vector_space.json"));
        assert_eq!(location.to_string(), "data/vectorstores/vector_space");
    }

    #[test]
    fn vector_encoding_round_trips() {
        let index = sample_index();
        let (metric, dims, vectors) = decode_vectors(&encode_vectors(&index)).unwrap();
        assert_eq!(metric, DistanceMetric::Cosine);
        assert_eq!(dims, 3);
        assert_eq!(vectors[2], index.entries()[2].vector);
    }

    #[test]
    fn truncated_vector_file_is_rejected() {
        let mut bytes = encode_vectors(&sample_index());
        bytes.pop();
        assert!(decode_vectors(&bytes).is_err());
        assert!(decode_vectors(&bytes[..10]).is_err());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let mut bytes = encode_vectors(&sample_index());
        bytes[0] = b'X';
        assert_eq!(decode_vectors(&bytes).unwrap_err(), "bad magic bytes");
    }

    #[tokio::test]
    async fn save_then_load_restores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let location = IndexLocation::new(dir.path().join("nested"), "vector_space");
        let index = sample_index();

        index.save(&location).await.unwrap();
        let loaded = FlatIndex::load(&location).await.unwrap();

        assert_eq!(loaded, index);
        assert_eq!(loaded.embedding_model(), "test");
    }

    #[tokio::test]
    async fn missing_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FlatIndex::load(&IndexLocation::new(dir.path(), "nope")).await.unwrap_err();
        assert!(matches!(err, RagError::IndexNotFound { .. }));
    }

    #[tokio::test]
    async fn garbage_manifest_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let location = IndexLocation::new(dir.path(), "vector_space");
        sample_index().save(&location).await.unwrap();
        tokio::fs::write(location.manifest_path(), b"{not json").await.unwrap();

        let err = FlatIndex::load(&location).await.unwrap_err();
        assert!(matches!(err, RagError::IndexCorrupt { .. }));
    }
}
