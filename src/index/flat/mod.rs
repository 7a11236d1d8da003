
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use super::{SearchHit, VectorIndex, inner_product, normalize};
use crate::utilities::write_atomically;
use crate::{RagError, Result};

const MAGIC: &[u8; 8] = b"PRAGFLAT";
const FORMAT_VERSION: u32 = 1;
/// magic + version + dimension + ntotal + build id
const HEADER_LEN: usize = 8 + 4 + 4 + 8 + 16;
const CHECKSUM_LEN: usize = 4;

/// Exact (brute-force) inner-product index over normalized vectors.
///
/// Vectors are stored row-major in one contiguous buffer; row `i` belongs to
/// chunk `i`. The index is immutable once built: rebuilding means building a
/// new index from the complete embedding set.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
    build_id: Uuid,
}

impl FlatIndex {
    /// Build an index from a complete embedding set, tagging it with a fresh build id.
    ///
    /// # Arguments
    /// * `vectors` - One embedding per chunk, in chunk order
    ///
    /// # Returns
    /// * `Result<Self>` - The index, or `InvalidDimension` if the set is empty,
    ///   lengths differ, or a vector cannot be normalized
    #[inline]
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self> {
        Self::build_with_id(vectors, Uuid::new_v4())
    }

    /// Build an index tagged with an existing build id
    #[inline]
    pub fn build_with_id(vectors: &[Vec<f32>], build_id: Uuid) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(RagError::InvalidDimension(
                "cannot build an index from zero vectors".to_string(),
            ));
        };

        let dimension = first.len();
        if dimension == 0 {
            return Err(RagError::InvalidDimension(
                "vectors must have at least one component".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::InvalidDimension(format!(
                    "vector {} has {} components, expected {}",
                    position,
                    vector.len(),
                    dimension
                )));
            }

            let normalized = normalize(vector).map_err(|e| {
                RagError::InvalidDimension(format!("vector {}: {}", position, e))
            })?;
            data.extend_from_slice(&normalized);
        }

        info!(
            "Built flat index with {} vectors of dimension {}",
            vectors.len(),
            dimension
        );

        Ok(Self {
            dimension,
            vectors: data,
            build_id,
        })
    }

    /// Identifier shared by this index and the chunk store built alongside it
    #[inline]
    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    /// Normalized vector stored at `position`
    #[inline]
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.chunks_exact(self.dimension).nth(position)
    }

    /// Write the index to `path`, replacing any previous file atomically
    #[inline]
    pub fn persist(&self, path: &Path) -> Result<()> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.vectors.len() * 4 + CHECKSUM_LEN);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.ntotal() as u64).to_le_bytes());
        bytes.extend_from_slice(self.build_id.as_bytes());
        for value in &self.vectors {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let checksum = crc32fast::hash(&bytes);
        bytes.extend_from_slice(&checksum.to_le_bytes());

        write_atomically(path, &bytes)?;

        debug!(
            "Persisted index {} ({} bytes) to {}",
            self.build_id,
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    /// Load an index previously written by [`FlatIndex::persist`].
    ///
    /// A missing file is reported as `IndexNotFound`; anything that does not
    /// parse or fails its checksum is `CorruptIndex`.
    #[inline]
    pub fn restore(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RagError::IndexNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        let index = Self::decode(&bytes)?;
        debug!(
            "Restored index {} with {} vectors from {}",
            index.build_id,
            index.ntotal(),
            path.display()
        );
        Ok(index)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
            return Err(RagError::CorruptIndex(format!(
                "file is {} bytes, shorter than the header",
                bytes.len()
            )));
        }

        let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        let expected = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);
        if crc32fast::hash(body) != expected {
            return Err(RagError::CorruptIndex("checksum mismatch".to_string()));
        }

        let mut reader = ByteReader::new(body);
        if reader.take(MAGIC.len())? != MAGIC {
            return Err(RagError::CorruptIndex("not a flat index file".to_string()));
        }

        let version = reader.read_u32()?;
        if version != FORMAT_VERSION {
            return Err(RagError::CorruptIndex(format!(
                "unsupported format version {}",
                version
            )));
        }

        let dimension = reader.read_u32()? as usize;
        let ntotal = usize::try_from(reader.read_u64()?)
            .map_err(|_| RagError::CorruptIndex("vector count overflows".to_string()))?;
        let build_id = Uuid::from_slice(reader.take(16)?)
            .map_err(|e| RagError::CorruptIndex(format!("invalid build id: {}", e)))?;

        if dimension == 0 || ntotal == 0 {
            return Err(RagError::CorruptIndex(
                "index header describes an empty index".to_string(),
            ));
        }

        let payload_len = ntotal
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| RagError::CorruptIndex("payload size overflows".to_string()))?;
        let payload = reader.take(payload_len)?;
        if !reader.is_empty() {
            return Err(RagError::CorruptIndex(
                "trailing bytes after vector payload".to_string(),
            ));
        }

        let vectors = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self {
            dimension,
            vectors,
            build_id,
        })
    }
}

impl VectorIndex for FlatIndex {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn ntotal(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    #[inline]
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(RagError::InvalidDimension(format!(
                "query has {} components, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let query = normalize(query)?;

        let mut hits = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, vector)| SearchHit {
                position,
                score: inner_product(&query, vector),
            })
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.position.cmp(&b.position))
        });
        hits.truncate(k);

        debug!("Flat search returned {} of {} vectors", hits.len(), self.ntotal());
        Ok(hits)
    }
}

/// Cursor over the index body that reports truncation as corruption
struct ByteReader<'a> {
    remaining: &'a [u8],
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining.len() < len {
            return Err(RagError::CorruptIndex(format!(
                "expected {} more bytes, found {}",
                len,
                self.remaining.len()
            )));
        }
        let (head, tail) = self.remaining.split_at(len);
        self.remaining = tail;
        Ok(head)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}
