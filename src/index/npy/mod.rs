//! Dense `n × d` float32 matrices stored in NumPy `.npy` format.
//!
//! Only the subset needed for embedding matrices is supported: little-endian
//! `f4`, C order, two-dimensional shape. Format versions 1.0 and 2.0 are
//! accepted on read; files are always written as 1.0.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::utilities::write_atomically;
use crate::{RagError, Result};

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
const HEADER_ALIGNMENT: usize = 64;

/// Row-major matrix of embeddings, one row per chunk
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatrix {
    rows: usize,
    dimension: usize,
    data: Vec<f32>,
}

impl VectorMatrix {
    /// Pack equal-length rows into a matrix
    #[inline]
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let dimension = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * dimension);

        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimension {
                return Err(RagError::InvalidDimension(format!(
                    "row {} has {} components, expected {}",
                    i,
                    row.len(),
                    dimension
                )));
            }
            data.extend_from_slice(row);
        }

        Ok(Self {
            rows: rows.len(),
            dimension,
            data,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    #[inline]
    pub fn into_rows(self) -> Vec<Vec<f32>> {
        if self.dimension == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data
            .chunks_exact(self.dimension)
            .map(<[f32]>::to_vec)
            .collect()
    }
}

/// Write `matrix` to `path` as a `.npy` file
#[inline]
pub fn write_vectors(path: &Path, matrix: &VectorMatrix) -> Result<()> {
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        matrix.rows, matrix.dimension
    );
    // magic (6) + version (2) + header length (2) + header + trailing newline
    let unpadded = NPY_MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = unpadded.next_multiple_of(HEADER_ALIGNMENT) - unpadded;
    header.extend(std::iter::repeat_n(' ', padding));
    header.push('\n');

    let header_len = u16::try_from(header.len()).map_err(|_| {
        RagError::InvalidDimension(format!("npy header too long: {} bytes", header.len()))
    })?;

    let mut bytes = Vec::with_capacity(NPY_MAGIC.len() + 4 + header.len() + matrix.data.len() * 4);
    bytes.extend_from_slice(NPY_MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&header_len.to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in &matrix.data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    write_atomically(path, &bytes)?;
    debug!(
        "Wrote {}x{} vector matrix to {}",
        matrix.rows,
        matrix.dimension,
        path.display()
    );
    Ok(())
}

/// Read a `.npy` file holding a two-dimensional `<f4` array
#[inline]
pub fn read_vectors(path: &Path) -> Result<VectorMatrix> {
    let bytes = fs::read(path)?;
    parse_npy(&bytes)
}

fn parse_npy(bytes: &[u8]) -> Result<VectorMatrix> {
    let rest = bytes
        .strip_prefix(NPY_MAGIC.as_slice())
        .ok_or_else(|| invalid("missing NPY magic"))?;

    let (version, rest) = rest
        .split_first_chunk::<2>()
        .ok_or_else(|| invalid("missing format version"))?;

    let (header_len, rest) = match version {
        [1, 0] => {
            let (len, rest) = rest
                .split_first_chunk::<2>()
                .ok_or_else(|| invalid("missing header length"))?;
            (usize::from(u16::from_le_bytes(*len)), rest)
        }
        [2 | 3, 0] => {
            let (len, rest) = rest
                .split_first_chunk::<4>()
                .ok_or_else(|| invalid("missing header length"))?;
            (u32::from_le_bytes(*len) as usize, rest)
        }
        [major, minor] => {
            return Err(invalid(&format!(
                "unsupported format version {}.{}",
                major, minor
            )));
        }
    };

    if rest.len() < header_len {
        return Err(invalid("truncated header"));
    }
    let (header, payload) = rest.split_at(header_len);
    let header = std::str::from_utf8(header).map_err(|_| invalid("header is not text"))?;

    let descr = dict_entry(header, "descr")
        .and_then(|v| v.strip_prefix('\''))
        .and_then(|v| v.split_once('\''))
        .map(|(descr, _)| descr)
        .ok_or_else(|| invalid("missing descr"))?;
    if descr != "<f4" {
        return Err(invalid(&format!("unsupported dtype {}", descr)));
    }

    let fortran_order = dict_entry(header, "fortran_order").ok_or_else(|| invalid("missing fortran_order"))?;
    if !fortran_order.starts_with("False") {
        return Err(invalid("Fortran-ordered arrays are not supported"));
    }

    let shape = dict_entry(header, "shape")
        .and_then(|v| v.strip_prefix('('))
        .and_then(|v| v.split_once(')'))
        .map(|(shape, _)| shape)
        .ok_or_else(|| invalid("missing shape"))?
        .split(',')
        .map(str::trim)
        .filter(|dim| !dim.is_empty())
        .map(|dim| dim.parse::<usize>().map_err(|_| invalid("shape is not numeric")))
        .collect::<Result<Vec<_>>>()?;

    let [rows, dimension] = shape.as_slice() else {
        return Err(invalid(&format!("expected a 2-D array, found {} dimensions", shape.len())));
    };

    let expected = rows
        .checked_mul(*dimension)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| invalid("shape overflows"))?;
    if payload.len() != expected {
        return Err(invalid(&format!(
            "payload is {} bytes, shape ({}, {}) needs {}",
            payload.len(),
            rows,
            dimension,
            expected
        )));
    }

    let data = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(VectorMatrix {
        rows: *rows,
        dimension: *dimension,
        data,
    })
}

/// Text following `'key':` in a NumPy header dictionary
fn dict_entry<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let (_, value) = header.split_once(&format!("'{}':", key))?;
    Some(value.trim_start())
}

fn invalid(reason: &str) -> RagError {
    RagError::InvalidDimension(format!("invalid npy file: {}", reason))
}
