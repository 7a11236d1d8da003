use super::*;
use tempfile::TempDir;

fn handcrafted_npy(header: &str, values: &[f32]) -> Vec<u8> {
    let mut bytes = NPY_MAGIC.to_vec();
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

#[test]
fn write_then_read_preserves_matrix() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("embeddings.npy");

    let matrix = VectorMatrix::from_rows(&[vec![0.1, 0.2, 0.3], vec![-1.5, 2.25, 1e-8]])
        .expect("rows share a dimension");
    write_vectors(&path, &matrix).expect("write should succeed");

    let loaded = read_vectors(&path).expect("read should succeed");
    assert_eq!(loaded, matrix);
    assert_eq!(loaded.rows(), 2);
    assert_eq!(loaded.dimension(), 3);
    assert_eq!(loaded.row(1), Some([-1.5, 2.25, 1e-8].as_slice()));
    assert_eq!(loaded.row(2), None);
}

#[test]
fn written_header_is_aligned() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("embeddings.npy");

    let matrix = VectorMatrix::from_rows(&vec![vec![1.0; 384]; 5]).expect("rows share a dimension");
    write_vectors(&path, &matrix).expect("write should succeed");

    let bytes = fs::read(&path).expect("file readable");
    let header_len = usize::from(u16::from_le_bytes([bytes[8], bytes[9]]));
    assert_eq!((10 + header_len) % HEADER_ALIGNMENT, 0);
    assert_eq!(bytes[10 + header_len - 1], b'\n');
    assert_eq!(bytes.len(), 10 + header_len + 5 * 384 * 4);

    let header = std::str::from_utf8(&bytes[10..10 + header_len]).expect("header is text");
    assert!(header.contains("'shape': (5, 384)"));
}

#[test]
fn reads_numpy_style_header() {
    let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2), }          \n";
    let bytes = handcrafted_npy(header, &[1.0, 0.0, 0.0, 1.0]);

    let matrix = parse_npy(&bytes).expect("parse should succeed");
    assert_eq!(
        matrix.into_rows(),
        vec![vec![1.0, 0.0], vec![0.0, 1.0]]
    );
}

#[test]
fn rejects_other_dtypes() {
    let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 1), }\n";
    let bytes = handcrafted_npy(header, &[1.0, 0.0]);
    assert!(matches!(parse_npy(&bytes), Err(RagError::InvalidDimension(_))));
}

#[test]
fn rejects_fortran_order() {
    let header = "{'descr': '<f4', 'fortran_order': True, 'shape': (1, 2), }\n";
    let bytes = handcrafted_npy(header, &[1.0, 0.0]);
    assert!(parse_npy(&bytes).is_err());
}

#[test]
fn rejects_one_dimensional_arrays() {
    let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (2,), }\n";
    let bytes = handcrafted_npy(header, &[1.0, 0.0]);
    assert!(parse_npy(&bytes).is_err());
}

#[test]
fn rejects_truncated_payload() {
    let header = "{'descr': '<f4', 'fortran_order': False, 'shape': (2, 2), }\n";
    let bytes = handcrafted_npy(header, &[1.0, 0.0, 0.0]);
    assert!(parse_npy(&bytes).is_err());
}

#[test]
fn rejects_missing_magic() {
    assert!(parse_npy(b"not an npy file").is_err());
}

#[test]
fn from_rows_rejects_ragged_input() {
    let result = VectorMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
    assert!(matches!(result, Err(RagError::InvalidDimension(_))));
}
