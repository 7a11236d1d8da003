use super::*;
use tempfile::TempDir;

pub(crate) fn sample_vectors() -> Vec<Vec<f32>> {
    vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]]
}

pub(crate) fn sample_knowledge_base() -> KnowledgeBase {
    let index = FlatIndex::build(&sample_vectors()).expect("index should build");
    let chunks = ChunkStore::new(vec![
        "Rust is a systems programming language.".to_string(),
        "Bread needs flour, water, and yeast.".to_string(),
        "Cargo is Rust's build tool.".to_string(),
    ]);
    let manifest = BuildManifest {
        build_id: index.build_id(),
        created_at: Utc::now(),
        chunk_count: 3,
        dimension: 2,
        embedding_model: "nomic-embed-text:latest".to_string(),
        chunking: ChunkingConfig::default(),
        sources: vec![PathBuf::from("notes.pdf")],
    };
    KnowledgeBase::new(chunks, index, manifest).expect("pair should line up")
}

#[test]
fn chunk_store_json_shape() {
    let store = ChunkStore::new(vec!["first".to_string(), "second".to_string()]);
    let json = serde_json::to_value(&store).expect("can serialize json");

    assert_eq!(json, serde_json::json!({ "chunks": ["first", "second"] }));
}

#[test]
fn chunk_store_round_trips_exactly() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join(CHUNKS_FILE);

    let store = ChunkStore::new(vec![
        "plain".to_string(),
        "quotes \" and \\ backslashes".to_string(),
        "unicode: ünïcödé 🦀\nnew line\ttab".to_string(),
        String::new(),
    ]);
    store.save(&path).expect("save should succeed");

    let content = fs::read_to_string(&path).expect("file readable");
    assert!(content.starts_with("{\n    \"chunks\": ["));

    let loaded = ChunkStore::load(&path).expect("load should succeed");
    assert_eq!(loaded, store);
}

#[test]
fn chunk_store_accessors() {
    let store = ChunkStore::new(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(store.len(), 2);
    assert!(!store.is_empty());
    assert_eq!(store.get(1), Some("b"));
    assert_eq!(store.get(2), None);
    assert!(ChunkStore::default().is_empty());
}

#[test]
fn knowledge_base_rejects_count_mismatch() {
    let index = FlatIndex::build(&sample_vectors()).expect("index should build");
    let chunks = ChunkStore::new(vec!["only".to_string(), "two".to_string()]);
    let manifest = BuildManifest {
        build_id: index.build_id(),
        created_at: Utc::now(),
        chunk_count: 2,
        dimension: 2,
        embedding_model: "model".to_string(),
        chunking: ChunkingConfig::default(),
        sources: Vec::new(),
    };

    let result = KnowledgeBase::new(chunks, index, manifest);
    assert!(matches!(result, Err(RagError::StoreIndexMismatch(_))));
}

#[test]
fn knowledge_base_rejects_foreign_manifest() {
    let original = sample_knowledge_base();
    let mut manifest = original.manifest().clone();
    manifest.build_id = Uuid::new_v4();

    let result = KnowledgeBase::new(original.chunks().clone(), original.index().clone(), manifest);
    assert!(matches!(result, Err(RagError::StoreIndexMismatch(_))));
}

#[test]
fn save_then_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let paths = StorePaths::in_dir(temp_dir.path());

    let knowledge_base = sample_knowledge_base();
    knowledge_base.save(&paths).expect("save should succeed");
    assert!(paths.has_index());

    let loaded = KnowledgeBase::load(&paths).expect("load should succeed");
    assert_eq!(loaded.chunks(), knowledge_base.chunks());
    assert_eq!(loaded.index(), knowledge_base.index());
    assert_eq!(loaded.manifest(), knowledge_base.manifest());
}

#[test]
fn load_without_index_is_index_not_found() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = KnowledgeBase::load(&StorePaths::in_dir(temp_dir.path()));
    assert!(matches!(result, Err(RagError::IndexNotFound(_))));
}

#[test]
fn load_with_missing_chunk_store_is_mismatch() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let paths = StorePaths::in_dir(temp_dir.path());

    sample_knowledge_base().save(&paths).expect("save should succeed");
    fs::remove_file(&paths.chunks).expect("chunks removable");

    let result = KnowledgeBase::load(&paths);
    assert!(matches!(result, Err(RagError::StoreIndexMismatch(_))));
}

#[test]
fn rebuilding_replaces_previous_build() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let paths = StorePaths::in_dir(temp_dir.path());

    let first = sample_knowledge_base();
    first.save(&paths).expect("save should succeed");
    let second = sample_knowledge_base();
    second.save(&paths).expect("save should succeed");

    let loaded = KnowledgeBase::load(&paths).expect("load should succeed");
    assert_eq!(loaded.manifest().build_id, second.manifest().build_id);
    assert_ne!(loaded.manifest().build_id, first.manifest().build_id);
}

#[test]
fn save_with_vectors_writes_matrix() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let paths = StorePaths::in_dir(temp_dir.path());
    let matrix = VectorMatrix::from_rows(&sample_vectors()).expect("rows share a dimension");

    sample_knowledge_base()
        .save_with_vectors(&paths, &matrix)
        .expect("save should succeed");

    assert!(paths.has_index());
    let stored = crate::index::read_vectors(&paths.vectors).expect("matrix readable");
    assert_eq!(stored, matrix);
}

#[test]
fn save_with_vectors_rejects_row_mismatch() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let paths = StorePaths::in_dir(temp_dir.path());
    let matrix = VectorMatrix::from_rows(&[vec![1.0, 0.0]]).expect("single row");

    let result = sample_knowledge_base().save_with_vectors(&paths, &matrix);

    assert!(matches!(result, Err(RagError::StoreIndexMismatch(_))));
    assert!(!paths.has_index());
}

#[test]
fn failed_matrix_write_leaves_no_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let paths = StorePaths::in_dir(temp_dir.path());
    sample_knowledge_base().save(&paths).expect("first save should succeed");

    // A non-empty directory in place of the matrix file cannot be replaced
    fs::create_dir_all(paths.vectors.join("blocker")).expect("blocker creatable");
    let matrix = VectorMatrix::from_rows(&sample_vectors()).expect("rows share a dimension");
    let result = sample_knowledge_base().save_with_vectors(&paths, &matrix);

    assert!(result.is_err());
    assert!(!paths.has_index());
    assert!(matches!(
        KnowledgeBase::load(&paths),
        Err(RagError::IndexNotFound(_))
    ));
}
