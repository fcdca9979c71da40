//! Integration tests for the SQLite collection backend using deterministic
//! mock embeddings.

use std::sync::Arc;

use gradesmith::embeddings::{EmbeddingProvider, MockEmbeddingProvider};
use gradesmith::stores::sqlite::SqliteCollection;
use gradesmith::stores::{ChunkRecord, ChunkStore};
use gradesmith::types::GradingError;
use tempfile::tempdir;

fn mock_provider() -> Arc<dyn EmbeddingProvider> {
    Arc::new(MockEmbeddingProvider::new())
}

fn record(id: &str, index: usize, content: &str) -> ChunkRecord {
    ChunkRecord::new(id, "physics_notes.pdf", index, content)
}

#[tokio::test]
async fn create_rejects_existing_collection() {
    let dir = tempdir().unwrap();

    SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap();
    let err = SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap_err();
    assert!(matches!(err, GradingError::AlreadyExists(_)));
}

#[tokio::test]
async fn open_rejects_missing_collection() {
    let dir = tempdir().unwrap();
    let err = SqliteCollection::open(dir.path(), "absent", mock_provider())
        .await
        .unwrap_err();
    assert!(matches!(err, GradingError::NotFound(_)));
}

#[tokio::test]
async fn open_rejects_mismatched_embedding_model() {
    let dir = tempdir().unwrap();

    let collection = SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap();
    drop(collection);

    let other: Arc<dyn EmbeddingProvider> =
        Arc::new(MockEmbeddingProvider::new().with_model_id("another-embedder"));
    let err = SqliteCollection::open(dir.path(), "notes", other)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GradingError::EmbeddingModelMismatch { .. }
    ));
}

#[tokio::test]
async fn duplicate_id_is_rejected_deterministically() {
    let dir = tempdir().unwrap();
    let collection = SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap();

    collection
        .insert(record("0", 0, "first paragraph"))
        .await
        .unwrap();
    let err = collection
        .insert(record("0", 1, "other text under the same id"))
        .await
        .unwrap_err();

    assert!(matches!(err, GradingError::DuplicateId(ref id) if id == "0"));
    assert_eq!(collection.count().await.unwrap(), 1);

    // The original document survives the rejected insert.
    let stored = collection.get("0").await.unwrap().unwrap();
    assert_eq!(stored.content, "first paragraph");
}

#[tokio::test]
async fn get_returns_stored_record_or_none() {
    let dir = tempdir().unwrap();
    let collection = SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap();

    collection
        .insert(record("page_0_para_0", 0, "Maxwell's equations"))
        .await
        .unwrap();

    let found = collection.get("page_0_para_0").await.unwrap().unwrap();
    assert_eq!(found.id, "page_0_para_0");
    assert_eq!(found.source, "physics_notes.pdf");
    assert_eq!(found.chunk_index, 0);
    assert_eq!(found.content, "Maxwell's equations");

    assert!(collection.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn query_on_empty_collection_returns_empty() {
    let dir = tempdir().unwrap();
    let collection = SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap();

    let results = collection.query("anything at all", 3).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn query_returns_min_of_k_and_size_in_similarity_order() {
    let dir = tempdir().unwrap();
    let collection = SqliteCollection::create(dir.path(), "notes", mock_provider())
        .await
        .unwrap();

    let paragraphs = [
        "Ohm's law relates voltage, current, and resistance.",
        "Kirchhoff's current law conserves charge at a node.",
        "Thevenin's theorem reduces a network to one source.",
        "Capacitors store energy in an electric field.",
        "Inductors store energy in a magnetic field.",
    ];
    for (index, content) in paragraphs.iter().enumerate() {
        collection
            .insert(record(&index.to_string(), index, content))
            .await
            .unwrap();
    }

    // Identical text embeds to the identical vector, so the exact paragraph
    // comes back first with similarity ~1.
    let results = collection.query(paragraphs[2], 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].record.content, paragraphs[2]);
    assert!(results[0].similarity > 0.99);
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity - f32::EPSILON);
    }

    // k larger than the collection returns everything.
    let all = collection.query(paragraphs[0], 10).await.unwrap();
    assert_eq!(all.len(), paragraphs.len());

    // k = 0 returns nothing.
    assert!(collection.query(paragraphs[0], 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn collection_persists_across_reopen() {
    let dir = tempdir().unwrap();

    {
        let collection = SqliteCollection::create(dir.path(), "notes", mock_provider())
            .await
            .unwrap();
        collection
            .insert(record("0", 0, "persisted paragraph"))
            .await
            .unwrap();
    }

    let reopened = SqliteCollection::open(dir.path(), "notes", mock_provider())
        .await
        .unwrap();
    assert_eq!(reopened.count().await.unwrap(), 1);

    let results = reopened.query("persisted paragraph", 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].record.content, "persisted paragraph");
}
