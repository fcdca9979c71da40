//! SQLite + sqlite-vec collection backend.
//!
//! One collection is one SQLite file named `<name>.sqlite` under the
//! collection directory. Chunk rows live in `chunks`; their vectors live in
//! the `chunks_embeddings` vec0 virtual table, joined by rowid. Collection
//! metadata (`embedding_model`, `dims`) pins the embedding space the
//! collection was built with.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use tokio_rusqlite::{Connection, OptionalExtension, ffi};

use super::{ChunkRecord, ChunkStore, ScoredChunk};
use crate::embeddings::EmbeddingProvider;
use crate::types::GradingError;

const META_EMBEDDING_MODEL: &str = "embedding_model";
const META_DIMS: &str = "dims";

/// A named persistent collection bound to an embedding provider.
pub struct SqliteCollection {
    name: String,
    path: PathBuf,
    conn: Connection,
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SqliteCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCollection")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

enum InsertOutcome {
    Inserted,
    Duplicate,
    DimensionMismatch { expected: usize, actual: usize },
}

impl SqliteCollection {
    /// Creates a new collection file at `<dir>/<name>.sqlite`.
    ///
    /// Fails with [`GradingError::AlreadyExists`] when a collection of that
    /// name already exists at that path. The provider's model id is recorded
    /// as collection metadata so a mismatched provider is rejected at open
    /// time.
    pub async fn create(
        dir: impl AsRef<Path>,
        name: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, GradingError> {
        register_sqlite_vec()?;

        let path = collection_path(dir.as_ref(), name);
        if path.exists() {
            return Err(GradingError::AlreadyExists(format!(
                "collection '{name}' at {}",
                dir.as_ref().display()
            )));
        }
        tokio::fs::create_dir_all(dir.as_ref()).await?;

        let conn = Connection::open(&path)
            .await
            .map_err(|err| GradingError::Storage(err.to_string()))?;
        verify_vec_extension(&conn).await?;

        let model_id = provider.model_id().to_string();
        conn.call(move |conn| {
            conn.execute(
                "CREATE TABLE collection_meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
                [],
            )?;
            conn.execute(
                "CREATE TABLE chunks (
                    id TEXT PRIMARY KEY,
                    source TEXT,
                    chunk_index TEXT,
                    content TEXT
                )",
                [],
            )?;
            conn.execute("CREATE INDEX idx_chunks_source ON chunks(source)", [])?;
            conn.execute(
                "INSERT INTO collection_meta (key, value) VALUES (?1, ?2)",
                [META_EMBEDDING_MODEL, model_id.as_str()],
            )?;
            Ok(())
        })
        .await
        .map_err(|err: tokio_rusqlite::Error| GradingError::Storage(err.to_string()))?;

        tracing::info!(name, path = %path.display(), "created collection");
        Ok(Self {
            name: name.to_string(),
            path,
            conn,
            provider,
        })
    }

    /// Opens an existing collection.
    ///
    /// Fails with [`GradingError::NotFound`] when the collection file is
    /// absent and [`GradingError::EmbeddingModelMismatch`] when `provider`
    /// reports a different model than the one the collection was built with.
    pub async fn open(
        dir: impl AsRef<Path>,
        name: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, GradingError> {
        register_sqlite_vec()?;

        let path = collection_path(dir.as_ref(), name);
        if !path.exists() {
            return Err(GradingError::NotFound(format!(
                "collection '{name}' at {}",
                dir.as_ref().display()
            )));
        }

        let conn = Connection::open(&path)
            .await
            .map_err(|err| GradingError::Storage(err.to_string()))?;
        verify_vec_extension(&conn).await?;

        let recorded: Option<String> = conn
            .call(|conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM collection_meta WHERE key = ?1",
                        [META_EMBEDDING_MODEL],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| GradingError::Storage(err.to_string()))?;

        if let Some(expected) = recorded
            && expected != provider.model_id()
        {
            return Err(GradingError::EmbeddingModelMismatch {
                expected,
                actual: provider.model_id().to_string(),
            });
        }

        tracing::debug!(name, path = %path.display(), "opened collection");
        Ok(Self {
            name: name.to_string(),
            path,
            conn,
            provider,
        })
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing SQLite file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn collection_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.sqlite"))
}

async fn verify_vec_extension(conn: &Connection) -> Result<(), GradingError> {
    conn.call(|conn| {
        match conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0)) {
            Ok(_) => Ok(()),
            Err(err) => Err(err),
        }
    })
    .await
    .map_err(|err| GradingError::Storage(err.to_string()))
}

fn register_sqlite_vec() -> Result<(), GradingError> {
    use std::sync::Mutex;

    static INIT: Once = Once::new();
    static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

    INIT.call_once(|| {
        let result = unsafe {
            type SqliteExtensionInit = unsafe extern "C" fn(
                *mut ffi::sqlite3,
                *mut *mut c_char,
                *const ffi::sqlite3_api_routines,
            ) -> i32;

            let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
            let init_fn: SqliteExtensionInit =
                transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
            let rc = ffi::sqlite3_auto_extension(Some(init_fn));
            if rc != 0 {
                Err(format!(
                    "failed to register sqlite-vec extension (code {rc})"
                ))
            } else {
                Ok(())
            }
        };
        *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
    });

    INIT_RESULT
        .lock()
        .expect("init result mutex poisoned")
        .clone()
        .expect("init was called but result not set")
        .map_err(GradingError::Storage)
}

#[async_trait::async_trait]
impl ChunkStore for SqliteCollection {
    async fn insert(&self, chunk: ChunkRecord) -> Result<(), GradingError> {
        let embedding = self.provider.embed_one(&chunk.content).await?;
        let embedding_json = serde_json::to_string(&embedding)
            .map_err(|err| GradingError::Storage(err.to_string()))?;
        let actual_dims = embedding.len();

        let chunk_id = chunk.id.clone();
        let outcome = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM chunks WHERE id = ?1)",
                    [chunk.id.as_str()],
                    |row| row.get(0),
                )?;
                if exists {
                    return Ok(InsertOutcome::Duplicate);
                }

                let dims: Option<String> = conn
                    .query_row(
                        "SELECT value FROM collection_meta WHERE key = ?1",
                        [META_DIMS],
                        |row| row.get(0),
                    )
                    .optional()?;
                match dims.and_then(|value| value.parse::<usize>().ok()) {
                    Some(expected) if expected != actual_dims => {
                        return Ok(InsertOutcome::DimensionMismatch {
                            expected,
                            actual: actual_dims,
                        });
                    }
                    Some(_) => {}
                    None => {
                        // First insert fixes the vector dimensionality.
                        conn.execute(
                            &format!(
                                "CREATE VIRTUAL TABLE chunks_embeddings \
                                 USING vec0(embedding float[{actual_dims}])"
                            ),
                            [],
                        )?;
                        conn.execute(
                            "INSERT INTO collection_meta (key, value) VALUES (?1, ?2)",
                            [META_DIMS, actual_dims.to_string().as_str()],
                        )?;
                    }
                }

                let chunk_index = chunk.chunk_index.to_string();
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO chunks (id, source, chunk_index, content) \
                     VALUES (?1, ?2, ?3, ?4)",
                    [
                        chunk.id.as_str(),
                        chunk.source.as_str(),
                        chunk_index.as_str(),
                        chunk.content.as_str(),
                    ],
                )?;
                let rowid = tx.last_insert_rowid();
                tx.execute(
                    &format!(
                        "INSERT INTO chunks_embeddings (rowid, embedding) VALUES ({rowid}, ?1)"
                    ),
                    [embedding_json.as_str()],
                )?;
                tx.commit()?;
                Ok(InsertOutcome::Inserted)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| GradingError::Storage(err.to_string()))?;

        match outcome {
            InsertOutcome::Inserted => {
                tracing::debug!(collection = %self.name, id = %chunk_id, "inserted chunk");
                Ok(())
            }
            InsertOutcome::Duplicate => Err(GradingError::DuplicateId(chunk_id)),
            InsertOutcome::DimensionMismatch { expected, actual } => {
                Err(GradingError::Storage(format!(
                    "embedding has {actual} dimensions but collection stores {expected}"
                )))
            }
        }
    }

    async fn get(&self, id: &str) -> Result<Option<ChunkRecord>, GradingError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let record = conn
                    .query_row(
                        "SELECT id, source, chunk_index, content FROM chunks WHERE id = ?1",
                        [id.as_str()],
                        |row| {
                            Ok(ChunkRecord {
                                id: row.get(0)?,
                                source: row.get(1)?,
                                chunk_index: row.get::<_, String>(2)?.parse().unwrap_or(0),
                                content: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(record)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| GradingError::Storage(err.to_string()))
    }

    async fn query(&self, query_text: &str, k: usize) -> Result<Vec<ScoredChunk>, GradingError> {
        if k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.provider.embed_one(query_text).await?;
        let embedding_json = serde_json::to_string(&query_embedding)
            .map_err(|err| GradingError::Storage(err.to_string()))?;

        let results = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT c.id, c.source, c.chunk_index, c.content, \
                     vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance \
                     FROM chunks c \
                     JOIN chunks_embeddings e ON c.rowid = e.rowid \
                     ORDER BY distance ASC \
                     LIMIT {k}"
                ))?;

                let rows = stmt.query_map([embedding_json.as_str()], |row| {
                    let record = ChunkRecord {
                        id: row.get(0)?,
                        source: row.get(1)?,
                        chunk_index: row.get::<_, String>(2)?.parse().unwrap_or(0),
                        content: row.get(3)?,
                    };
                    let distance: f32 = row.get(4)?;
                    Ok(ScoredChunk {
                        record,
                        similarity: 1.0 - distance,
                    })
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| GradingError::Storage(err.to_string()))?;

        tracing::debug!(
            collection = %self.name,
            requested = k,
            returned = results.len(),
            "similarity query"
        );
        Ok(results)
    }

    async fn count(&self) -> Result<usize, GradingError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err: tokio_rusqlite::Error| GradingError::Storage(err.to_string()))
    }
}
