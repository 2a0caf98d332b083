//! Submission record store
//!
//! One row per completed submission in the `predictions` table. Records
//! are inserted exactly once by the pipeline's persist stage, are never
//! mutated afterwards, and are read back in bulk by the map.

use crate::normalize::{ConfidenceValue, SpeciesId};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;
use wingbeat_common::Coordinate;

/// Record store errors
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// Database operation error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored column failed to (de)serialize
    #[error("Malformed record data: {0}")]
    Malformed(String),
}

/// Row content for one completed submission, before the store assigns
/// its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub image_path: String,
    pub image_url: String,
    pub species_name: String,
    pub species_id: Option<SpeciesId>,
    pub confidence: Option<ConfidenceValue>,
    pub geo: Coordinate,
}

/// Columns the map needs to plot one sighting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: Uuid,
    pub species_name: String,
    pub geo: Coordinate,
}

/// Persistence boundary for submission records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert one record, returning the store-assigned id
    async fn insert(&self, row: NewSubmission) -> Result<Uuid, RecordStoreError>;

    /// Bulk read of all prior records, id/species/coordinate only
    async fn list_markers(&self) -> Result<Vec<MapMarker>, RecordStoreError>;
}

/// SQLite-backed record store
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn to_json_column<T: Serialize>(value: &Option<T>) -> Result<Option<String>, RecordStoreError> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v))
        .transpose()
        .map_err(|e| RecordStoreError::Malformed(e.to_string()))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert(&self, row: NewSubmission) -> Result<Uuid, RecordStoreError> {
        let id = Uuid::new_v4();
        let geo = serde_json::to_string(&row.geo)
            .map_err(|e| RecordStoreError::Malformed(e.to_string()))?;
        let species_id = to_json_column(&row.species_id)?;
        let confidence = to_json_column(&row.confidence)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO predictions
                (id, image_path, image_url, species_name, species_id, confidence, geo, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&row.image_path)
        .bind(&row.image_url)
        .bind(&row.species_name)
        .bind(species_id)
        .bind(confidence)
        .bind(geo)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            record_id = %id,
            species = %row.species_name,
            "Submission record inserted"
        );

        Ok(id)
    }

    async fn list_markers(&self) -> Result<Vec<MapMarker>, RecordStoreError> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT id, species_name, geo FROM predictions",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut markers = Vec::with_capacity(rows.len());
        for (id, species_name, geo) in rows {
            let id = Uuid::parse_str(&id)
                .map_err(|e| RecordStoreError::Malformed(format!("record id: {}", e)))?;
            let geo: Coordinate = serde_json::from_str(&geo)
                .map_err(|e| RecordStoreError::Malformed(format!("geo column: {}", e)))?;
            markers.push(MapMarker {
                id,
                species_name,
                geo,
            });
        }

        Ok(markers)
    }
}
