use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use cad_shared::ManifestEntry;
use cad_shared::manifest::sort_entries;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::{Postgres, QueryBuilder};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::ManifestError;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ManifestError>> + Send + 'a>>;

type ManifestRow = (
    String,
    String,
    String,
    Option<String>,
    i32,
    bool,
    Option<DateTime<Utc>>,
);

/// Reference-data store. Deltas with `active == false` remove the entry.
pub trait ManifestStore: Send + Sync {
    fn save(&self, entries: Vec<ManifestEntry>, checked_at: DateTime<Utc>) -> StoreFuture<'_, ()>;

    /// When the store was last successfully checked against the API.
    fn last_update_date(&self) -> StoreFuture<'_, Option<DateTime<Utc>>>;

    /// Active entries of one category in display order.
    fn entries<'a>(&'a self, category: &'a str) -> StoreFuture<'a, Vec<ManifestEntry>>;
}

#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    entries: DashMap<String, ManifestEntry>,
    last_checked: RwLock<Option<DateTime<Utc>>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ManifestStore for MemoryManifestStore {
    fn save(&self, entries: Vec<ManifestEntry>, checked_at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            for entry in entries {
                if entry.active {
                    self.entries.insert(entry.id.clone(), entry);
                } else {
                    self.entries.remove(&entry.id);
                }
            }
            *self.last_checked.write().await = Some(checked_at);
            Ok(())
        })
    }

    fn last_update_date(&self) -> StoreFuture<'_, Option<DateTime<Utc>>> {
        Box::pin(async move { Ok(*self.last_checked.read().await) })
    }

    fn entries<'a>(&'a self, category: &'a str) -> StoreFuture<'a, Vec<ManifestEntry>> {
        Box::pin(async move {
            let mut matching: Vec<ManifestEntry> = self
                .entries
                .iter()
                .filter(|entry| entry.value().category == category)
                .map(|entry| entry.value().clone())
                .collect();
            sort_entries(&mut matching);
            Ok(matching)
        })
    }
}

/// Postgres-backed store, used when `DATABASE_URL` is configured.
#[derive(Debug, Clone)]
pub struct PgManifestStore {
    pool: sqlx::PgPool,
}

impl PgManifestStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

impl ManifestStore for PgManifestStore {
    fn save(&self, entries: Vec<ManifestEntry>, checked_at: DateTime<Utc>) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let entry_count = i32::try_from(entries.len()).unwrap_or(i32::MAX);

            // Last delta for an id wins; ON CONFLICT cannot touch one row twice per statement.
            let mut latest: HashMap<String, ManifestEntry> = HashMap::with_capacity(entries.len());
            for entry in entries {
                latest.insert(entry.id.clone(), entry);
            }
            let (upserts, removals): (Vec<_>, Vec<_>) =
                latest.into_values().partition(|entry| entry.active);

            let mut tx = self.pool.begin().await?;

            if !upserts.is_empty() {
                let mut query_builder = QueryBuilder::<Postgres>::new(
                    "INSERT INTO manifest_entries \
                     (id, category, title, value, sort_order, active, last_updated) ",
                );
                query_builder.push_values(upserts, |mut builder, entry| {
                    builder
                        .push_bind(entry.id)
                        .push_bind(entry.category)
                        .push_bind(entry.title)
                        .push_bind(entry.value)
                        .push_bind(entry.sort_order)
                        .push_bind(entry.active)
                        .push_bind(entry.last_updated);
                });
                query_builder.push(
                    " ON CONFLICT (id) DO UPDATE SET \
                     category = EXCLUDED.category, title = EXCLUDED.title, \
                     value = EXCLUDED.value, sort_order = EXCLUDED.sort_order, \
                     active = EXCLUDED.active, last_updated = EXCLUDED.last_updated",
                );
                query_builder.build().execute(&mut *tx).await?;
            }

            if !removals.is_empty() {
                let ids: Vec<String> = removals.into_iter().map(|entry| entry.id).collect();
                sqlx::query("DELETE FROM manifest_entries WHERE id = ANY($1)")
                    .bind(ids)
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query("INSERT INTO manifest_checks (checked_at, entry_count) VALUES ($1, $2)")
                .bind(checked_at)
                .bind(entry_count)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            info!(entry_count, %checked_at, "saved manifest delta");
            Ok(())
        })
    }

    fn last_update_date(&self) -> StoreFuture<'_, Option<DateTime<Utc>>> {
        Box::pin(async move {
            let checked_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
                "SELECT MAX(checked_at) FROM manifest_checks",
            )
            .fetch_one(&self.pool)
            .await?;
            Ok(checked_at)
        })
    }

    fn entries<'a>(&'a self, category: &'a str) -> StoreFuture<'a, Vec<ManifestEntry>> {
        Box::pin(async move {
            let rows: Vec<ManifestRow> = sqlx::query_as(
                "SELECT id, category, title, value, sort_order, active, last_updated \
                 FROM manifest_entries WHERE category = $1 AND active \
                 ORDER BY sort_order, title",
            )
            .bind(category)
            .fetch_all(&self.pool)
            .await?;

            Ok(rows
                .into_iter()
                .map(
                    |(id, category, title, value, sort_order, active, last_updated)| {
                        ManifestEntry {
                            id,
                            category,
                            title,
                            value,
                            sort_order,
                            active,
                            last_updated,
                        }
                    },
                )
                .collect())
        })
    }
}
