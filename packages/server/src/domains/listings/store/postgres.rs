//! Postgres listing store.
//!
//! One table per tier with `details` and `media` as JSONB. Filters compile to
//! SQL through the `listing_text` / `listing_number` / `listing_timestamp`
//! helpers from the migrations; each returns NULL when the JSON value has the
//! wrong type, so malformed upstream data never matches and never errors.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{ListingStore, Result};
use crate::domains::listings::filter::{Condition, ListingFilter};
use crate::domains::listings::models::{Listing, ListingDetails, ListingTier};
use crate::domains::listings::sort::{SortDirection, SortField, SortOrder};

#[derive(Debug, sqlx::FromRow)]
struct ListingRow {
    listing_key: String,
    details: Json<ListingDetails>,
    media: Json<Vec<Value>>,
}

impl From<ListingRow> for Listing {
    fn from(row: ListingRow) -> Self {
        Listing::new(row.listing_key, row.details.0, row.media.0)
    }
}

#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
    tier: ListingTier,
}

impl PgListingStore {
    pub fn new(pool: PgPool, tier: ListingTier) -> Self {
        Self { pool, tier }
    }

    fn table(&self) -> &'static str {
        self.tier.table_name()
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    fn tier(&self) -> ListingTier {
        self.tier
    }

    async fn upsert(
        &self,
        listing_key: &str,
        details: &ListingDetails,
        media: &[Value],
    ) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {table} (listing_key, details, media)
            VALUES ($1, $2, $3)
            ON CONFLICT (listing_key) DO UPDATE
            SET details = EXCLUDED.details,
                media = EXCLUDED.media,
                updated_at = NOW()
            "#,
            table = self.table()
        );

        sqlx::query(&sql)
            .bind(listing_key)
            .bind(Json(details))
            .bind(Json(media))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        filter: &ListingFilter,
        sort: SortOrder,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Listing>> {
        let mut qb = select_query(self.table(), filter, sort, skip, limit);
        let rows = qb
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Listing::from).collect())
    }

    async fn count(&self, filter: &ListingFilter) -> Result<u64> {
        let mut qb = count_query(self.table(), filter);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn matching_keys(
        &self,
        filter: &ListingFilter,
        listing_keys: &[String],
    ) -> Result<HashSet<String>> {
        if listing_keys.is_empty() {
            return Ok(HashSet::new());
        }
        let mut qb = matching_keys_query(self.table(), filter, listing_keys);
        let keys: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(keys.into_iter().collect())
    }

    async fn find_by_key(&self, listing_key: &str) -> Result<Option<Listing>> {
        let sql = format!(
            "SELECT listing_key, details, media FROM {} WHERE listing_key = $1",
            self.table()
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(listing_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Listing::from))
    }

    async fn merge_details(
        &self,
        listing_key: &str,
        patch: &Map<String, Value>,
    ) -> Result<Option<Listing>> {
        let sql = format!(
            r#"
            UPDATE {}
            SET details = details || $2,
                updated_at = NOW()
            WHERE listing_key = $1
            RETURNING listing_key, details, media
            "#,
            self.table()
        );
        let row = sqlx::query_as::<_, ListingRow>(&sql)
            .bind(listing_key)
            .bind(Json(patch))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Listing::from))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// SQL rendering
// =============================================================================

fn select_query<'a>(
    table: &str,
    filter: &ListingFilter,
    sort: SortOrder,
    skip: u64,
    limit: u64,
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT listing_key, details, media FROM {table}"
    ));
    push_conditions(&mut qb, " WHERE ", filter);
    push_order_by(&mut qb, sort);
    qb.push(" OFFSET ")
        .push_bind(to_i64(skip))
        .push(" LIMIT ")
        .push_bind(to_i64(limit));
    qb
}

fn count_query<'a>(table: &str, filter: &ListingFilter) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {table}"));
    push_conditions(&mut qb, " WHERE ", filter);
    qb
}

fn matching_keys_query<'a>(
    table: &str,
    filter: &ListingFilter,
    listing_keys: &[String],
) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT listing_key FROM {table} WHERE listing_key = ANY("
    ));
    qb.push_bind(listing_keys.to_vec()).push(")");
    push_conditions(&mut qb, " AND ", filter);
    qb
}

/// Filter conditions joined with `AND`, introduced by `keyword`. Nothing is
/// pushed for an empty filter.
fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, keyword: &str, filter: &ListingFilter) {
    if filter.is_empty() {
        return;
    }

    qb.push(keyword);
    let mut clauses = qb.separated(" AND ");
    for (field, condition) in filter.iter() {
        match condition {
            Condition::Equals(value) => {
                clauses
                    .push("listing_text(details, ")
                    .push_bind_unseparated(field.to_string())
                    .push_unseparated(") = ")
                    .push_bind_unseparated(value.clone());
            }
            Condition::Matches(pattern) => {
                clauses
                    .push("listing_text(details, ")
                    .push_bind_unseparated(field.to_string())
                    .push_unseparated(") ~* ")
                    .push_bind_unseparated(pattern.as_str().to_string());
            }
            Condition::GreaterThan(bound) => {
                clauses
                    .push("listing_number(details, ")
                    .push_bind_unseparated(field.to_string())
                    .push_unseparated(") > ")
                    .push_bind_unseparated(*bound);
            }
            Condition::Between { min, max } => {
                if let Some(min) = min {
                    clauses
                        .push("listing_number(details, ")
                        .push_bind_unseparated(field.to_string())
                        .push_unseparated(") >= ")
                        .push_bind_unseparated(*min);
                }
                if let Some(max) = max {
                    clauses
                        .push("listing_number(details, ")
                        .push_bind_unseparated(field.to_string())
                        .push_unseparated(") <= ")
                        .push_bind_unseparated(*max);
                }
                if min.is_none() && max.is_none() {
                    clauses
                        .push("listing_number(details, ")
                        .push_bind_unseparated(field.to_string())
                        .push_unseparated(") IS NOT NULL");
                }
            }
            Condition::Within { from, to } => {
                clauses
                    .push("listing_timestamp(details, ")
                    .push_bind_unseparated(field.to_string())
                    .push_unseparated(") BETWEEN ")
                    .push_bind_unseparated(*from)
                    .push_unseparated(" AND ")
                    .push_bind_unseparated(*to);
            }
        }
    }
}

fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, sort: SortOrder) {
    let expr = match sort.field {
        SortField::ListPrice => "listing_number",
        SortField::ModificationTimestamp => "listing_timestamp",
    };
    let direction = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    // Field names are compile-time constants, safe to inline.
    qb.push(format!(
        " ORDER BY {expr}(details, '{field}') {direction} NULLS LAST, listing_key ASC",
        field = sort.field.field_name()
    ));
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
