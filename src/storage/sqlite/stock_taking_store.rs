//! SQLite StockTakingStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_ts, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid};
use crate::domain::{Assignment, DiscrepantItem, StockTaking, StockTakingItem, StockTakingStatus};
use crate::interfaces::stock_taking_store::{Result, StockTakingStore, StorageError};
use crate::storage::schema::{
    StockTakingAssignments, StockTakingItems, StockTakings, CREATE_ASSIGNMENTS_TABLE,
    CREATE_ITEMS_INDEX, CREATE_ITEMS_TABLE, CREATE_STOCK_TAKINGS_TABLE,
};

/// SQLite implementation of StockTakingStore.
pub struct SqliteStockTakingStore {
    pool: SqlitePool,
}

impl SqliteStockTakingStore {
    /// Create a new SQLite stock-taking store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist.
    pub async fn init(&self) -> Result<()> {
        for statement in [
            CREATE_STOCK_TAKINGS_TABLE,
            CREATE_ASSIGNMENTS_TABLE,
            CREATE_ITEMS_TABLE,
            CREATE_ITEMS_INDEX,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Insert the taking with its assignments and items within an
    /// already-started transaction.
    async fn insert_all(
        conn: &mut SqliteConnection,
        taking: &StockTaking,
        assignments: &[Assignment],
        items: &[StockTakingItem],
    ) -> Result<()> {
        let query = Query::insert()
            .into_table(StockTakings::Table)
            .columns([
                StockTakings::Id,
                StockTakings::LocationId,
                StockTakings::Status,
                StockTakings::RequestedBy,
                StockTakings::CreatedAt,
                StockTakings::StartedAt,
                StockTakings::CompletedAt,
                StockTakings::Notes,
            ])
            .values_panic([
                taking.id.to_string().into(),
                taking.location_id.to_string().into(),
                taking.status.as_str().into(),
                taking.requested_by.to_string().into(),
                format_ts(taking.created_at).into(),
                taking.started_at.map(format_ts).into(),
                taking.completed_at.map(format_ts).into(),
                taking.notes.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;

        for assignment in assignments {
            let query = Query::insert()
                .into_table(StockTakingAssignments::Table)
                .columns([
                    StockTakingAssignments::StockTakingId,
                    StockTakingAssignments::UserId,
                    StockTakingAssignments::AssignedAt,
                ])
                .values_panic([
                    assignment.stock_taking_id.to_string().into(),
                    assignment.user_id.to_string().into(),
                    format_ts(assignment.assigned_at).into(),
                ])
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;
        }

        for item in items {
            let query = Query::insert()
                .into_table(StockTakingItems::Table)
                .columns([
                    StockTakingItems::Id,
                    StockTakingItems::StockTakingId,
                    StockTakingItems::ProductId,
                    StockTakingItems::ExpectedQuantity,
                    StockTakingItems::CountedQuantity,
                    StockTakingItems::CountedAt,
                    StockTakingItems::CountedBy,
                    StockTakingItems::Notes,
                ])
                .values_panic([
                    item.id.to_string().into(),
                    item.stock_taking_id.to_string().into(),
                    item.product_id.to_string().into(),
                    item.expected_quantity.into(),
                    item.counted_quantity.into(),
                    item.counted_at.map(format_ts).into(),
                    item.counted_by.map(|id| id.to_string()).into(),
                    item.notes.clone().into(),
                ])
                .to_string(SqliteQueryBuilder);

            sqlx::query(&query).execute(&mut *conn).await?;
        }

        Ok(())
    }

    fn item_columns() -> [StockTakingItems; 8] {
        [
            StockTakingItems::Id,
            StockTakingItems::StockTakingId,
            StockTakingItems::ProductId,
            StockTakingItems::ExpectedQuantity,
            StockTakingItems::CountedQuantity,
            StockTakingItems::CountedAt,
            StockTakingItems::CountedBy,
            StockTakingItems::Notes,
        ]
    }

    fn taking_columns() -> [StockTakings; 8] {
        [
            StockTakings::Id,
            StockTakings::LocationId,
            StockTakings::Status,
            StockTakings::RequestedBy,
            StockTakings::CreatedAt,
            StockTakings::StartedAt,
            StockTakings::CompletedAt,
            StockTakings::Notes,
        ]
    }

    fn map_taking(row: &SqliteRow) -> Result<StockTaking> {
        let status_str: String = row.get("status");
        let status = StockTakingStatus::parse(&status_str)
            .ok_or_else(|| StorageError::InvalidValue(status_str))?;

        Ok(StockTaking {
            id: parse_uuid(row.get("id"))?,
            location_id: parse_uuid(row.get("location_id"))?,
            status,
            requested_by: parse_uuid(row.get("requested_by"))?,
            created_at: parse_ts(row.get("created_at"))?,
            started_at: parse_opt_ts(row.get("started_at"))?,
            completed_at: parse_opt_ts(row.get("completed_at"))?,
            notes: row.get("notes"),
        })
    }

    fn map_item(row: &SqliteRow) -> Result<StockTakingItem> {
        Ok(StockTakingItem {
            id: parse_uuid(row.get("id"))?,
            stock_taking_id: parse_uuid(row.get("stock_taking_id"))?,
            product_id: parse_uuid(row.get("product_id"))?,
            expected_quantity: row.get("expected_quantity"),
            counted_quantity: row.get("counted_quantity"),
            counted_at: parse_opt_ts(row.get("counted_at"))?,
            counted_by: parse_opt_uuid(row.get("counted_by"))?,
            notes: row.get("notes"),
        })
    }

    /// Conditional status flip; returns whether a row changed.
    async fn flip_status(
        &self,
        id: Uuid,
        from: StockTakingStatus,
        to: StockTakingStatus,
        at_column: StockTakings,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = Query::update()
            .table(StockTakings::Table)
            .value(StockTakings::Status, to.as_str())
            .value(at_column, format_ts(at))
            .and_where(Expr::col(StockTakings::Id).eq(id.to_string()))
            .and_where(Expr::col(StockTakings::Status).eq(from.as_str()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StockTakingStore for SqliteStockTakingStore {
    async fn insert(
        &self,
        taking: &StockTaking,
        assignments: &[Assignment],
        items: &[StockTakingItem],
    ) -> Result<()> {
        // BEGIN IMMEDIATE acquires the write lock upfront, preventing
        // deadlocks when concurrent DEFERRED transactions race to
        // upgrade from shared to exclusive.
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = Self::insert_all(&mut conn, taking, assignments, items).await;

        match result {
            Ok(()) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(())
            }
            Err(e) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(e)
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<StockTaking>> {
        let query = Query::select()
            .columns(Self::taking_columns())
            .from(StockTakings::Table)
            .and_where(Expr::col(StockTakings::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::map_taking).transpose()
    }

    async fn mark_started(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.flip_status(
            id,
            StockTakingStatus::Requested,
            StockTakingStatus::InProgress,
            StockTakings::StartedAt,
            at,
        )
        .await
    }

    async fn mark_completed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.flip_status(
            id,
            StockTakingStatus::InProgress,
            StockTakingStatus::Completed,
            StockTakings::CompletedAt,
            at,
        )
        .await
    }

    async fn assignments(&self, stock_taking_id: Uuid) -> Result<Vec<Assignment>> {
        let query = Query::select()
            .columns([
                StockTakingAssignments::StockTakingId,
                StockTakingAssignments::UserId,
                StockTakingAssignments::AssignedAt,
            ])
            .from(StockTakingAssignments::Table)
            .and_where(
                Expr::col(StockTakingAssignments::StockTakingId).eq(stock_taking_id.to_string()),
            )
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut assignments = Vec::with_capacity(rows.len());
        for row in rows {
            assignments.push(Assignment {
                stock_taking_id: parse_uuid(row.get("stock_taking_id"))?,
                user_id: parse_uuid(row.get("user_id"))?,
                assigned_at: parse_ts(row.get("assigned_at"))?,
            });
        }

        Ok(assignments)
    }

    async fn items(&self, stock_taking_id: Uuid) -> Result<Vec<StockTakingItem>> {
        let query = Query::select()
            .columns(Self::item_columns())
            .from(StockTakingItems::Table)
            .and_where(Expr::col(StockTakingItems::StockTakingId).eq(stock_taking_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_item).collect()
    }

    async fn item(&self, item_id: Uuid) -> Result<Option<StockTakingItem>> {
        let query = Query::select()
            .columns(Self::item_columns())
            .from(StockTakingItems::Table)
            .and_where(Expr::col(StockTakingItems::Id).eq(item_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::map_item).transpose()
    }

    async fn record_count(
        &self,
        item_id: Uuid,
        counted_quantity: i64,
        counted_by: Uuid,
        counted_at: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<bool> {
        let query = Query::update()
            .table(StockTakingItems::Table)
            .value(StockTakingItems::CountedQuantity, counted_quantity)
            .value(StockTakingItems::CountedBy, counted_by.to_string())
            .value(StockTakingItems::CountedAt, format_ts(counted_at))
            .value(StockTakingItems::Notes, notes.map(str::to_string))
            .and_where(Expr::col(StockTakingItems::Id).eq(item_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn recent(&self, take: u64) -> Result<Vec<StockTaking>> {
        let query = Query::select()
            .columns(Self::taking_columns())
            .from(StockTakings::Table)
            .order_by(StockTakings::CreatedAt, Order::Desc)
            .limit(take)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_taking).collect()
    }

    async fn for_worker(&self, user_id: Uuid) -> Result<Vec<StockTaking>> {
        let query = Query::select()
            .column(StockTakingAssignments::StockTakingId)
            .from(StockTakingAssignments::Table)
            .and_where(Expr::col(StockTakingAssignments::UserId).eq(user_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let ids: Vec<String> = rows.iter().map(|row| row.get("stock_taking_id")).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::select()
            .columns(Self::taking_columns())
            .from(StockTakings::Table)
            .and_where(Expr::col(StockTakings::Id).is_in(ids))
            .and_where(
                Expr::col(StockTakings::Status).ne(StockTakingStatus::Completed.as_str()),
            )
            .order_by(StockTakings::CreatedAt, Order::Desc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_taking).collect()
    }

    async fn discrepant_items(&self, take: u64) -> Result<Vec<DiscrepantItem>> {
        let query = Query::select()
            .columns([StockTakings::Id, StockTakings::LocationId])
            .from(StockTakings::Table)
            .and_where(
                Expr::col(StockTakings::Status).eq(StockTakingStatus::Completed.as_str()),
            )
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let mut locations = std::collections::HashMap::with_capacity(rows.len());
        for row in &rows {
            locations.insert(
                parse_uuid(row.get("id"))?,
                parse_uuid(row.get("location_id"))?,
            );
        }
        if locations.is_empty() {
            return Ok(Vec::new());
        }

        let completed_ids: Vec<String> = locations.keys().map(Uuid::to_string).collect();
        let query = Query::select()
            .columns(Self::item_columns())
            .from(StockTakingItems::Table)
            .and_where(Expr::col(StockTakingItems::StockTakingId).is_in(completed_ids))
            .and_where(Expr::col(StockTakingItems::CountedQuantity).is_not_null())
            .and_where(
                Expr::col(StockTakingItems::CountedQuantity)
                    .not_equals(StockTakingItems::ExpectedQuantity),
            )
            .order_by(StockTakingItems::CountedAt, Order::Desc)
            .limit(take)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut discrepant = Vec::with_capacity(rows.len());
        for row in &rows {
            let item = Self::map_item(row)?;
            // Membership in the completed set is guaranteed by the query.
            if let Some(&location_id) = locations.get(&item.stock_taking_id) {
                discrepant.push(DiscrepantItem { item, location_id });
            }
        }

        Ok(discrepant)
    }

    async fn is_assigned(&self, stock_taking_id: Uuid, user_id: Uuid) -> Result<bool> {
        let query = Query::select()
            .expr(Expr::col(StockTakingAssignments::UserId).count())
            .from(StockTakingAssignments::Table)
            .and_where(
                Expr::col(StockTakingAssignments::StockTakingId).eq(stock_taking_id.to_string()),
            )
            .and_where(Expr::col(StockTakingAssignments::UserId).eq(user_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let count: i64 = row.get(0);
        Ok(count > 0)
    }
}
