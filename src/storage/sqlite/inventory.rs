//! SQLite directory implementations.
//!
//! These back the directory seams with the same database the core
//! stores use. The write helpers (`insert_location`, `insert_product`,
//! `upsert_stock`, `insert_user`) are the minimal slice of the
//! surrounding CRUD layer that tests and embedding applications need to
//! populate the directories.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::{format_ts, parse_uuid};
use crate::domain::{LocationInfo, ProductInfo, StockSnapshot};
use crate::interfaces::stock_taking_store::Result;
use crate::interfaces::{InventoryDirectory, UserDirectory};
use crate::storage::schema::{
    Locations, Products, Stocks, Users, CREATE_LOCATIONS_TABLE, CREATE_PRODUCTS_TABLE,
    CREATE_STOCKS_TABLE, CREATE_USERS_TABLE,
};

/// SQLite implementation of InventoryDirectory.
pub struct SqliteInventoryDirectory {
    pool: SqlitePool,
}

impl SqliteInventoryDirectory {
    /// Create a new SQLite inventory directory.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist.
    pub async fn init(&self) -> Result<()> {
        for statement in [
            CREATE_LOCATIONS_TABLE,
            CREATE_PRODUCTS_TABLE,
            CREATE_STOCKS_TABLE,
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Register a location.
    pub async fn insert_location(&self, location: &LocationInfo) -> Result<()> {
        let query = Query::insert()
            .into_table(Locations::Table)
            .columns([
                Locations::Id,
                Locations::Code,
                Locations::Name,
                Locations::CreatedAt,
            ])
            .values_panic([
                location.id.to_string().into(),
                location.code.clone().into(),
                location.name.clone().into(),
                format_ts(Utc::now()).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    /// Register a product.
    pub async fn insert_product(&self, product: &ProductInfo) -> Result<()> {
        let query = Query::insert()
            .into_table(Products::Table)
            .columns([
                Products::Id,
                Products::Sku,
                Products::Name,
                Products::CreatedAt,
            ])
            .values_panic([
                product.id.to_string().into(),
                product.sku.clone().into(),
                product.name.clone().into(),
                format_ts(Utc::now()).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    /// Set the stock level of one (product, location) pair, creating the
    /// row when absent.
    pub async fn upsert_stock(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i64,
    ) -> Result<()> {
        if self
            .update_stock(location_id, product_id, quantity, Utc::now())
            .await?
        {
            return Ok(());
        }

        let query = Query::insert()
            .into_table(Stocks::Table)
            .columns([
                Stocks::LocationId,
                Stocks::ProductId,
                Stocks::Quantity,
                Stocks::UpdatedAt,
            ])
            .values_panic([
                location_id.to_string().into(),
                product_id.to_string().into(),
                quantity.into(),
                format_ts(Utc::now()).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    /// Remove one stock row. Used when a product is delisted from a
    /// location while counts are still in flight.
    pub async fn delete_stock(&self, location_id: Uuid, product_id: Uuid) -> Result<()> {
        let query = Query::delete()
            .from_table(Stocks::Table)
            .and_where(Expr::col(Stocks::LocationId).eq(location_id.to_string()))
            .and_where(Expr::col(Stocks::ProductId).eq(product_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl InventoryDirectory for SqliteInventoryDirectory {
    async fn location(&self, id: Uuid) -> Result<Option<LocationInfo>> {
        let query = Query::select()
            .columns([Locations::Id, Locations::Code, Locations::Name])
            .from(Locations::Table)
            .and_where(Expr::col(Locations::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.map(|row| {
            Ok(LocationInfo {
                id: parse_uuid(row.get("id"))?,
                code: row.get("code"),
                name: row.get("name"),
            })
        })
        .transpose()
    }

    async fn product(&self, id: Uuid) -> Result<Option<ProductInfo>> {
        let query = Query::select()
            .columns([Products::Id, Products::Sku, Products::Name])
            .from(Products::Table)
            .and_where(Expr::col(Products::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.map(|row| {
            Ok(ProductInfo {
                id: parse_uuid(row.get("id"))?,
                sku: row.get("sku"),
                name: row.get("name"),
            })
        })
        .transpose()
    }

    async fn stock_levels(&self, location_id: Uuid) -> Result<Vec<StockSnapshot>> {
        let query = Query::select()
            .columns([Stocks::ProductId, Stocks::Quantity])
            .from(Stocks::Table)
            .and_where(Expr::col(Stocks::LocationId).eq(location_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut snapshots = Vec::with_capacity(rows.len());
        for row in rows {
            snapshots.push(StockSnapshot {
                product_id: parse_uuid(row.get("product_id"))?,
                quantity: row.get("quantity"),
            });
        }

        Ok(snapshots)
    }

    async fn update_stock(
        &self,
        location_id: Uuid,
        product_id: Uuid,
        quantity: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let query = Query::update()
            .table(Stocks::Table)
            .value(Stocks::Quantity, quantity)
            .value(Stocks::UpdatedAt, format_ts(updated_at))
            .and_where(Expr::col(Stocks::LocationId).eq(location_id.to_string()))
            .and_where(Expr::col(Stocks::ProductId).eq(product_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

/// SQLite implementation of UserDirectory.
pub struct SqliteUserDirectory {
    pool: SqlitePool,
}

impl SqliteUserDirectory {
    /// Create a new SQLite user directory.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist.
    pub async fn init(&self) -> Result<()> {
        sqlx::query(CREATE_USERS_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Register a user.
    pub async fn insert_user(&self, id: Uuid, display_name: &str, email: &str) -> Result<()> {
        let query = Query::insert()
            .into_table(Users::Table)
            .columns([
                Users::Id,
                Users::DisplayName,
                Users::Email,
                Users::CreatedAt,
            ])
            .values_panic([
                id.to_string().into(),
                display_name.into(),
                email.into(),
                format_ts(Utc::now()).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteUserDirectory {
    async fn display_name(&self, id: Uuid) -> Result<Option<String>> {
        let query = Query::select()
            .column(Users::DisplayName)
            .from(Users::Table)
            .and_where(Expr::col(Users::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.map(|row| row.get("display_name")))
    }

    async fn display_names(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = Query::select()
            .columns([Users::Id, Users::DisplayName])
            .from(Users::Table)
            .and_where(
                Expr::col(Users::Id).is_in(ids.iter().map(Uuid::to_string).collect::<Vec<_>>()),
            )
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut names = HashMap::with_capacity(rows.len());
        for row in rows {
            names.insert(parse_uuid(row.get("id"))?, row.get("display_name"));
        }

        Ok(names)
    }
}
