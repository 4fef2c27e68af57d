//! SQLite NotificationStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{format_ts, parse_ts, parse_uuid};
use crate::domain::{Notification, NotificationKind};
use crate::interfaces::stock_taking_store::{Result, StorageError};
use crate::interfaces::NotificationStore;
use crate::storage::schema::{
    Notifications, CREATE_NOTIFICATIONS_INDEX, CREATE_NOTIFICATIONS_TABLE,
};

/// SQLite implementation of NotificationStore.
pub struct SqliteNotificationStore {
    pool: SqlitePool,
}

impl SqliteNotificationStore {
    /// Create a new SQLite notification store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create tables if they do not exist.
    pub async fn init(&self) -> Result<()> {
        for statement in [CREATE_NOTIFICATIONS_TABLE, CREATE_NOTIFICATIONS_INDEX] {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn insert_one(conn: &mut SqliteConnection, notification: &Notification) -> Result<()> {
        let query = Query::insert()
            .into_table(Notifications::Table)
            .columns([
                Notifications::Id,
                Notifications::UserId,
                Notifications::Title,
                Notifications::Message,
                Notifications::Link,
                Notifications::Kind,
                Notifications::IsRead,
                Notifications::CreatedAt,
            ])
            .values_panic([
                notification.id.to_string().into(),
                notification.user_id.to_string().into(),
                notification.title.clone().into(),
                notification.message.clone().into(),
                notification.link.clone().into(),
                notification.kind.as_str().into(),
                notification.is_read.into(),
                format_ts(notification.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    fn map_notification(row: &SqliteRow) -> Result<Notification> {
        let kind_str: String = row.get("kind");
        let kind = NotificationKind::parse(&kind_str)
            .ok_or_else(|| StorageError::InvalidValue(kind_str))?;

        Ok(Notification {
            id: parse_uuid(row.get("id"))?,
            user_id: parse_uuid(row.get("user_id"))?,
            title: row.get("title"),
            message: row.get("message"),
            link: row.get("link"),
            kind,
            is_read: row.get::<i64, _>("is_read") != 0,
            created_at: parse_ts(row.get("created_at"))?,
        })
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_one(&mut conn, notification).await
    }

    async fn insert_batch(&self, notifications: &[Notification]) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let mut result = Ok(());
        for notification in notifications {
            result = Self::insert_one(&mut conn, notification).await;
            if result.is_err() {
                break;
            }
        }

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

    async fn for_user(&self, user_id: Uuid, take: u64) -> Result<Vec<Notification>> {
        let query = Query::select()
            .columns([
                Notifications::Id,
                Notifications::UserId,
                Notifications::Title,
                Notifications::Message,
                Notifications::Link,
                Notifications::Kind,
                Notifications::IsRead,
                Notifications::CreatedAt,
            ])
            .from(Notifications::Table)
            .and_where(Expr::col(Notifications::UserId).eq(user_id.to_string()))
            .order_by(Notifications::CreatedAt, Order::Desc)
            .limit(take)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(Self::map_notification).collect()
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        let query = Query::select()
            .expr(Expr::col(Notifications::Id).count())
            .from(Notifications::Table)
            .and_where(Expr::col(Notifications::UserId).eq(user_id.to_string()))
            .and_where(Expr::col(Notifications::IsRead).eq(false))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }

    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<()> {
        // Ownership is part of the predicate: a foreign id matches no
        // rows and the call is a silent no-op.
        let query = Query::update()
            .table(Notifications::Table)
            .value(Notifications::IsRead, true)
            .and_where(Expr::col(Notifications::Id).eq(notification_id.to_string()))
            .and_where(Expr::col(Notifications::UserId).eq(user_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<()> {
        let query = Query::update()
            .table(Notifications::Table)
            .value(Notifications::IsRead, true)
            .and_where(Expr::col(Notifications::UserId).eq(user_id.to_string()))
            .and_where(Expr::col(Notifications::IsRead).eq(false))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }
}
