//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building, plus the DDL each store's `init` applies.

use sea_query::Iden;

/// Stock takings table schema.
#[derive(Iden)]
pub enum StockTakings {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "location_id"]
    LocationId,
    #[iden = "status"]
    Status,
    #[iden = "requested_by"]
    RequestedBy,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "started_at"]
    StartedAt,
    #[iden = "completed_at"]
    CompletedAt,
    #[iden = "notes"]
    Notes,
}

/// Stock taking assignments table schema.
#[derive(Iden)]
pub enum StockTakingAssignments {
    Table,
    #[iden = "stock_taking_id"]
    StockTakingId,
    #[iden = "user_id"]
    UserId,
    #[iden = "assigned_at"]
    AssignedAt,
}

/// Stock taking items table schema.
#[derive(Iden)]
pub enum StockTakingItems {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "stock_taking_id"]
    StockTakingId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "expected_quantity"]
    ExpectedQuantity,
    #[iden = "counted_quantity"]
    CountedQuantity,
    #[iden = "counted_at"]
    CountedAt,
    #[iden = "counted_by"]
    CountedBy,
    #[iden = "notes"]
    Notes,
}

/// Notifications table schema.
#[derive(Iden)]
pub enum Notifications {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "user_id"]
    UserId,
    #[iden = "title"]
    Title,
    #[iden = "message"]
    Message,
    #[iden = "link"]
    Link,
    #[iden = "kind"]
    Kind,
    #[iden = "is_read"]
    IsRead,
    #[iden = "created_at"]
    CreatedAt,
}

/// Locations table schema (directory).
#[derive(Iden)]
pub enum Locations {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "code"]
    Code,
    #[iden = "name"]
    Name,
    #[iden = "created_at"]
    CreatedAt,
}

/// Products table schema (directory).
#[derive(Iden)]
pub enum Products {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "sku"]
    Sku,
    #[iden = "name"]
    Name,
    #[iden = "created_at"]
    CreatedAt,
}

/// Stocks table schema (directory).
#[derive(Iden)]
pub enum Stocks {
    Table,
    #[iden = "location_id"]
    LocationId,
    #[iden = "product_id"]
    ProductId,
    #[iden = "quantity"]
    Quantity,
    #[iden = "updated_at"]
    UpdatedAt,
}

/// Users table schema (directory).
#[derive(Iden)]
pub enum Users {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "display_name"]
    DisplayName,
    #[iden = "email"]
    Email,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating the stock takings table.
pub const CREATE_STOCK_TAKINGS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stock_takings (
    id TEXT NOT NULL PRIMARY KEY,
    location_id TEXT NOT NULL,
    status TEXT NOT NULL,
    requested_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT,
    notes TEXT
)
"#;

/// SQL for creating the assignments table.
pub const CREATE_ASSIGNMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stock_taking_assignments (
    stock_taking_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    assigned_at TEXT NOT NULL,
    PRIMARY KEY (stock_taking_id, user_id)
)
"#;

/// SQL for creating the items table.
pub const CREATE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stock_taking_items (
    id TEXT NOT NULL PRIMARY KEY,
    stock_taking_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    expected_quantity INTEGER NOT NULL,
    counted_quantity INTEGER,
    counted_at TEXT,
    counted_by TEXT,
    notes TEXT,
    UNIQUE (stock_taking_id, product_id)
)
"#;

/// SQL for the items-by-taking index.
pub const CREATE_ITEMS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_items_stock_taking ON stock_taking_items(stock_taking_id)";

/// SQL for creating the notifications table.
pub const CREATE_NOTIFICATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT NOT NULL PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    link TEXT,
    kind TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)
"#;

/// SQL for the notifications-by-user index.
pub const CREATE_NOTIFICATIONS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at)";

/// SQL for creating the locations table.
pub const CREATE_LOCATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS locations (
    id TEXT NOT NULL PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// SQL for creating the products table.
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    id TEXT NOT NULL PRIMARY KEY,
    sku TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;

/// SQL for creating the stocks table.
pub const CREATE_STOCKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS stocks (
    location_id TEXT NOT NULL,
    product_id TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (location_id, product_id)
)
"#;

/// SQL for creating the users table.
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT NOT NULL PRIMARY KEY,
    display_name TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL
)
"#;
