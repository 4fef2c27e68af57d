//! Orchestration services.
//!
//! [`StockTakingService`] owns the lifecycle state machine;
//! [`NotificationService`] couples durable notification records with
//! best-effort hub delivery.

pub mod notification;
pub mod stock_taking;

pub use notification::NotificationService;
pub use stock_taking::{LifecycleError, StockTakingService};
