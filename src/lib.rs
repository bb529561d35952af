pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::{EventConsumer, NotificationDispatcher};
pub use store::{MemoryNotificationStore, NotificationStore, RedisNotificationStore};
pub use websocket::{ConnectionRegistry, ServerMessage, WsSession};
