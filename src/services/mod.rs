pub mod dispatcher;
pub mod kafka_consumer;

pub use dispatcher::NotificationDispatcher;
pub use kafka_consumer::{map_event, ConsumerState, EventConsumer, EventError, EVENT_TOPICS};
