//! Domain-event ingestion
//!
//! Subscribes to the fixed set of account/contact/card topics under a single
//! consumer-group identity, so multiple service instances partition the
//! stream instead of duplicating it. Each message is mapped to zero or more
//! notification records by a pure per-topic transformation and handed to the
//! dispatcher, which persists and pushes them.
//!
//! Failure model: a bounded number of startup connection attempts, after
//! which ingestion is disabled while the rest of the service keeps serving;
//! per-message errors are logged and never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::message::Message;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::KafkaConfig;
use crate::error::AppError;
use crate::metrics;
use crate::models::{Notification, NotificationKind, NotificationPriority};
use crate::services::NotificationDispatcher;

/// Topics this service consumes
pub const EVENT_TOPICS: [&str; 11] = [
    "account-created",
    "account-deletion-requested",
    "contact-request-sent",
    "contact-request-accepted",
    "contact-request-rejected",
    "contact-blocked",
    "virtual-card-created",
    "virtual-card-blocked",
    "virtual-card-topped-up",
    "physical-card-requested",
    "virtual-card-deleted",
];

const BROKER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Consumer lifecycle, reported through a watch channel for health checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connecting,
    Listening,
    /// Connection attempts exhausted; the service keeps running without
    /// event-driven notifications
    Disabled,
}

impl ConsumerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Disconnected => "disconnected",
            ConsumerState::Connecting => "connecting",
            ConsumerState::Listening => "listening",
            ConsumerState::Disabled => "disabled",
        }
    }
}

/// Per-message outcome consumed by the ingestion loop
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload cannot be mapped to a notification (bad JSON, unknown
    /// topic, or no target account to address)
    #[error("malformed event payload: {0}")]
    Malformed(String),

    /// Store or registry failure while delivering mapped notifications
    #[error(transparent)]
    Infra(#[from] AppError),
}

// Event payloads. Field presence is not guaranteed anywhere upstream, so
// every field is optional; absent display values degrade into the
// notification content instead of failing the message.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreatedEvent {
    pub account_id: Option<String>,
    #[serde(rename = "kycstatus")]
    pub kyc_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDeletionRequestedEvent {
    pub account_id: Option<String>,
    pub scheduled_deletion: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequestSentEvent {
    pub addressee_id: Option<String>,
    pub omni_tag: Option<String>,
}

/// Shared by `contact-request-accepted` and `contact-request-rejected`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequestOutcomeEvent {
    pub requester_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactBlockedEvent {
    pub requester_id: Option<String>,
    pub addressee_id: Option<String>,
    pub blocked_by: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCardCreatedEvent {
    pub account_id: Option<String>,
    pub last_four_digits: Option<String>,
    pub card_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCardBlockedEvent {
    pub account_id: Option<String>,
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCardToppedUpEvent {
    pub account_id: Option<String>,
    pub amount: Option<f64>,
    pub new_balance: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalCardRequestedEvent {
    pub account_id: Option<String>,
    pub delivery_city: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualCardDeletedEvent {
    pub account_id: Option<String>,
    pub last_four_digits: Option<String>,
}

/// Map one domain event to the notifications it produces
///
/// Pure data transformation; persistence and fanout happen in the caller.
pub fn map_event(topic: &str, payload: &[u8]) -> Result<Vec<Notification>, EventError> {
    match topic {
        "account-created" => on_account_created(decode(payload)?),
        "account-deletion-requested" => on_account_deletion_requested(decode(payload)?),
        "contact-request-sent" => on_contact_request_sent(decode(payload)?),
        "contact-request-accepted" => on_contact_request_accepted(decode(payload)?),
        "contact-request-rejected" => on_contact_request_rejected(decode(payload)?),
        "contact-blocked" => on_contact_blocked(decode(payload)?),
        "virtual-card-created" => on_virtual_card_created(decode(payload)?),
        "virtual-card-blocked" => on_virtual_card_blocked(decode(payload)?),
        "virtual-card-topped-up" => on_virtual_card_topped_up(decode(payload)?),
        "physical-card-requested" => on_physical_card_requested(decode(payload)?),
        "virtual-card-deleted" => on_virtual_card_deleted(decode(payload)?),
        other => Err(EventError::Malformed(format!("unknown topic: {}", other))),
    }
}

fn decode<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, EventError> {
    serde_json::from_slice(payload)
        .map_err(|e| EventError::Malformed(format!("invalid event payload: {}", e)))
}

fn require(field: Option<String>, name: &str) -> Result<String, EventError> {
    field.ok_or_else(|| EventError::Malformed(format!("missing {}", name)))
}

fn on_account_created(event: AccountCreatedEvent) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let kyc_status = event.kyc_status.as_deref();
    let approved = kyc_status == Some("approved");

    let mut notifications = vec![
        Notification::new(
            &account_id,
            "Welcome to Omni!",
            "Your account has been successfully created. Complete your KYC to activate your wallet.",
        )
        .with_category("account")
        .with_kind(NotificationKind::Info)
        .with_icon("https://api.dicebear.com/7.x/initials/svg?seed=omni")
        .with_priority(NotificationPriority::High),
        Notification::new(
            &account_id,
            "Wallet Created",
            format!(
                "Your primary wallet has been created. Status: {}",
                if approved { "Active" } else { "Pending KYC approval" }
            ),
        )
        .with_category("wallet")
        .with_kind(if approved {
            NotificationKind::Success
        } else {
            NotificationKind::Info
        })
        .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=wallet"),
    ];

    match kyc_status {
        Some("pending") => notifications.push(
            Notification::new(
                &account_id,
                "KYC Verification Pending",
                "Please complete your KYC verification to activate full account features.",
            )
            .with_category("kyc")
            .with_kind(NotificationKind::Action)
            .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=kyc")
            .with_priority(NotificationPriority::High)
            .with_action_url("/kyc/verify"),
        ),
        Some("approved") => notifications.push(
            Notification::new(
                &account_id,
                "KYC Approved",
                "Your KYC verification has been approved. You now have full access to all features!",
            )
            .with_category("kyc")
            .with_kind(NotificationKind::Success)
            .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=verified")
            .with_priority(NotificationPriority::High),
        ),
        _ => {}
    }

    Ok(notifications)
}

fn on_account_deletion_requested(
    event: AccountDeletionRequestedEvent,
) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let content = match event.scheduled_deletion {
        Some(date) => format!(
            "Your account is scheduled for deletion on {}. You can cancel this at any time.",
            date
        ),
        None => "Your account is scheduled for deletion. You can cancel this at any time."
            .to_string(),
    };

    Ok(vec![Notification::new(
        &account_id,
        "Account Deletion Scheduled",
        content,
    )
    .with_category("security")
    .with_kind(NotificationKind::Warning)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=warning")
    .with_priority(NotificationPriority::High)
    .with_action_url("/account/cancel-deletion")])
}

fn on_contact_request_sent(event: ContactRequestSentEvent) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.addressee_id, "addresseeId")?;
    let content = match event.omni_tag {
        Some(tag) => format!("You received a contact request from @{}", tag),
        None => "You received a contact request.".to_string(),
    };

    Ok(vec![Notification::new(&account_id, "New Contact Request", content)
        .with_category("contact")
        .with_kind(NotificationKind::Action)
        .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=contact")
        .with_action_url("/contacts/pending")])
}

fn on_contact_request_accepted(
    event: ContactRequestOutcomeEvent,
) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.requester_id, "requesterId")?;

    Ok(vec![Notification::new(
        &account_id,
        "Contact Request Accepted",
        "Your contact request has been accepted!",
    )
    .with_category("contact")
    .with_kind(NotificationKind::Success)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=success")
    .with_action_url("/contacts")])
}

fn on_contact_request_rejected(
    event: ContactRequestOutcomeEvent,
) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.requester_id, "requesterId")?;

    Ok(vec![Notification::new(
        &account_id,
        "Contact Request Declined",
        "Your contact request was declined.",
    )
    .with_category("contact")
    .with_kind(NotificationKind::Info)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=info")
    .with_priority(NotificationPriority::Low)])
}

fn on_contact_blocked(event: ContactBlockedEvent) -> Result<Vec<Notification>, EventError> {
    // The blocker gets nothing; notify the other party
    let target = if event.blocked_by == event.requester_id {
        event.addressee_id
    } else {
        event.requester_id
    };
    let account_id = require(target, "blocked contact counterpart")?;

    Ok(vec![Notification::new(
        &account_id,
        "Contact Unavailable",
        "A contact is no longer available.",
    )
    .with_category("contact")
    .with_kind(NotificationKind::Warning)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=warning")
    .with_priority(NotificationPriority::Low)])
}

fn on_virtual_card_created(event: VirtualCardCreatedEvent) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let card_type = event.card_type.as_deref().unwrap_or("virtual");
    let last_four = event.last_four_digits.as_deref().unwrap_or("••••");

    Ok(vec![Notification::new(
        &account_id,
        "Virtual Card Created",
        format!(
            "Your new {} card ending in {} is ready to use!",
            card_type, last_four
        ),
    )
    .with_category("card")
    .with_kind(NotificationKind::Success)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=card")
    .with_priority(NotificationPriority::High)])
}

fn on_virtual_card_blocked(event: VirtualCardBlockedEvent) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let content = match event.block_reason {
        Some(reason) => format!("Your card has been blocked. Reason: {}", reason),
        None => "Your card has been blocked.".to_string(),
    };

    Ok(vec![Notification::new(&account_id, "Card Blocked", content)
        .with_category("card")
        .with_kind(NotificationKind::Warning)
        .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=blocked")
        .with_priority(NotificationPriority::High)])
}

fn on_virtual_card_topped_up(
    event: VirtualCardToppedUpEvent,
) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let amount = event
        .amount
        .map(|a| format!("${:.2}", a))
        .unwrap_or_else(|| "Funds".to_string());
    let balance = event
        .new_balance
        .map(|b| format!("${:.2}", b))
        .unwrap_or_else(|| "unavailable".to_string());

    Ok(vec![Notification::new(
        &account_id,
        "Card Topped Up",
        format!("{} added to your card. New balance: {}", amount, balance),
    )
    .with_category("card")
    .with_kind(NotificationKind::Success)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=money")])
}

fn on_physical_card_requested(
    event: PhysicalCardRequestedEvent,
) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let content = match event.delivery_city {
        Some(city) => format!(
            "Your physical card will be delivered to {}. Processing time: 7-10 business days.",
            city
        ),
        None => "Your physical card request has been received. Processing time: 7-10 business days."
            .to_string(),
    };

    Ok(vec![Notification::new(
        &account_id,
        "Physical Card Request Received",
        content,
    )
    .with_category("card")
    .with_kind(NotificationKind::Info)
    .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=delivery")])
}

fn on_virtual_card_deleted(event: VirtualCardDeletedEvent) -> Result<Vec<Notification>, EventError> {
    let account_id = require(event.account_id, "accountId")?;
    let content = match event.last_four_digits {
        Some(last_four) => format!(
            "Your card ending in {} has been permanently deleted.",
            last_four
        ),
        None => "Your card has been permanently deleted.".to_string(),
    };

    Ok(vec![Notification::new(&account_id, "Card Deleted", content)
        .with_category("card")
        .with_kind(NotificationKind::Info)
        .with_icon("https://api.dicebear.com/7.x/icons/svg?seed=delete")
        .with_priority(NotificationPriority::Low)])
}

/// Kafka consumer driving the ingestion pipeline
pub struct EventConsumer {
    config: KafkaConfig,
    dispatcher: Arc<NotificationDispatcher>,
    state_tx: watch::Sender<ConsumerState>,
}

impl EventConsumer {
    pub fn new(config: KafkaConfig, dispatcher: Arc<NotificationDispatcher>) -> Self {
        let (state_tx, _) = watch::channel(ConsumerState::Disconnected);
        Self {
            config,
            dispatcher,
            state_tx,
        }
    }

    /// Observe consumer state transitions (used by the health endpoint)
    pub fn state_watch(&self) -> watch::Receiver<ConsumerState> {
        self.state_tx.subscribe()
    }

    /// Consume until the shutdown signal fires
    ///
    /// In-flight message processing finishes before the loop exits; the
    /// subscription is dropped with the consumer.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let consumer = match self.connect(&mut shutdown).await {
            Some(consumer) => consumer,
            None => return,
        };

        if let Err(err) = consumer.subscribe(&EVENT_TOPICS) {
            error!("failed to subscribe to event topics: {}", err);
            self.state_tx.send_replace(ConsumerState::Disabled);
            return;
        }

        self.state_tx.send_replace(ConsumerState::Listening);
        info!(
            "event consumer listening on {} topics as group {}",
            EVENT_TOPICS.len(),
            self.config.consumer_group
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("event consumer received stop signal");
                    break;
                }
                message = consumer.recv() => match message {
                    Ok(message) => {
                        let topic = message.topic().to_string();
                        let payload = message.payload().map(<[u8]>::to_vec).unwrap_or_default();
                        drop(message);
                        self.process_message(&topic, &payload).await;
                    }
                    Err(err) => warn!("kafka consumer error: {}", err),
                },
            }
        }

        self.state_tx.send_replace(ConsumerState::Disconnected);
        info!("event consumer stopped");
    }

    async fn connect(&self, shutdown: &mut watch::Receiver<bool>) -> Option<StreamConsumer> {
        for attempt in 1..=self.config.connect_max_attempts {
            self.state_tx.send_replace(ConsumerState::Connecting);
            info!(
                "connecting to kafka broker {} (attempt {}/{})",
                self.config.broker, attempt, self.config.connect_max_attempts
            );

            match self.try_connect().await {
                Ok(consumer) => {
                    info!("connected to kafka broker {}", self.config.broker);
                    return Some(consumer);
                }
                Err(err) => warn!(
                    "failed to connect to kafka (attempt {}/{}): {}",
                    attempt, self.config.connect_max_attempts, err
                ),
            }

            if attempt < self.config.connect_max_attempts {
                tokio::select! {
                    _ = shutdown.changed() => {
                        self.state_tx.send_replace(ConsumerState::Disconnected);
                        return None;
                    }
                    _ = tokio::time::sleep(self.config.connect_retry_delay) => {}
                }
            }
        }

        error!(
            "kafka broker unreachable after {} attempts; event-driven notifications disabled",
            self.config.connect_max_attempts
        );
        self.state_tx.send_replace(ConsumerState::Disabled);
        None
    }

    async fn try_connect(&self) -> Result<StreamConsumer, AppError> {
        // Creating a StreamConsumer succeeds even with the broker down, so
        // probe with a metadata fetch first to get real connect-retry
        // semantics.
        let broker = self.config.broker.clone();
        tokio::task::spawn_blocking(move || {
            let probe: BaseConsumer = ClientConfig::new()
                .set("bootstrap.servers", &broker)
                .create()
                .map_err(|e| AppError::Broker(e.to_string()))?;
            probe
                .fetch_metadata(None, BROKER_PROBE_TIMEOUT)
                .map(|_| ())
                .map_err(|e| AppError::Broker(e.to_string()))
        })
        .await
        .map_err(|e| AppError::Internal(format!("broker probe task failed: {}", e)))??;

        ClientConfig::new()
            .set("bootstrap.servers", &self.config.broker)
            .set("group.id", &self.config.consumer_group)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .set("session.timeout.ms", "30000")
            .set("heartbeat.interval.ms", "10000")
            .create()
            .map_err(|e| AppError::Broker(e.to_string()))
    }

    async fn process_message(&self, topic: &str, payload: &[u8]) {
        match self.handle_event(topic, payload).await {
            Ok(count) => {
                metrics::observe_event(topic, "processed");
                debug!("{} event produced {} notification(s)", topic, count);
            }
            Err(EventError::Malformed(reason)) => {
                metrics::observe_event(topic, "malformed");
                warn!("skipping malformed {} event: {}", topic, reason);
            }
            Err(EventError::Infra(err)) => {
                metrics::observe_event(topic, "failed");
                error!("failed to deliver notifications for {} event: {}", topic, err);
            }
        }
    }

    async fn handle_event(&self, topic: &str, payload: &[u8]) -> Result<usize, EventError> {
        let notifications = map_event(topic, payload)?;
        let count = notifications.len();
        for notification in notifications {
            self.dispatcher.publish(notification).await?;
        }
        Ok(count)
    }
}
