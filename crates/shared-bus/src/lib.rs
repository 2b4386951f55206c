//! # Shared Bus - Event Bus for Component Communication
//!
//! The chain, the peer directory, the transaction pool and the sync driver
//! never call each other directly for notifications. They publish events
//! here and subscribe to the topics they care about.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │  Component A │                    │  Component B │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - Every subscriber sees every matching event published after it subscribed.
//! - A slow subscriber that falls more than the channel capacity behind skips
//!   the oldest events and counts them in `Subscription::missed`. Consumers
//!   must tolerate gaps; all handlers here are idempotent or advisory.
//! - Events on a topic no live subscription accepts are dropped at publish
//!   time and never take channel space.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{BlockAddedEvent, BlockchainEvent, EventFilter, EventSource, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
