//! # a3s-chatroom
//!
//! Session directory, membership, and message routing for ephemeral group chat.
//!
//! ## Overview
//!
//! `a3s-chatroom` is the server-side core of a multi-room chat service. It
//! tracks which sessions (rooms) exist and who created them, who currently
//! occupies each one, and routes broadcast or direct messages back to
//! clients through a push handle. Transports and UIs live outside; they
//! talk to the core through [`ChatService`] and receive pushes through
//! [`ClientHandle`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use a3s_chatroom::{ChannelHandle, ClientEvent, EnterOutcome, SessionCoordinator};
//!
//! # async fn example() -> a3s_chatroom::Result<()> {
//! let coordinator = SessionCoordinator::default();
//!
//! coordinator.client_start("alice")?;
//! coordinator.client_start("bob")?;
//! coordinator.create_session("lobby", "alice").await?;
//!
//! let (bob, mut bob_events) = ChannelHandle::new();
//! let outcome = coordinator.enter_session("lobby", "bob", Arc::new(bob)).await?;
//! assert_eq!(outcome, EnterOutcome::Entered(vec!["bob".to_string()]));
//!
//! coordinator.send_message("lobby", "bob", "", "hello").await?;
//! assert!(matches!(bob_events.recv().await, Some(ClientEvent::Deliver { .. })));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **SessionCoordinator** — entry point; owns the session table and
//!   sequences multi-step operations
//! - **Session** — one room's participants, each room with its own lock
//! - **SubscriptionRegistry** — directory (name → creator) and
//!   directory-change subscribers
//! - **PositionTracker** — which session each client occupies
//! - **ClientHandle** — push capability back to a client; deliveries are
//!   best-effort and never abort a fan-out

pub mod config;
pub mod coordinator;
pub mod delivery;
pub mod error;
pub mod handle;
pub mod message;
pub mod position;
pub mod registry;
pub mod service;
pub mod session;
pub mod types;

// Re-export core types
pub use config::{CoordinatorConfig, CreatorMatch};
pub use coordinator::SessionCoordinator;
pub use delivery::{Delivery, DeliveryFailure, DeliveryReport};
pub use error::{ChatError, Result};
pub use handle::{ChannelHandle, ClientEvent, ClientHandle};
pub use position::PositionTracker;
pub use registry::{Announcement, SubscriptionRegistry};
pub use service::ChatService;
pub use session::Session;
pub use types::{ClientLocation, DirectoryEntry, EnterOutcome, NOT_FOUND_SENTINEL};
