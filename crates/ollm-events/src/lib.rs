//! # ollm-events
//!
//! Single-process, priority-ordered pub/sub used to decouple the context
//! manager, snapshot store, and hook runner from their observers (UI,
//! session recorder).
//!
//! Dispatch is synchronous and ordered: for one emission, subscribers run
//! in descending priority (ties in registration order); across emissions,
//! delivery order is emission order. Handler failures are caught, logged,
//! and recorded in the bounded history ring without aborting dispatch.

#![deny(unsafe_code)]

mod bus;

pub use bus::{EventBus, HandlerResult, HistoryEntry, SubscriptionId, DEFAULT_HISTORY_SIZE};
