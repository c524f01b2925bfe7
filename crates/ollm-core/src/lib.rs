//! # ollm-core
//!
//! Foundation types and utilities for the OLLM agent runtime.
//!
//! This crate provides the shared vocabulary that all other OLLM crates
//! depend on:
//!
//! - **Branded IDs**: [`ids::SessionId`], [`ids::SnapshotId`],
//!   [`ids::CheckpointId`], [`ids::HookId`] as newtypes
//! - **Messages**: [`messages::Message`] with role, ordered parts, a cached
//!   token count, and the preservation flag the compressor honours
//! - **Conversation**: [`conversation::Conversation`] owning its message and
//!   checkpoint sequences, plus the [`conversation::Mode`] and
//!   [`conversation::Tier`] enumerations
//! - **Checkpoints**: [`checkpoint::Checkpoint`] summaries and the ordered
//!   [`checkpoint::CheckpointStore`] with age/merge policies
//! - **Bus events**: [`events::BusEvent`] payloads shared by every publisher
//! - **Token counting**: [`tokens::SurrogateCounter`], the deterministic
//!   budgeting surrogate
//! - **Text**: UTF-8-safe truncation helpers in [`text`]
//!
//! ## Crate position
//!
//! Foundation crate. Depended on by all other ollm crates.

#![deny(unsafe_code)]

pub mod checkpoint;
pub mod conversation;
pub mod events;
pub mod ids;
pub mod messages;
pub mod text;
pub mod tokens;
