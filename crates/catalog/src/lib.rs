//! `configserver-catalog`: configuration groups, items and the audit model.
//!
//! Pure domain types: validation, identity and snapshot formatting. Storage
//! and orchestration live in `configserver-infra`.

pub mod audit;
pub mod environment;
pub mod group;
pub mod item;

pub use audit::{ActingUser, AuditAction, AuditEntry, Audited, EntityType, SYSTEM_ACTOR};
pub use environment::Environment;
pub use group::{Group, GroupDraft};
pub use item::{Item, ItemDraft, ItemScope};
