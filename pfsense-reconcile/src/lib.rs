//! Declarative management of pfSense filter rules and user groups.
//!
//! Each desired entity is reconciled on its own: the owning configuration
//! section is read fresh from the appliance, the entity is located by its
//! natural key, the declared fields are diffed against what is there, and the
//! difference is compiled into one PHP script for the pfSense developer shell.
//! The section is read again afterwards so callers see what the appliance
//! actually holds.
//!
//! # Modules
//!
//! - [`entity`] — the [`Entity`](entity::Entity) trait and shared parameter
//!   handling
//! - [`rule`] — firewall filter rules, keyed by `tracker`
//! - [`group`] — user groups, keyed by `name`
//! - [`compile`] — change sets to guarded mutation scripts
//! - [`reconcile`] — the per-entity read, diff, apply, re-read cycle
//! - [`gateway`] — the appliance's shell, or an exported `config.xml`
//! - [`manifest`] — TOML declarations of desired entities
//! - [`report`] — terminal and JSON output
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//!
//! use pfsense_reconcile::gateway::SnapshotGateway;
//! use pfsense_reconcile::reconcile::Reconciler;
//! use pfsense_reconcile::rule::{FilterRule, RuleSpec};
//!
//! let mut gateway = SnapshotGateway::open(Path::new("config.xml"))?;
//! let rule = FilterRule::from_spec(&RuleSpec {
//!     tracker: Some("1542170888".into()),
//!     descr: Some("Web admin".to_string()),
//!     ..RuleSpec::default()
//! })?;
//! let outcome = Reconciler::new(&mut gateway).reconcile(&rule)?;
//! println!("changed={}", outcome.changed);
//! ```
//!
//! Generic document, diff and script handling lives in
//! `config-reconcile-core`; everything pfSense-specific is in this crate.

pub mod compile;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod group;
pub mod manifest;
pub mod reconcile;
pub mod report;
pub mod rule;
