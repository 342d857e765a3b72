//! Reconciliation of one desired entity against the appliance.
//!
//! ```text
//! check -> read -> locate -> diff -> compile -+-> (check mode) stop
//!                                             +-> exec (if any) -> re-read
//! ```
//!
//! Every invocation reads its section fresh. Nothing is cached between
//! entities, so each reconciliation sees the effects of the previous one.

use config_reconcile_core::{diff, locate, ChangeSet, Document, Position, Script};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::compile::{compile, Action};
use crate::entity::{Entity, State};
use crate::error::ReconcileError;
use crate::gateway::Gateway;

/// What reconciling one entity did, or would do in check mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub kind: String,
    pub key: String,
    pub state: State,
    pub action: Action,
    pub changed: bool,
    pub changed_fields: Vec<String>,
    /// Rendered mutation script; empty when nothing had to change.
    pub script: String,
    pub check_mode: bool,
    /// Section entities read back after the run. Not collected in check mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
}

/// The decision for one entity against one document, before anything runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    pub position: Option<Position>,
    pub changes: ChangeSet,
    pub script: Script,
}

/// Work out what has to happen to bring `document` in line with `entity`.
pub fn plan<E: Entity>(entity: &E, document: &Document) -> Result<Plan, ReconcileError> {
    let target = E::TARGET;
    let located = locate(document, target.list, target.key_field, entity.key())
        .map_err(|err| ReconcileError::malformed(err, document, target.list))?;
    let position = located.map(|found| found.position);
    debug!(
        kind = target.kind,
        key = entity.key(),
        position = ?position,
        "located entity"
    );

    let (changes, extras) = match entity.state() {
        State::Absent => (ChangeSet::default(), Vec::new()),
        State::Present => {
            let changes = diff(&entity.desired_fields(), located.map(|found| found.record));
            let extras = if located.is_none() {
                entity.creation_extras(document)?
            } else {
                Vec::new()
            };
            (changes, extras)
        }
    };
    debug!(fields = ?changes.changed_names(), "computed change set");

    let (action, script) = compile(
        &target,
        entity.key(),
        position,
        entity.state(),
        &changes,
        extras,
    );
    Ok(Plan {
        action,
        position,
        changes,
        script,
    })
}

/// Drives entities through a gateway.
pub struct Reconciler<'g, G: Gateway + ?Sized> {
    gateway: &'g mut G,
    check_mode: bool,
}

impl<'g, G: Gateway + ?Sized> Reconciler<'g, G> {
    pub fn new(gateway: &'g mut G) -> Self {
        Self {
            gateway,
            check_mode: false,
        }
    }

    /// Compute scripts without executing them.
    pub fn check_mode(mut self, enabled: bool) -> Self {
        self.check_mode = enabled;
        self
    }

    pub fn reconcile<E: Entity>(&mut self, entity: &E) -> Result<Outcome, ReconcileError> {
        let target = E::TARGET;
        self.gateway.check()?;

        let document = self.gateway.read(target.section)?;
        let plan = plan(entity, &document)?;
        let changed = !plan.script.is_empty();

        let mut outcome = Outcome {
            kind: target.kind.to_string(),
            key: entity.key().to_string(),
            state: entity.state(),
            action: plan.action,
            changed,
            changed_fields: plan.changes.changed_names(),
            script: plan.script.render(),
            check_mode: self.check_mode,
            entities: None,
        };

        if self.check_mode {
            debug!(kind = target.kind, key = entity.key(), changed, "check mode, not applying");
            return Ok(outcome);
        }

        if changed {
            let output = self.gateway.exec(&plan.script)?;
            if !output.success() {
                return Err(ReconcileError::Transport {
                    context: "writing config".to_string(),
                    code: output.code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                });
            }
            if output.stale() {
                warn!(
                    kind = target.kind,
                    key = entity.key(),
                    "record moved before the script ran"
                );
                return Err(ReconcileError::Conflict {
                    kind: target.kind.to_string(),
                    key: entity.key().to_string(),
                });
            }
            info!(
                kind = target.kind,
                key = entity.key(),
                action = ?plan.action,
                "applied change"
            );
        }

        let reread = self.gateway.read(target.section)?;
        let entities = reread
            .record_values(target.list)
            .map_err(|err| ReconcileError::malformed(err, &reread, target.list))?;
        outcome.entities = Some(entities);
        Ok(outcome)
    }
}
