use std::path::Path;

use anyhow::{Context, Result};
use pfsense_reconcile::error::ReconcileError;
use pfsense_reconcile::gateway::Gateway;
use pfsense_reconcile::manifest::{load_manifest, DesiredEntity};
use pfsense_reconcile::reconcile::{Outcome, Reconciler};
use pfsense_reconcile::report::{render_outcomes, render_summary, RunReport, Summary};
use tracing::info;

use crate::cli::{ApplyArgs, GatewayArgs, OutputFormat, PlanArgs};
use crate::connect::Connection;

pub fn run_apply(args: ApplyArgs) -> Result<()> {
    run(
        &args.manifest,
        &args.gateway,
        args.check,
        args.format,
        args.show_scripts,
    )
}

pub fn run_plan(args: PlanArgs) -> Result<()> {
    run(&args.manifest, &args.gateway, true, args.format, true)
}

fn run(
    manifest_path: &Path,
    gateway_args: &GatewayArgs,
    check: bool,
    format: OutputFormat,
    show_scripts: bool,
) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let entities = manifest.entities().with_context(|| {
        format!("invalid entity in manifest {}", manifest_path.display())
    })?;
    let mut connection = Connection::open(gateway_args, &manifest.gateway)?;

    info!(entities = entities.len(), check, "reconciling manifest");
    let (outcomes, failure) = reconcile_all(connection.gateway(), &entities, check);

    // Earlier entities stay applied after a failure, as on a live appliance.
    if !check {
        connection.finish(gateway_args.write)?;
    }

    match format {
        OutputFormat::Text => {
            if !outcomes.is_empty() {
                println!("{}", render_outcomes(&outcomes, show_scripts));
            }
            println!("{}", render_summary(&Summary::from_outcomes(&outcomes), check));
        }
        OutputFormat::Json => {
            let report = RunReport::new(&outcomes, check);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    match failure {
        Some((entity, err)) => {
            if let Some(output) = err.diagnostic_output() {
                eprintln!("{}", output.trim_end());
            }
            Err(err).with_context(|| format!("failed to reconcile {entity}"))
        }
        None => Ok(()),
    }
}

/// Reconcile entities in order, stopping at the first failure.
fn reconcile_all(
    gateway: &mut dyn Gateway,
    entities: &[DesiredEntity],
    check: bool,
) -> (Vec<Outcome>, Option<(String, ReconcileError)>) {
    let mut reconciler = Reconciler::new(gateway).check_mode(check);
    let mut outcomes = Vec::new();
    for entity in entities {
        let result = match entity {
            DesiredEntity::Group(group) => reconciler.reconcile(group),
            DesiredEntity::Rule(rule) => reconciler.reconcile(rule),
        };
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => {
                let label = format!("{} '{}'", entity.kind(), entity.key());
                return (outcomes, Some((label, err)));
            }
        }
    }
    (outcomes, None)
}
