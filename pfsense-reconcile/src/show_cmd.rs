use anyhow::{Context, Result};
use pfsense_reconcile::entity::{Entity, Target};
use pfsense_reconcile::group::UserGroup;
use pfsense_reconcile::manifest::GatewaySettings;
use pfsense_reconcile::report::render_entities;
use pfsense_reconcile::rule::FilterRule;

use crate::cli::{OutputFormat, ShowArgs, ShowKind};
use crate::connect::Connection;

pub fn run_show(args: ShowArgs) -> Result<()> {
    let target: Target = match args.kind {
        ShowKind::Rules => FilterRule::TARGET,
        ShowKind::Groups => UserGroup::TARGET,
    };

    let mut connection = Connection::open(&args.gateway, &GatewaySettings::default())?;
    let gateway = connection.gateway();
    gateway.check()?;
    let document = gateway
        .read(target.section)
        .with_context(|| format!("failed to read section {}", target.section))?;
    let entities = document.record_values(target.list)?;

    match args.format {
        OutputFormat::Text => {
            if !entities.is_empty() {
                println!("{}", render_entities(&entities, target.key_field));
            }
            println!("{} {}(s)", entities.len(), target.kind);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entities)?),
    }
    Ok(())
}
