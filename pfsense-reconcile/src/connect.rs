use anyhow::{bail, Context, Result};
use pfsense_reconcile::gateway::{Gateway, ShellGateway, SnapshotGateway};
use pfsense_reconcile::manifest::GatewaySettings;
use tracing::debug;

use crate::cli::GatewayArgs;

/// The gateway chosen for one invocation.
pub enum Connection {
    Shell(ShellGateway),
    Snapshot(SnapshotGateway),
}

impl Connection {
    /// Pick a gateway from command-line flags, falling back to the manifest.
    ///
    /// `--snapshot` wins outright. Any shell flag ignores a manifest snapshot.
    pub fn open(args: &GatewayArgs, settings: &GatewaySettings) -> Result<Self> {
        let shell_flags = args.shell.is_some() || !args.prefix.is_empty();
        let snapshot = match &args.snapshot {
            Some(path) => Some(path),
            None if shell_flags => None,
            None => settings.snapshot.as_ref(),
        };

        if let Some(path) = snapshot {
            debug!(path = %path.display(), "using snapshot gateway");
            let gateway = SnapshotGateway::open(path)
                .with_context(|| format!("failed to open snapshot {}", path.display()))?;
            return Ok(Self::Snapshot(gateway));
        }
        if args.write {
            bail!("--write needs a snapshot gateway");
        }

        let mut gateway = match args.shell.as_ref().or(settings.shell.as_ref()) {
            Some(shell) => ShellGateway::new(shell),
            None => ShellGateway::default(),
        };
        let prefix = if args.prefix.is_empty() {
            settings.command.clone()
        } else {
            args.prefix.clone()
        };
        if !prefix.is_empty() {
            gateway = gateway.with_prefix(prefix);
        }
        debug!(shell = %gateway.shell().display(), "using shell gateway");
        Ok(Self::Shell(gateway))
    }

    pub fn gateway(&mut self) -> &mut dyn Gateway {
        match self {
            Self::Shell(gateway) => gateway,
            Self::Snapshot(gateway) => gateway,
        }
    }

    /// Persist a modified snapshot when `write` is set.
    pub fn finish(&self, write: bool) -> Result<()> {
        if let Self::Snapshot(snapshot) = self {
            if write && snapshot.is_modified() {
                snapshot.save().context("failed to write snapshot")?;
            }
        }
        Ok(())
    }
}
