//! Desired state declared in a TOML manifest.
//!
//! ```toml
//! [gateway]
//! command = ["ssh", "root@fw.example.net"]
//!
//! [[group]]
//! name = "Staff"
//! priv = ["page-dashboard-all", "page-help-all"]
//!
//! [[rule]]
//! tracker = 1542170888
//! protocol = "tcp"
//! destination = { network = "(self)", port = 443 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::entity::Entity;
use crate::error::ReconcileError;
use crate::group::{GroupSpec, UserGroup};
use crate::rule::{FilterRule, RuleSpec};

/// How to reach the appliance, unless overridden on the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    /// Path of `pfSsh.php` on the appliance.
    pub shell: Option<PathBuf>,
    /// Command prefix used to run the shell, e.g. `["ssh", "root@fw"]`.
    #[serde(default)]
    pub command: Vec<String>,
    /// Exported `config.xml` to work on instead of a live appliance.
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default, rename = "group")]
    pub groups: Vec<GroupSpec>,
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleSpec>,
}

/// A validated entity ready to reconcile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesiredEntity {
    Group(UserGroup),
    Rule(FilterRule),
}

impl DesiredEntity {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Group(_) => UserGroup::TARGET.kind,
            Self::Rule(_) => FilterRule::TARGET.kind,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Group(group) => group.key(),
            Self::Rule(rule) => rule.key(),
        }
    }
}

impl Manifest {
    /// Validate every declared entity, groups first.
    ///
    /// Validation happens up front so a typo in the last rule stops the run
    /// before anything has been changed.
    pub fn entities(&self) -> Result<Vec<DesiredEntity>, ReconcileError> {
        let groups = self
            .groups
            .iter()
            .map(|spec| UserGroup::from_spec(spec).map(DesiredEntity::Group));
        let rules = self
            .rules
            .iter()
            .map(|spec| FilterRule::from_spec(spec).map(DesiredEntity::Rule));
        groups.chain(rules).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.rules.is_empty()
    }
}

/// Load a manifest from disk.
///
/// A relative snapshot path is taken relative to the manifest's directory.
pub fn load_manifest(path: &Path) -> Result<Manifest, ReconcileError> {
    let raw = fs::read_to_string(path).map_err(|err| ReconcileError::Manifest {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let mut manifest = parse_manifest(&raw, &path.display().to_string())?;

    if let Some(snapshot) = &manifest.gateway.snapshot {
        if snapshot.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            manifest.gateway.snapshot = Some(base.join(snapshot));
        }
    }
    Ok(manifest)
}

/// Decode manifest text; `origin` names the source in errors.
pub fn parse_manifest(raw: &str, origin: &str) -> Result<Manifest, ReconcileError> {
    toml::from_str(raw).map_err(|err| ReconcileError::Manifest {
        path: origin.to_string(),
        reason: err.to_string(),
    })
}
