//! Firewall filter rules.
//!
//! Rules live in `$config['filter']['rule']` and are addressed by their
//! `tracker`, a caller-chosen number (normally a creation timestamp) that is
//! expected to be unique across the appliance.
//!
//! ## Protocol and ICMP type
//!
//! `icmptype` only makes sense for ICMP rules. Whenever `protocol` is given
//! and is anything other than `icmp`, the rule is declared with `icmptype`
//! removed, whatever the caller passed.

use std::collections::BTreeMap;

use config_reconcile_core::{DesiredField, FieldValue};
use serde::Deserialize;

use crate::entity::{choice, required_choice, required_key, Entity, Scalar, State, Target};
use crate::error::ReconcileError;

pub const RULE_TYPES: &[&str] = &["pass", "block", "reject"];
pub const IP_PROTOCOLS: &[&str] = &["inet", "inet6", "inet46"];
pub const PROTOCOLS: &[&str] = &[
    "tcp", "udp", "tcp/udp", "icmp", "esp", "ah", "gre", "ipv6", "igmp", "ospf", "any", "carp",
    "pfsync",
];
pub const DIRECTIONS: &[&str] = &["any", "in", "out"];
pub const STATE_TYPES: &[&str] = &["keep state", "sloppy state", "synproxy state", "none"];

/// Rule parameters as written in a manifest, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub state: Option<String>,
    pub tracker: Option<Scalar>,
    #[serde(rename = "type")]
    pub action: Option<String>,
    pub disabled: Option<Scalar>,
    pub quick: Option<Scalar>,
    pub interface: Option<String>,
    pub ipprotocol: Option<String>,
    pub icmptype: Option<String>,
    pub protocol: Option<String>,
    pub direction: Option<String>,
    pub statetype: Option<String>,
    pub floating: Option<Scalar>,
    pub source: Option<BTreeMap<String, Scalar>>,
    pub destination: Option<BTreeMap<String, Scalar>>,
    pub log: Option<Scalar>,
    pub descr: Option<String>,
}

/// A validated filter rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    pub state: State,
    pub tracker: String,
    pub action: String,
    pub interface: String,
    pub ipprotocol: String,
    pub direction: String,
    pub statetype: String,
    pub protocol: Option<String>,
    pub icmptype: Option<String>,
    pub descr: Option<String>,
    pub log: Option<FieldValue>,
    pub disabled: Option<FieldValue>,
    pub quick: Option<FieldValue>,
    pub floating: bool,
    pub source: BTreeMap<String, String>,
    pub destination: BTreeMap<String, String>,
}

impl FilterRule {
    /// Validate manifest parameters and apply defaults.
    pub fn from_spec(spec: &RuleSpec) -> Result<Self, ReconcileError> {
        let state = State::parse(spec.state.as_deref())?;
        let tracker = required_key("tracker", spec.tracker.as_ref().map(ToString::to_string))?;

        let floating = match &spec.floating {
            None => false,
            Some(Scalar::Bool(true)) => true,
            Some(other) => {
                return Err(ReconcileError::Validation {
                    field: "floating".to_string(),
                    value: other.to_string(),
                    allowed: vec!["true".to_string()],
                })
            }
        };

        Ok(Self {
            state,
            tracker,
            action: required_choice("type", spec.action.as_deref(), "pass", RULE_TYPES)?,
            interface: spec.interface.clone().unwrap_or_else(|| "lan".to_string()),
            ipprotocol: required_choice(
                "ipprotocol",
                spec.ipprotocol.as_deref(),
                "inet",
                IP_PROTOCOLS,
            )?,
            direction: required_choice("direction", spec.direction.as_deref(), "any", DIRECTIONS)?,
            statetype: required_choice(
                "statetype",
                spec.statetype.as_deref(),
                "keep state",
                STATE_TYPES,
            )?,
            protocol: choice("protocol", spec.protocol.as_deref(), None, PROTOCOLS)?,
            icmptype: Some(spec.icmptype.clone().unwrap_or_else(|| "any".to_string())),
            descr: spec.descr.clone(),
            log: spec.log.as_ref().map(flag_value),
            disabled: spec.disabled.as_ref().map(flag_value),
            quick: spec.quick.as_ref().map(flag_value),
            floating,
            source: address(spec.source.as_ref()),
            destination: address(spec.destination.as_ref()),
        })
    }

    /// The `icmptype` declaration after the protocol exclusion rule.
    pub fn icmptype_value(&self) -> Option<FieldValue> {
        match self.protocol.as_deref() {
            Some(protocol) if protocol != "icmp" => Some(FieldValue::Unset),
            _ => self.icmptype.clone().map(FieldValue::Text),
        }
    }
}

impl Entity for FilterRule {
    const TARGET: Target = Target {
        kind: "rule",
        section: "filter",
        list: "rule",
        key_field: "tracker",
        local: "rule",
        dirty_subsystem: Some("filter"),
    };

    fn key(&self) -> &str {
        &self.tracker
    }

    fn state(&self) -> State {
        self.state
    }

    fn desired_fields(&self) -> Vec<DesiredField> {
        let mut fields = vec![
            DesiredField::text("type", &self.action),
            DesiredField::text("tracker", &self.tracker),
            DesiredField::text("ipprotocol", &self.ipprotocol),
            DesiredField::text("interface", &self.interface),
            DesiredField::text("direction", &self.direction),
            DesiredField::text("statetype", &self.statetype),
        ];

        if let Some(descr) = &self.descr {
            fields.push(DesiredField::text("descr", descr));
        }
        for (name, value) in [
            ("log", &self.log),
            ("disabled", &self.disabled),
            ("quick", &self.quick),
        ] {
            if let Some(value) = value {
                fields.push(DesiredField::new(name, value.clone()));
            }
        }
        if let Some(protocol) = &self.protocol {
            fields.push(DesiredField::text("protocol", protocol));
        }
        if let Some(icmptype) = self.icmptype_value() {
            fields.push(DesiredField::new("icmptype", icmptype));
        }
        if self.floating {
            fields.push(DesiredField::new("floating", FieldValue::Flag(true)));
        }
        fields.push(DesiredField::new(
            "source",
            FieldValue::Map(self.source.clone()),
        ));
        fields.push(DesiredField::new(
            "destination",
            FieldValue::Map(self.destination.clone()),
        ));
        fields
    }
}

/// Booleans declare presence flags; text is written verbatim.
fn flag_value(value: &Scalar) -> FieldValue {
    match value {
        Scalar::Bool(flag) => FieldValue::Flag(*flag),
        other => FieldValue::Text(other.to_string()),
    }
}

/// Address specs default to `any`.
fn address(spec: Option<&BTreeMap<String, Scalar>>) -> BTreeMap<String, String> {
    match spec {
        Some(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect(),
        None => BTreeMap::from([("any".to_string(), String::new())]),
    }
}
