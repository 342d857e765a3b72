use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::compile::Action;
use crate::reconcile::Outcome;

/// Counts across one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl Summary {
    pub fn from_outcomes(outcomes: &[Outcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome.action {
                Action::Create => summary.created += 1,
                Action::Update => summary.updated += 1,
                Action::Delete => summary.deleted += 1,
                Action::None => summary.unchanged += 1,
            }
        }
        summary
    }

    pub fn changed(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// JSON document printed by `apply --format json`.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub check_mode: bool,
    pub changed: bool,
    pub summary: Summary,
    pub outcomes: &'a [Outcome],
}

impl<'a> RunReport<'a> {
    pub fn new(outcomes: &'a [Outcome], check_mode: bool) -> Self {
        let summary = Summary::from_outcomes(outcomes);
        Self {
            check_mode,
            changed: summary.changed() > 0,
            summary,
            outcomes,
        }
    }
}

/// Render outcomes for terminal output.
///
/// Scripts are only shown when `show_scripts` is set or in check mode, where
/// they are the point of the run.
pub fn render_outcomes(outcomes: &[Outcome], show_scripts: bool) -> String {
    let mut out = Vec::new();
    for outcome in outcomes {
        let label = match outcome.action {
            Action::Create => "CREATE".green(),
            Action::Update => "UPDATE".yellow(),
            Action::Delete => "DELETE".red(),
            Action::None => "OK".normal(),
        };
        let mut line = format!("{label} {} {}", outcome.kind, outcome.key);
        if !outcome.changed_fields.is_empty() {
            line.push_str(&format!(" fields={}", outcome.changed_fields.join(",")));
        }
        out.push(line);

        if (show_scripts || outcome.check_mode) && !outcome.script.is_empty() {
            for script_line in outcome.script.lines() {
                out.push(format!("    {}", script_line.dimmed()));
            }
        }
    }
    out.join("\n")
}

/// Render the one-line run summary.
pub fn render_summary(summary: &Summary, check_mode: bool) -> String {
    let prefix = if check_mode { "plan" } else { "result" };
    format!(
        "{prefix} created={} updated={} deleted={} unchanged={}",
        summary.created, summary.updated, summary.deleted, summary.unchanged
    )
    .cyan()
    .to_string()
}

/// Render section entities as `key field=value ...` lines.
pub fn render_entities(entities: &[Value], key_field: &str) -> String {
    let mut out = Vec::new();
    for entity in entities {
        let Some(record) = entity.as_object() else {
            continue;
        };
        let key = record
            .get(key_field)
            .map(display_value)
            .unwrap_or_else(|| "?".to_string());
        let fields: Vec<String> = record
            .iter()
            .filter(|(name, _)| name.as_str() != key_field)
            .map(|(name, value)| format!("{name}={}", display_value(value)))
            .collect();
        out.push(format!("{} {}", key.bold(), fields.join(" ")));
    }
    out.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) if text.contains(' ') => format!("{text:?}"),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
