use std::collections::BTreeMap;

use crate::script::statement::{ConfigPath, Literal, Statement};
use crate::script::{Script, STALE_SENTINEL};

/// Render a script to PHP for the pfSense developer shell.
///
/// Guards are hoisted into a single `if` around every other statement, so a
/// stale position leaves the configuration untouched and echoes
/// [`STALE_SENTINEL`] instead. An empty script renders to an empty string.
pub fn render(script: &Script) -> String {
    let guards: Vec<String> = script
        .statements()
        .iter()
        .filter_map(guard_condition)
        .collect();
    let body: Vec<String> = script
        .statements()
        .iter()
        .filter(|statement| !statement.is_guard())
        .map(render_statement)
        .collect();

    if guards.is_empty() {
        return body.into_iter().map(|line| line + "\n").collect();
    }

    let mut out = format!("if ({}) {{\n", guards.join(" && "));
    for line in body {
        out.push_str("    ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("} else {\n");
    out.push_str(&format!("    echo \"\\n{STALE_SENTINEL}\\n\";\n"));
    out.push_str("}\n");
    out
}

fn guard_condition(statement: &Statement) -> Option<String> {
    let Statement::Guard {
        path,
        position,
        field,
        expected,
    } = statement
    else {
        return None;
    };
    let target = format!("{}[{position}][{}]", config_ref(path), quote(field));
    Some(format!(
        "isset({target}) && strval({target}) === {}",
        quote(expected)
    ))
}

fn render_statement(statement: &Statement) -> String {
    match statement {
        Statement::NewLocal { var } => format!("${var} = array();"),
        Statement::SetLocal { var, field, value } => {
            format!("${var}[{}] = {};", quote(field), literal(value))
        }
        Statement::Guard { .. } => String::new(),
        Statement::SetField {
            path,
            position,
            field,
            value,
        } => format!(
            "{}[{position}][{}] = {};",
            config_ref(path),
            quote(field),
            literal(value)
        ),
        Statement::UnsetField {
            path,
            position,
            field,
        } => format!("unset({}[{position}][{}]);", config_ref(path), quote(field)),
        Statement::EnsureSequence { path } => {
            let segments: Vec<String> = path.segments().iter().map(|s| quote(s)).collect();
            format!("init_config_arr(array({}));", segments.join(", "))
        }
        Statement::Append { path, var } => format!("{}[] = ${var};", config_ref(path)),
        Statement::Remove { path, position } => {
            format!("unset({}[{position}]);", config_ref(path))
        }
        Statement::Increment { path } => format!("{}++;", config_ref(path)),
        Statement::Persist { description } => format!("write_config({});", quote(description)),
        Statement::MarkDirty { subsystem } => {
            format!("mark_subsystem_dirty({});", quote(subsystem))
        }
    }
}

fn config_ref(path: &ConfigPath) -> String {
    let mut out = String::from("$config");
    for segment in path.segments() {
        out.push('[');
        out.push_str(&quote(segment));
        out.push(']');
    }
    out
}

fn literal(value: &Literal) -> String {
    match value {
        Literal::Text(text) => quote(text),
        Literal::Bool(flag) => flag.to_string(),
        Literal::List(items) => {
            let items: Vec<String> = items.iter().map(|item| quote(item)).collect();
            format!("[{}]", items.join(", "))
        }
        Literal::Map(map) => map_literal(map),
    }
}

fn map_literal(map: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{} => {}", quote(key), quote(value)))
        .collect();
    format!("[{}]", pairs.join(", "))
}

/// Single-quoted PHP string literal. Only `\` and `'` are special there.
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for ch in raw.chars() {
        if ch == '\\' || ch == '\'' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}
