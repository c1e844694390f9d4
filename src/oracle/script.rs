/*!
Assembly of transient engine scripts.

A script is the base header (stripped of any goal directives), followed by the memory
section, followed by the directives tail.
Goal directives are controlled exclusively by the adapter, so `reach`, `cut`, and `at`
lines are stripped from the base configuration on load, and legacy directive spellings
are normalized.
*/

use std::path::Path;

use crate::types::err::{ConfigError, ErrorKind};

/// The directive sets of a run: shared, positive-goal, and negative-goal directives.
#[derive(Clone, Debug, Default)]
pub struct DirectiveSets {
    /// Directives applied to every query.
    pub all: Vec<String>,

    /// Directives of the positive (reach) goal.
    pub positive: Vec<String>,

    /// Directives of the negative (bug) goal.
    pub negative: Vec<String>,
}

pub fn read_file(path: &Path) -> Result<String, ErrorKind> {
    std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())).into())
}

/// Loads the base script, stripping goal directives.
pub fn load_base_script(path: &Path) -> Result<String, ErrorKind> {
    let mut lines = Vec::new();
    for line in read_file(path)?.lines() {
        let ldata = line.trim();
        if ldata.starts_with("reach ") || ldata.starts_with("cut ") || ldata.starts_with("at ") {
            continue;
        }
        lines.push(line.trim_end().to_owned());
    }
    Ok(format!("{}\n", lines.join("\n").trim()))
}

/// Normalizes one directive line; comments and blanks drop.
///
/// Legacy spellings `0xADDR reach`, `0xADDR cut`, and `0xADDR assume <expr>` are
/// rewritten into script syntax.
pub fn normalize_directive(line: &str) -> Option<String> {
    let ldata = line.trim();
    if ldata.is_empty() || ldata.starts_with('#') {
        return None;
    }
    if ldata.starts_with("0x") {
        if let Some((addr, expr)) = ldata.split_once(" assume ") {
            return Some(format!("at {} assume {}", addr.trim(), expr.trim()));
        }
        let mut words = ldata.split_whitespace();
        let addr = words.next()?;
        match words.next() {
            Some("reach") => return Some(format!("reach {addr}")),
            Some("cut") => return Some(format!("cut at {addr}")),
            _ => {}
        }
    }
    Some(ldata.to_owned())
}

/// Loads the directives file into its three sets.
///
/// A `+` prefix marks a positive-goal directive, `-` (or `−`) a negative-goal one.
pub fn load_directives(path: Option<&Path>) -> Result<DirectiveSets, ErrorKind> {
    let mut sets = DirectiveSets::default();
    let Some(path) = path else {
        return Ok(sets);
    };
    for line in read_file(path)?.lines() {
        let ldata = line.trim();
        if let Some(rest) = ldata.strip_prefix('+') {
            if let Some(norm) = normalize_directive(rest) {
                sets.positive.push(norm);
            }
        } else if let Some(rest) = ldata.strip_prefix('-').or_else(|| ldata.strip_prefix('−')) {
            if let Some(norm) = normalize_directive(rest) {
                sets.negative.push(norm);
            }
        } else if let Some(norm) = normalize_directive(ldata) {
            sets.all.push(norm);
        }
    }
    log::debug!(
        target: crate::misc::log::targets::ORACLE,
        "loaded directives: {} shared, {} positive, {} negative",
        sets.all.len(),
        sets.positive.len(),
        sets.negative.len(),
    );
    Ok(sets)
}

/// Normalizes one memory overlay line; blanks and legacy `controlled` lines drop.
///
/// The legacy `load @[addr,size] from file` spelling is rewritten into the native
/// `@[addr,size] := from_file` form.
pub fn normalize_memory_line(line: &str) -> Option<String> {
    let ldata = line.trim().trim_end_matches(';').trim_end();
    if ldata.is_empty() {
        return None;
    }
    if ldata.starts_with("controlled ") {
        // Robust mode declares controlled cells through the overlay instead.
        return None;
    }
    if ldata.starts_with("load @[") && ldata.contains(" from file") {
        let rewritten = ldata.replace("load ", "").replace(" from file", "");
        return Some(format!("{rewritten} := from_file"));
    }
    Some(ldata.to_owned())
}

/// Loads and normalizes the memory overlay.
pub fn load_memory_rules(path: &Path) -> Result<Vec<String>, ErrorKind> {
    let mut rules = Vec::new();
    for line in read_file(path)?.lines() {
        if let Some(rule) = normalize_memory_line(line) {
            rules.push(rule);
        }
    }
    Ok(rules)
}

/// Amends `reach` directives so the engine prints a model when the goal is reachable.
pub fn amend_print_model(directives: Vec<String>) -> Vec<String> {
    directives
        .into_iter()
        .map(|d| {
            if d.starts_with("reach ") && !d.contains("then print model") {
                format!("{d} then print model")
            } else {
                d
            }
        })
        .collect()
}

/// Composes the transient script text.
pub fn build_script(base: &str, memory_rules: &[String], directives: &[String]) -> String {
    let mut lines = vec![base.trim().to_owned()];
    lines.extend(memory_rules.iter().cloned());
    lines.extend(directives.iter().cloned());
    let body = lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n", body.trim())
}
