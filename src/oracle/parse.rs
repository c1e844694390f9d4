/*!
Parsing of engine logs.

The engine emits `[switch:level]`-prefixed chunks.
Of interest here:
- `sse` chunks holding `Model @ <addr>` blocks of `key: value` lines, and the goal
  unreachable marker.
- `checkct` chunks holding the program status line and leak records.

The grammar is narrow, so parsing is hand-written; anything else is ignored as
malformed input.
*/

use std::collections::BTreeMap;

use serde::Serialize;

use crate::misc::log::targets::{self};

/// A model block recovered from a log, keyed by engine-reported identifiers.
#[derive(Clone, Debug, Default)]
pub struct RawModel {
    /// The address the model was reported at.
    pub location: String,

    /// Bindings as reported, after key and value normalization.
    pub bindings: BTreeMap<String, String>,
}

/// A leak record from a constant-time check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeakRecord {
    /// The leaking instruction address.
    pub instruction: String,

    /// The reported leak kind.
    pub kind: String,

    /// The raw log line.
    pub raw: String,
}

/// The parse of one engine log.
#[derive(Default)]
pub struct LogParse {
    /// Model blocks, in log order.
    pub models: Vec<RawModel>,

    /// Whether the goal unreachable marker was seen.
    pub goal_unreachable: bool,

    /// The constant-time program status, when reported.
    pub ct_status: Option<String>,

    /// Leak records, in log order.
    pub ct_leaks: Vec<LeakRecord>,
}

/// A `[switch:level]` delimited chunk.
struct LogChunk<'a> {
    switch: &'a str,
    data: &'a str,
}

/// Matches a `[word:word]` header at `start`, returning the switch and the end offset.
fn match_chunk_header(data: &str, start: usize) -> Option<(&str, usize)> {
    let rest = &data[start..];
    if !rest.starts_with('[') {
        return None;
    }
    let colon = rest.find(':')?;
    let close = rest.find(']')?;
    if colon == 1 || close <= colon + 1 {
        return None;
    }
    let switch = &rest[1..colon];
    let level = &rest[colon + 1..close];
    let word = |s: &str| s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !word(switch) || !word(level) {
        return None;
    }
    Some((switch, start + close + 1))
}

fn chunks(data: &str) -> Vec<LogChunk> {
    let mut headers = Vec::new();
    for (offset, _) in data.match_indices('[') {
        if let Some((switch, end)) = match_chunk_header(data, offset) {
            headers.push((offset, end, switch));
        }
    }

    let mut found = Vec::new();
    for (index, (_, end, switch)) in headers.iter().enumerate() {
        let until = match headers.get(index + 1) {
            Some((next_start, _, _)) => next_start.saturating_sub(1),
            None => data.len(),
        };
        found.push(LogChunk {
            switch,
            data: data[*end..until].trim(),
        });
    }
    found
}

/// Parses an engine log, applying a key translation to recovered models.
pub fn parse_engine_log(data: &str, translation: &BTreeMap<String, String>) -> LogParse {
    let mut parse = LogParse::default();
    let mut pending_model: Option<RawModel> = None;

    for chunk in chunks(data) {
        match chunk.switch {
            "sse" => {
                let head = chunk
                    .data
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                match head.as_str() {
                    "model" => {
                        if let Some(model) = pending_model.take() {
                            parse.models.push(model);
                        }
                        pending_model = Some(parse_model_chunk(chunk.data, translation));
                    }
                    "goal" => {
                        if chunk.data == "Goal unreachable." {
                            parse.goal_unreachable = true;
                        }
                    }
                    _ => {}
                }
            }

            "checkct" => parse_checkct_chunk(chunk.data, &mut parse),

            _ => {}
        }
    }

    if let Some(model) = pending_model.take() {
        parse.models.push(model);
    }
    log::debug!(
        target: targets::ORACLE,
        "log parsed: {} models, unreachable={}, ct={:?}",
        parse.models.len(),
        parse.goal_unreachable,
        parse.ct_status,
    );
    parse
}

fn parse_checkct_chunk(data: &str, parse: &mut LogParse) {
    for line in data.lines() {
        let ldata = line.trim();
        if ldata.is_empty() {
            continue;
        }
        if let Some(status) = parse_program_status(ldata) {
            parse.ct_status = Some(status);
        }
        if let Some(leak) = parse_leak_record(ldata) {
            parse.ct_leaks.push(leak);
        }
    }
}

/// Parses a `Program status is: secure|insecure|unknown` line.
fn parse_program_status(line: &str) -> Option<String> {
    let lower = line.to_ascii_lowercase();
    let at = lower.find("program status is")?;
    let rest = &lower[at + "program status is".len()..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    for status in ["insecure", "secure", "unknown"] {
        if rest.starts_with(status) {
            return Some(status.to_owned());
        }
    }
    None
}

/// Parses an `Instruction <addr> has <kind> leak` line.
fn parse_leak_record(line: &str) -> Option<LeakRecord> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let at = words
        .iter()
        .position(|w| w.eq_ignore_ascii_case("instruction"))?;
    let instruction = words.get(at + 1)?;
    if !instruction
        .chars()
        .all(|c| c.is_ascii_hexdigit() || c == 'x')
    {
        return None;
    }
    if !words.get(at + 2)?.eq_ignore_ascii_case("has") {
        return None;
    }
    let leak = words
        .iter()
        .skip(at + 3)
        .position(|w| w.to_ascii_lowercase().starts_with("leak"))?;
    let kind = words[at + 3..at + 3 + leak].join(" ");
    if kind.is_empty() {
        return None;
    }
    Some(LeakRecord {
        instruction: (*instruction).to_owned(),
        kind,
        raw: line.to_owned(),
    })
}

/// Parses a model block.
fn parse_model_chunk(data: &str, translation: &BTreeMap<String, String>) -> RawModel {
    let mut model = RawModel::default();

    // `Model @ <addr>`
    model.location = data
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(2))
        .unwrap_or("unlocated")
        .to_owned();

    for line in data.lines() {
        let Some((key_part, value_part)) = line.split_once(':') else {
            continue;
        };
        if key_part.split_whitespace().count() > 1 {
            // Not a binding line (e.g. the header itself).
            continue;
        }
        let key_part = key_part.trim();
        let value_part = value_part.trim();
        if key_part.is_empty() || value_part.is_empty() {
            continue;
        }

        if value_part.contains(';') && !value_part.contains("(;)") {
            // A register line: `name : {value; size}`.
            if let Some((key, value)) = parse_register_binding(key_part, value_part) {
                model.bindings.insert(key, value);
            }
        } else {
            // A memory line: `addr : value [trailing ascii]`.
            let key = normalize_key(key_part);
            if let Some(first) = value_part.split_whitespace().next() {
                model.bindings.insert(key, normalize_value(first));
            }
        }
    }

    for (from, to) in translation {
        if let Some(value) = model.bindings.remove(from) {
            model.bindings.insert(to.clone(), value);
        }
    }

    log::debug!(target: targets::ORACLE, "model recovered at {}: {} bindings", model.location, model.bindings.len());
    model
}

/// Recovers a register binding, undoing engine name mangling.
fn parse_register_binding(name: &str, value: &str) -> Option<(String, String)> {
    let mut rname = name.to_owned();
    if let Some(stripped) = rname.strip_prefix("bs_unknown1_for_") {
        rname = stripped.trim_start_matches('_').to_owned();
    }
    if let Some(stripped) = rname.strip_prefix("undef_AF_1___") {
        rname = format!("0x{stripped}");
    }
    if let Some(head) = rname.split('_').next() {
        rname = head.to_owned();
    }
    let rname = normalize_key(&rname);
    if rname.starts_with("dummy") || rname.starts_with("bs") || rname.is_empty() {
        return None;
    }
    let content = value.replace(['{', '}'], "");
    let rvalue = content.split(';').next()?.trim().to_owned();
    Some((rname, normalize_value(&rvalue)))
}

/// `#x`-prefixed keys become `0x`; SSA tags (`!n`) are stripped.
fn normalize_key(key: &str) -> String {
    let mut key = key.trim().to_owned();
    if let Some(hex) = key.strip_prefix("#x") {
        key = format!("0x{hex}");
    }
    if let Some((head, _)) = key.split_once('!') {
        key = head.to_owned();
    }
    key
}

/// Bare hex values gain a `0x` prefix, SMT-style `#x` values are respelled, and
/// spelled values are kept.
fn normalize_value(value: &str) -> String {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix("#x") {
        return format!("0x{hex}");
    }
    if value.starts_with("0x") || value.starts_with("0b") {
        return value.to_owned();
    }
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()) {
        return format!("0x{value}");
    }
    value.to_owned()
}
