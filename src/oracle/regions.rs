/*!
Discovery of canonical input regions.

When the literals file declares no explicit variable, the variable set is derived from
the program's input surface: file-backed memory ranges of the overlay, and exported
stub/public symbols of the binary.
Regions are chunked into 4-byte words plus trailing tail bytes, capped per region, to
keep the variable model small and word-centric.
*/

use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

use crate::misc::log::targets::{self};

use super::script::normalize_memory_line;

/// Regions declared `from_file` in the memory overlay.
pub fn memory_input_regions(memory_rules: &[String]) -> Vec<(u64, u32)> {
    let mut regions = Vec::new();
    for rule in memory_rules {
        if let Some(region) = parse_from_file_rule(rule) {
            regions.push(region);
        }
    }
    regions
}

/// Parses `@[0xADDR,SIZE] := from_file`.
fn parse_from_file_rule(rule: &str) -> Option<(u64, u32)> {
    let rule = normalize_memory_line(rule)?;
    let rest = rule.strip_prefix("@[")?;
    let (addr, rest) = rest.split_once(',')?;
    let (size, rest) = rest.split_once(']')?;
    if !rest.trim_start().starts_with(":=") || !rest.contains("from_file") {
        return None;
    }
    let base = u64::from_str_radix(addr.trim().strip_prefix("0x")?, 16).ok()?;
    let size = size.trim().parse::<u32>().ok()?;
    if size == 0 {
        return None;
    }
    Some((base, size))
}

fn is_hex8(token: &str) -> bool {
    token.len() == 8 && token.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_input_symbol(name: &str) -> bool {
    name.starts_with("__VERIFIER_nondet_slot")
        || name.starts_with("public_")
        || name == "_stub_int_array"
        || (name.starts_with("_stub_") && name.ends_with("_index"))
}

/// Regions exported by the binary: stub arrays, stub indices, and public globals.
///
/// Discovery is best-effort through `objdump -t`; a missing tool or binary yields no
/// regions.
pub fn symbol_input_regions(binary: &Path) -> Vec<(u64, u32)> {
    if !binary.is_file() {
        return Vec::new();
    }
    let output = match Command::new("objdump").arg("-t").arg(binary).output() {
        Ok(output) => output,
        Err(e) => {
            log::debug!(target: targets::ORACLE, "objdump unavailable: {e}");
            return Vec::new();
        }
    };
    if !output.status.success() {
        return Vec::new();
    }

    let mut regions = Vec::new();
    let table = String::from_utf8_lossy(&output.stdout);
    for line in table.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 {
            continue;
        }
        let (addr, size, name) = (parts[0], parts[4], parts[5]);
        if !is_hex8(addr) || !is_hex8(size) || !is_input_symbol(name) {
            continue;
        }
        let base = match u64::from_str_radix(addr, 16) {
            Ok(base) => base,
            Err(_) => continue,
        };
        let size = match u32::from_str_radix(size, 16) {
            Ok(size) => size,
            Err(_) => continue,
        };
        if size > 0 {
            regions.push((base, size));
        }
    }
    regions
}

/// Chunks regions into 4-byte words plus trailing tail bytes, capped per region.
pub fn chunk_input_regions(regions: &[(u64, u32)], max_bytes: usize) -> Vec<(u64, u32)> {
    let max_bytes = max_bytes.max(4) as u32;
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    let mut ordered: Vec<(u64, u32)> = regions.to_vec();
    ordered.sort();

    for (base, size) in ordered {
        if size == 0 {
            continue;
        }
        let size = size.min(max_bytes);
        for word in 0..size / 4 {
            let key = (base + 4 * word as u64, 4);
            if seen.insert(key) {
                out.push(key);
            }
        }
        let tail = size % 4;
        if tail != 0 {
            let key = (base + (size - tail) as u64, tail);
            if seen.insert(key) {
                out.push(key);
            }
        }
    }
    out
}
