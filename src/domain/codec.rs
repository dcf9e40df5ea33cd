//! Text codec for the tree grammar.
//!
//! ```text
//! tree    := header ';' talent (';' talent)* [';']
//! header  := preset ':' name ':' description ':' loadoutDescription ':' unspent ':' spent
//! talent  := index ':' name[','switchName] ':' desc[','desc]* ':' type ':' row ':' col
//!            ':' points ':' maxPoints ':' pointsRequired ':' switch ':' parents ':' children
//! ```
//!
//! Text fields are escaped so the delimiters `:`, `;` and `,` can appear in
//! names and descriptions.

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::cycle::tree_string_has_cycle;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::talent::{Talent, TalentId, TalentSwitch, TalentType};
use crate::domain::tree::TalentTree;

pub const CUSTOM_PRESET: &str = "custom";
const UNDEFINED_SWITCH_NAME: &str = "Undefined switch name";

const ESCAPES: [(&str, &str); 3] = [(":", "$$colon$$"), (";", "$$semicolon$$"), (",", "$$comma$$")];

/// Replace delimiter characters with their escape tokens.
pub fn escape(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (raw, token)| acc.replace(raw, token))
}

/// Inverse of [`escape`].
pub fn unescape(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (raw, token)| acc.replace(token, raw))
}

/// Check field counts and integer fields of every record before parsing.
pub fn validate_tree_string(tree_rep: &str) -> DomainResult<()> {
    let header = Regex::new(r"^[^:;]*:[^:;]*:[^:;]*:[^:;]*:-?\d+:-?\d+$")
        .map_err(|e| DomainError::parse(0, e.to_string()))?;
    let talent = Regex::new(
        r"^-?\d+:[^:;]*:[^:;]*:\d+:-?\d+:-?\d+:\d+:\d+:\d+:\d+:(-?\d+(,-?\d+)*)?:(-?\d+(,-?\d+)*)?$",
    )
    .map_err(|e| DomainError::parse(0, e.to_string()))?;

    let mut records = tree_rep.split(';');
    let first = records.next().unwrap_or_default();
    if !header.is_match(first) {
        return Err(DomainError::parse(0, "header must be preset:name:description:loadout:unspent:spent"));
    }
    for (record, part) in records.enumerate() {
        if part.is_empty() {
            continue;
        }
        if !talent.is_match(part) {
            return Err(DomainError::parse(
                record + 1,
                format!("talent record does not match the expected 12-field layout: '{part}'"),
            ));
        }
    }
    Ok(())
}

/// Parse a tree string, rejecting cyclic input before anything is materialized.
#[instrument(level = "debug", skip(tree_rep))]
pub fn parse_tree(tree_rep: &str) -> DomainResult<TalentTree> {
    let tree_rep = tree_rep.trim();
    validate_tree_string(tree_rep)?;
    let preset = tree_rep.split(':').next().unwrap_or_default();
    if preset != CUSTOM_PRESET {
        return Err(DomainError::PresetUnavailable(preset.to_string()));
    }
    if tree_string_has_cycle(tree_rep)? {
        return Err(DomainError::CycleDetected);
    }
    parse_custom_tree(tree_rep)
}

/// Parse a fully specified (`custom`) tree string.
///
/// Talents may reference parents and children that are defined later in the
/// string. A referenced index that is never defined is an error.
pub fn parse_custom_tree(tree_rep: &str) -> DomainResult<TalentTree> {
    let mut parts = tree_rep.trim().split(';');
    let header: Vec<&str> = parts.next().unwrap_or_default().split(':').collect();
    if header.len() != 6 {
        return Err(DomainError::parse(0, format!("expected 6 header fields, found {}", header.len())));
    }

    let mut tree = TalentTree::new(unescape(header[1]));
    tree.preset = header[0].to_string();
    tree.description = unescape(header[2]);
    tree.loadout_description = unescape(header[3]);
    tree.unspent_points = int_field(0, header[4], "unspent points")?;
    tree.spent_points = int_field(0, header[5], "spent points")?;

    let mut handles: BTreeMap<i32, TalentId> = BTreeMap::new();
    let mut defined: BTreeSet<i32> = BTreeSet::new();
    let mut edges: Vec<(i32, i32)> = Vec::new();

    for (record, part) in parts.enumerate().map(|(i, p)| (i + 1, p)) {
        if part.is_empty() {
            continue;
        }
        let fields: Vec<&str> = part.split(':').collect();
        if fields.len() != 12 {
            return Err(DomainError::parse(record, format!("expected 12 fields, found {}", fields.len())));
        }
        let index: i32 = int_field(record, fields[0], "index")?;
        if !defined.insert(index) {
            return Err(DomainError::parse(record, format!("talent {index} defined twice")));
        }

        let talent = parse_talent(record, index, &fields)?;
        match handles.get(&index) {
            Some(&id) => {
                if let Some(slot) = tree.get_mut(id) {
                    let parents = std::mem::take(&mut slot.parents);
                    let children = std::mem::take(&mut slot.children);
                    *slot = talent;
                    slot.parents = parents;
                    slot.children = children;
                }
            }
            None => {
                handles.insert(index, tree.add_talent(talent));
            }
        }

        for parent in index_list(record, fields[10])? {
            edges.push((parent, index));
        }
        for child in index_list(record, fields[11])? {
            edges.push((index, child));
        }
        for (parent, child) in edges.drain(..) {
            let p = placeholder(&mut tree, &mut handles, parent);
            let c = placeholder(&mut tree, &mut handles, child);
            tree.link(p, c);
        }
    }

    if let Some(missing) = handles.keys().find(|index| !defined.contains(index)) {
        return Err(DomainError::parse(0, format!("talent {missing} is referenced but never defined")));
    }

    tree.recompute();
    debug!("parsed tree '{}' with {} talents", tree.name, tree.node_count());
    Ok(tree)
}

fn placeholder(tree: &mut TalentTree, handles: &mut BTreeMap<i32, TalentId>, index: i32) -> TalentId {
    *handles
        .entry(index)
        .or_insert_with(|| tree.add_talent(Talent::new(index, "", 1)))
}

fn parse_talent(record: usize, index: i32, fields: &[&str]) -> DomainResult<Talent> {
    let type_code: i32 = int_field(record, fields[3], "type")?;
    let talent_type = TalentType::from_code(type_code)
        .ok_or_else(|| DomainError::parse(record, format!("unknown talent type {type_code}")))?;

    let mut names = fields[1].split(',');
    let name = unescape(names.next().unwrap_or_default());
    let switch_name = match (talent_type, names.next()) {
        (TalentType::Switch, Some(n)) => unescape(n),
        (TalentType::Switch, None) => UNDEFINED_SWITCH_NAME.to_string(),
        _ => String::new(),
    };

    let points: u32 = int_field(record, fields[6], "points")?;
    let max_points: u32 = int_field(record, fields[7], "max points")?;
    if max_points == 0 {
        return Err(DomainError::parse(record, "max points must be at least 1"));
    }
    if points > max_points {
        return Err(DomainError::parse(record, format!("{points} points exceed max points {max_points}")));
    }

    let switch_code: i32 = int_field(record, fields[9], "switch state")?;
    let talent_switch = match talent_type {
        TalentType::Switch => TalentSwitch::from_code(switch_code)
            .ok_or_else(|| DomainError::parse(record, format!("unknown switch state {switch_code}")))?,
        _ => TalentSwitch::Unset,
    };

    let mut talent = Talent::new(index, name, max_points)
        .with_type(talent_type)
        .with_points_required(int_field(record, fields[8], "points required")?)
        .with_position(int_field(record, fields[4], "row")?, int_field(record, fields[5], "column")?);
    talent.switch_name = switch_name;
    talent.descriptions = fields[2].split(',').map(unescape).collect();
    talent.points = points;
    talent.talent_switch = talent_switch;
    Ok(talent)
}

fn int_field<T: std::str::FromStr>(record: usize, field: &str, what: &str) -> DomainResult<T> {
    field
        .trim()
        .parse()
        .map_err(|_| DomainError::parse(record, format!("invalid {what} '{field}'")))
}

fn index_list(record: usize, field: &str) -> DomainResult<Vec<i32>> {
    field
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| int_field(record, s, "talent index"))
        .collect()
}

/// Serialize a tree into a string accepted by [`parse_tree`].
pub fn tree_to_string(tree: &TalentTree) -> String {
    let mut out = format!(
        "{}:{}:{}:{}:{}:{};",
        CUSTOM_PRESET,
        escape(&tree.name),
        escape(&tree.description),
        escape(&tree.loadout_description),
        tree.unspent_points,
        tree.spent_points
    );
    for (_, talent) in tree.ordered_talents() {
        let name = if talent.is_switch() {
            format!("{},{}", escape(&talent.name), escape(&talent.switch_name))
        } else {
            escape(&talent.name)
        };
        let indices = |ids: &[TalentId]| {
            ids.iter()
                .filter_map(|&id| tree.get(id))
                .map(|t| t.index)
                .join(",")
        };
        out.push_str(&format!(
            "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{};",
            talent.index,
            name,
            talent.descriptions.iter().map(|d| escape(d)).join(","),
            talent.talent_type.code(),
            talent.row,
            talent.column,
            talent.points,
            talent.max_points,
            talent.points_required,
            talent.talent_switch.code(),
            indices(talent.parents()),
            indices(talent.children()),
        ));
    }
    out
}

/// Compact summary of the current allocation, e.g. `0:1;3[2]:1;7:0;`.
///
/// Switch talents carry their selected variant in brackets.
pub fn talent_string(tree: &TalentTree) -> String {
    tree.ordered_talents()
        .map(|(_, t)| {
            if t.is_switch() {
                format!("{}[{}]:{};", t.index, t.talent_switch.code(), t.points)
            } else {
                format!("{}:{};", t.index, t.points)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_delimiters_in_text_when_escaping_then_roundtrips() {
        let raw = "Rank 2: +10%; stacks, twice";
        let escaped = escape(raw);
        assert!(!escaped.contains(':') && !escaped.contains(';') && !escaped.contains(','));
        assert_eq!(unescape(&escaped), raw);
    }

    #[test]
    fn given_non_numeric_row_when_validating_then_record_reported() {
        let rep = "custom:t:d:l:0:0;0:a:x:0:one:1:0:1:0:0::;";
        assert!(matches!(
            validate_tree_string(rep),
            Err(DomainError::Parse { record: 1, .. })
        ));
    }

    #[test]
    fn given_switch_without_second_name_when_parsing_then_placeholder_name() {
        let tree = parse_custom_tree("custom:t:d:l:0:0;0:a:x:2:1:1:0:1:0:0::;").unwrap();
        let talent = tree.get(tree.by_index(0).unwrap()).unwrap();
        assert_eq!(talent.switch_name, UNDEFINED_SWITCH_NAME);
    }
}
