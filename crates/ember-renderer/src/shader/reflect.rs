//! Lightweight WGSL reflection used to validate programs before compilation.

use std::collections::{BTreeMap, HashMap};

use super::ShaderStageKind;
use crate::error::ShaderError;

/// A `@group(g) @binding(b)` resource slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingSlot {
    pub group: u32,
    pub binding: u32,
}

/// Resource names declared by a module, with their slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    entries: BTreeMap<String, BindingSlot>,
}

impl BindingTable {
    /// Collects every `@group(..) @binding(..) var name` declaration.
    pub fn parse(source: &str) -> Self {
        let stripped = strip_line_comments(source);
        let mut entries = BTreeMap::new();
        let mut rest = stripped.as_str();

        while let Some(start) = rest.find('@') {
            rest = &rest[start..];
            match parse_slot(rest).and_then(|(slot, after)| Some((slot, parse_var_name(after)?))) {
                Some((slot, (name, after))) => {
                    entries.insert(name.to_string(), slot);
                    rest = after;
                }
                None => rest = &rest[1..],
            }
        }

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<BindingSlot> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, BindingSlot)> {
        self.entries.iter().map(|(name, slot)| (name.as_str(), *slot))
    }

    /// Merges the tables of every stage of `program`.
    ///
    /// Fails when one name is bound to different slots in different stages,
    /// or when one slot is given different names.
    pub fn link(program: &str, stages: &[&BindingTable]) -> Result<BindingTable, ShaderError> {
        let mut merged: BTreeMap<String, BindingSlot> = BTreeMap::new();
        let mut owners: HashMap<BindingSlot, &str> = HashMap::new();

        for table in stages {
            for (name, slot) in &table.entries {
                if let Some(existing) = merged.get(name)
                    && existing != slot
                {
                    return Err(ShaderError::Link {
                        program: program.to_string(),
                        message: format!(
                            "`{name}` is bound at group {} binding {} and at group {} binding {}",
                            existing.group, existing.binding, slot.group, slot.binding
                        ),
                    });
                }
                if let Some(owner) = owners.get(slot)
                    && *owner != name.as_str()
                {
                    return Err(ShaderError::Link {
                        program: program.to_string(),
                        message: format!(
                            "group {} binding {} is declared as both `{owner}` and `{name}`",
                            slot.group, slot.binding
                        ),
                    });
                }
                merged.insert(name.clone(), *slot);
                owners.insert(*slot, name.as_str());
            }
        }

        Ok(BindingTable { entries: merged })
    }
}

/// `@location` slots crossing the vertex/fragment boundary, with their types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageInterface {
    locations: BTreeMap<u32, String>,
}

impl StageInterface {
    /// Locations written by the vertex entry point's return value. `None`
    /// when the signature or its output struct cannot be resolved.
    pub fn vertex_outputs(source: &str) -> Option<Self> {
        let stripped = strip_line_comments(source);
        let (_, output) = entry_signature(&stripped, ShaderStageKind::Vertex)?;
        let mut locations = BTreeMap::new();
        if !output.is_empty() {
            collect_locations(&stripped, output, false, &mut locations)?;
        }
        Some(Self { locations })
    }

    /// Locations read by the fragment entry point's parameters, with
    /// struct parameters expanded and builtins skipped.
    pub fn fragment_inputs(source: &str) -> Option<Self> {
        let stripped = strip_line_comments(source);
        let (params, _) = entry_signature(&stripped, ShaderStageKind::Fragment)?;
        let mut locations = BTreeMap::new();
        for param in split_top_level(params) {
            collect_locations(&stripped, param, true, &mut locations)?;
        }
        Some(Self { locations })
    }

    pub fn get(&self, location: u32) -> Option<&str> {
        self.locations.get(&location).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Checks that every fragment input is written by the vertex stage with
    /// the same type. Unread vertex outputs are allowed.
    pub fn link(program: &str, vertex: &StageInterface, fragment: &StageInterface) -> Result<(), ShaderError> {
        for (location, ty) in &fragment.locations {
            match vertex.locations.get(location) {
                None => {
                    return Err(ShaderError::Link {
                        program: program.to_string(),
                        message: format!("fragment input @location({location}) is not written by the vertex stage"),
                    });
                }
                Some(written) if written != ty => {
                    return Err(ShaderError::Link {
                        program: program.to_string(),
                        message: format!(
                            "@location({location}) is written as `{written}` but read as `{ty}`"
                        ),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

/// Returns true if `source` declares the entry point required for `kind`.
pub fn has_entry_point(source: &str, kind: ShaderStageKind) -> bool {
    let stripped = strip_line_comments(source);
    let attribute = kind.attribute();
    let name = kind.entry_point();

    stripped.match_indices(attribute).any(|(at, _)| {
        let after = stripped[at + attribute.len()..].trim_start();
        after
            .strip_prefix("fn")
            .map(str::trim_start)
            .and_then(|s| s.strip_prefix(name))
            .is_some_and(|s| !s.starts_with(is_ident_char))
    })
}

/// Parameter list and return type of the entry point for `kind`.
fn entry_signature(source: &str, kind: ShaderStageKind) -> Option<(&str, &str)> {
    let attribute = kind.attribute();
    let name = kind.entry_point();

    source.match_indices(attribute).find_map(|(at, _)| {
        let rest = source[at + attribute.len()..]
            .trim_start()
            .strip_prefix("fn")?
            .trim_start()
            .strip_prefix(name)?
            .trim_start()
            .strip_prefix('(')?;
        let close = closing_paren(rest)?;
        let tail = &rest[close + 1..];
        let output = tail[..tail.find('{')?].trim();
        let output = output.strip_prefix("->").map(str::trim).unwrap_or_default();
        Some((&rest[..close], output))
    })
}

fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Splits a parameter or member list on commas outside brackets.
fn split_top_level(s: &str) -> impl Iterator<Item = &str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '<' => depth += 1,
            ')' | '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.into_iter().map(str::trim).filter(|p| !p.is_empty())
}

/// Leading attributes of a declaration: its `@location`, whether it is a
/// `@builtin`, and the text after them.
fn split_attributes(s: &str) -> Option<(Option<u32>, bool, &str)> {
    let mut location = None;
    let mut builtin = false;
    let mut rest = s.trim_start();

    while let Some(after) = rest.strip_prefix('@') {
        let end = after.find(|c: char| !is_ident_char(c)).unwrap_or(after.len());
        let (attribute, after) = after.split_at(end);
        rest = after.trim_start();
        if let Some(args) = rest.strip_prefix('(') {
            let close = closing_paren(args)?;
            if attribute == "location" {
                location = Some(args[..close].trim().parse().ok()?);
            }
            rest = args[close + 1..].trim_start();
        }
        builtin |= attribute == "builtin";
    }

    Some((location, builtin, rest))
}

fn normalize_type(ty: &str) -> String {
    ty.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Records the locations of one declaration. A parameter reads
/// `name: type`; a return value is the type alone. Undecorated types are
/// expanded as structs.
fn collect_locations(source: &str, decl: &str, named: bool, into: &mut BTreeMap<u32, String>) -> Option<()> {
    let (location, builtin, rest) = split_attributes(decl)?;
    if builtin {
        return Some(());
    }
    let ty = if named { rest.split_once(':')?.1.trim() } else { rest.trim() };
    match location {
        Some(location) => {
            into.insert(location, normalize_type(ty));
        }
        None => {
            for member in split_top_level(struct_body(source, ty)?) {
                let (location, _, rest) = split_attributes(member)?;
                if let Some(location) = location {
                    into.insert(location, normalize_type(rest.split_once(':')?.1));
                }
            }
        }
    }
    Some(())
}

fn struct_body<'s>(source: &'s str, name: &str) -> Option<&'s str> {
    source.match_indices("struct").find_map(|(at, _)| {
        let rest = source[at + "struct".len()..].trim_start().strip_prefix(name)?;
        if rest.starts_with(is_ident_char) {
            return None;
        }
        let body = rest.trim_start().strip_prefix('{')?;
        Some(&body[..body.find('}')?])
    })
}

fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn parse_slot(s: &str) -> Option<(BindingSlot, &str)> {
    let mut group = None;
    let mut binding = None;
    let mut rest = s;

    loop {
        rest = rest.trim_start();
        if let Some(r) = rest.strip_prefix("@group(") {
            let (n, r) = parse_number(r)?;
            group = Some(n);
            rest = r;
        } else if let Some(r) = rest.strip_prefix("@binding(") {
            let (n, r) = parse_number(r)?;
            binding = Some(n);
            rest = r;
        } else {
            break;
        }
    }

    Some((
        BindingSlot {
            group: group?,
            binding: binding?,
        },
        rest,
    ))
}

fn parse_number(s: &str) -> Option<(u32, &str)> {
    let end = s.find(')')?;
    let n = s[..end].trim().parse().ok()?;
    Some((n, &s[end + 1..]))
}

fn parse_var_name(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start().strip_prefix("var")?;
    let s = match s.strip_prefix('<') {
        Some(r) => &r[r.find('>')? + 1..],
        None => s,
    };
    let s = s.trim_start();
    let end = s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    Some((&s[..end], &s[end..]))
}
