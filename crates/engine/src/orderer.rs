//! Dependency orderer
//!
//! Orders the types of a bundle so that every belongs-to target is imported
//! before the types referencing it.
//!
//! Seeds are processed in reverse; each type is placed after its present,
//! not-yet-placed belongs-to targets, which are placed recursively first.
//! A type reached again while its own targets are still being placed closes
//! a cycle, reported as [`Error::DependencyCycle`]. Self-references are not
//! edges: a type's rows referencing rows of the same type cannot be ordered
//! by type anyway.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use coldstore_core::{Error, Result, SchemaProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Placed,
}

/// Order `types` so belongs-to targets come first
///
/// `edges` yields the belongs-to targets of a type; targets outside `types`
/// are ignored.
///
/// # Errors
///
/// [`Error::DependencyCycle`] naming the cycle if two or more present types
/// depend on each other.
pub fn order<F>(types: &[String], edges: F) -> Result<Vec<String>>
where
    F: Fn(&str) -> Vec<String>,
{
    let present: HashSet<&str> = types.iter().map(String::as_str).collect();
    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut path: Vec<String> = Vec::new();
    let mut placed = Vec::with_capacity(types.len());

    for seed in types.iter().rev() {
        place(seed, &present, &edges, &mut marks, &mut path, &mut placed)?;
    }
    Ok(placed)
}

fn place<F>(
    type_name: &str,
    present: &HashSet<&str>,
    edges: &F,
    marks: &mut HashMap<String, Mark>,
    path: &mut Vec<String>,
    placed: &mut Vec<String>,
) -> Result<()>
where
    F: Fn(&str) -> Vec<String>,
{
    match marks.get(type_name) {
        Some(Mark::Placed) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = path.iter().position(|t| t == type_name).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(type_name.to_string());
            return Err(Error::DependencyCycle { cycle });
        }
        None => {}
    }

    marks.insert(type_name.to_string(), Mark::InProgress);
    path.push(type_name.to_string());

    for target in edges(type_name) {
        if target != type_name && present.contains(target.as_str()) {
            place(&target, present, edges, marks, path, placed)?;
        }
    }

    path.pop();
    marks.insert(type_name.to_string(), Mark::Placed);
    placed.push(type_name.to_string());
    Ok(())
}

/// Orders bundle types using belongs-to relations from a [`SchemaProvider`]
pub struct DependencyOrderer<'a> {
    schema: &'a dyn SchemaProvider,
}

impl<'a> DependencyOrderer<'a> {
    /// Create an orderer over `schema`
    pub fn new(schema: &'a dyn SchemaProvider) -> Self {
        Self { schema }
    }

    /// Order `types` for import
    pub fn order(&self, types: &[String]) -> Result<Vec<String>> {
        let ordered = order(types, |t| {
            self.schema
                .belongs_to(t)
                .into_iter()
                .map(|b| b.target)
                .collect()
        })?;
        debug!(target: "coldstore::order", order = ?ordered, "Import order");
        Ok(ordered)
    }
}
