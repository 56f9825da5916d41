//! Graph walker
//!
//! Depth-first traversal of the cascade-owned subgraph under a root entity.
//!
//! The walk threads a [`Walk`] accumulator by value through the recursion:
//! each visit takes the accumulator, extends it, and hands it back. The
//! visited set lives inside the accumulator, keyed by (type, identity), so
//! diamonds and cycles are visited once.
//!
//! Only relations flagged cascade by the schema are followed. Children are
//! read in keyset pages of `fetch_batch_size` rows.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use coldstore_core::{
    ArchiveBundle, DeletionPlan, EntityRecord, EntityRef, Error, HasRelation, Identity,
    Multiplicity, RecordStore, Result, SchemaProvider,
};

/// Accumulator threaded through a walk
#[derive(Debug, Default)]
pub struct Walk {
    /// Records gathered so far
    pub bundle: ArchiveBundle,
    /// Non-root identities scheduled for deletion
    pub plan: DeletionPlan,
    visited: HashSet<(String, Identity)>,
}

impl Walk {
    /// Number of distinct entities visited
    pub fn visited(&self) -> usize {
        self.visited.len()
    }
}

/// Depth-first walker over cascade relations
pub struct GraphWalker<'a> {
    schema: &'a dyn SchemaProvider,
    store: &'a dyn RecordStore,
    fetch_batch_size: usize,
}

impl<'a> GraphWalker<'a> {
    /// Create a walker reading through `store`
    pub fn new(
        schema: &'a dyn SchemaProvider,
        store: &'a dyn RecordStore,
        fetch_batch_size: usize,
    ) -> Self {
        Self {
            schema,
            store,
            fetch_batch_size: fetch_batch_size.max(1),
        }
    }

    /// Walk the subgraph owned by `root`
    ///
    /// With `collect_deletions`, every non-root entity lands in the returned
    /// plan under its table.
    ///
    /// # Errors
    ///
    /// Returns an error if the root type is unknown, the root row does not
    /// exist, or a store read fails.
    pub fn walk(&self, root: &EntityRef, collect_deletions: bool) -> Result<Walk> {
        let table = self
            .schema
            .table_name(&root.type_name)
            .ok_or_else(|| Error::SchemaLookup(root.type_name.clone()))?;
        let record = self
            .store
            .get(&table, &root.id)?
            .ok_or_else(|| Error::not_found(root.to_string()))?;

        let walk = self.visit(Walk::default(), &root.type_name, record, true, collect_deletions)?;

        info!(
            target: "coldstore::walk",
            root = %root,
            types = walk.bundle.type_count(),
            records = walk.bundle.record_count(),
            scheduled_deletions = walk.plan.len(),
            "Walk complete"
        );
        Ok(walk)
    }

    fn visit(
        &self,
        mut acc: Walk,
        type_name: &str,
        record: EntityRecord,
        is_root: bool,
        collect_deletions: bool,
    ) -> Result<Walk> {
        let Some(table) = self.schema.table(type_name) else {
            warn!(target: "coldstore::walk", type_name, "Unknown type, skipping");
            return Ok(acc);
        };
        let Some(primary_key) = table.primary_key() else {
            debug!(target: "coldstore::walk", type_name, "Type exposes no columns, skipping");
            return Ok(acc);
        };
        let Some(id) = record.identity(primary_key) else {
            debug!(target: "coldstore::walk", type_name, "Record without identity, skipping");
            return Ok(acc);
        };

        if !acc.visited.insert((type_name.to_string(), id.clone())) {
            return Ok(acc);
        }

        acc.bundle
            .insert(type_name, primary_key, record.non_null_attributes());
        if collect_deletions && !is_root {
            acc.plan.add(&table.table_name, id.clone());
        }

        for relation in self.schema.cascade_children(type_name) {
            acc = self.visit_relation(acc, type_name, &id, &relation, collect_deletions)?;
        }
        Ok(acc)
    }

    fn visit_relation(
        &self,
        mut acc: Walk,
        parent_type: &str,
        parent_id: &Identity,
        relation: &HasRelation,
        collect_deletions: bool,
    ) -> Result<Walk> {
        let Some(child) = self.schema.table(&relation.target) else {
            warn!(
                target: "coldstore::walk",
                parent = parent_type,
                relation = %relation.name,
                target_type = %relation.target,
                "Relation targets an unknown type, skipping"
            );
            return Ok(acc);
        };
        let Some(child_pk) = child.primary_key() else {
            debug!(target: "coldstore::walk", relation = %relation.name, "Child type exposes no columns, skipping");
            return Ok(acc);
        };

        let limit = match relation.multiplicity {
            Multiplicity::One => 1,
            Multiplicity::Many => self.fetch_batch_size,
        };
        let key = parent_id.to_value();
        let mut after: Option<Identity> = None;
        let mut fetched = 0usize;

        loop {
            let page = self.store.scan_by(
                &child.table_name,
                &relation.foreign_key,
                &key,
                after.as_ref(),
                limit,
            )?;
            let page_len = page.len();
            fetched += page_len;

            for record in page {
                after = record.identity(child_pk).or(after);
                acc = self.visit(acc, &relation.target, record, false, collect_deletions)?;
            }

            if page_len < limit || relation.multiplicity == Multiplicity::One {
                break;
            }
        }

        debug!(
            target: "coldstore::walk",
            parent = parent_type,
            relation = %relation.name,
            children = fetched,
            "Relation walked"
        );
        Ok(acc)
    }
}
