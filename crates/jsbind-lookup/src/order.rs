//! Order in which the units of a batch are resolved.

use crate::environment::LookupEnvironment;
use crate::raw::BindingId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::debug;

impl LookupEnvironment {
    /// Units of the batch that declare a superclass of one of `file`'s types.
    pub fn unit_dependencies(&self, file: &str) -> Vec<Arc<str>> {
        let Some(scope) = self.unit_scope(file) else {
            return Vec::new();
        };
        let mut declared: Vec<BindingId> = scope.declarations.values().copied().collect();
        declared.sort_unstable();
        let mut out: Vec<Arc<str>> = Vec::new();
        for ty in declared {
            let Some(data) = self.store.reference(ty) else {
                continue;
            };
            let Some(owner) = self.file_of_type(data.superclass) else {
                continue;
            };
            if &**owner != file && !out.contains(owner) && self.unit_scope(owner).is_some() {
                out.push(owner.clone());
            }
        }
        out
    }

    /// Topological order of `files` by superclass dependencies: a unit comes
    /// after every batch unit declaring one of its superclasses. Independent
    /// units keep submission order; a dependency cycle between units is cut
    /// where the walk first meets it.
    pub fn processing_order(&self, files: &[Arc<str>]) -> Vec<Arc<str>> {
        let in_batch: FxHashSet<&str> = files.iter().map(|f| &**f).collect();
        let dependencies: FxHashMap<&str, Vec<Arc<str>>> = files
            .iter()
            .map(|file| {
                let deps = self
                    .unit_dependencies(file)
                    .into_iter()
                    .filter(|dep| in_batch.contains(&**dep))
                    .collect();
                (&**file, deps)
            })
            .collect();

        let mut result = Vec::with_capacity(files.len());
        let mut visited = FxHashSet::default();
        let mut in_progress = FxHashSet::default();
        for file in files {
            visit(
                file,
                &dependencies,
                &mut visited,
                &mut in_progress,
                &mut result,
            );
        }
        result
    }
}

fn visit(
    file: &Arc<str>,
    dependencies: &FxHashMap<&str, Vec<Arc<str>>>,
    visited: &mut FxHashSet<Arc<str>>,
    in_progress: &mut FxHashSet<Arc<str>>,
    result: &mut Vec<Arc<str>>,
) {
    if visited.contains(file) {
        return;
    }
    if in_progress.contains(file) {
        debug!(file = %file, "unit dependency cycle cut");
        return;
    }
    in_progress.insert(file.clone());
    if let Some(deps) = dependencies.get(&**file) {
        for dep in deps {
            visit(dep, dependencies, visited, in_progress, result);
        }
    }
    in_progress.remove(file);
    visited.insert(file.clone());
    result.push(file.clone());
}
