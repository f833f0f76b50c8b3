//! One resolution pass over a batch of units and binding keys.
//!
//! The pass runs in two phases. First every unit is parsed (diet-parsed past
//! the parse threshold) and the lookup environment builds and completes the
//! type skeletons of all of them, so units of the batch can refer to each
//! other in any order. Then units are analyzed one at a time in the order
//! the environment picks. Right after a unit is analyzed its tree is handed
//! out if it was requested, and the keys it declares are answered.
//!
//! Once no requested tree and no unit-owned key is outstanding, the
//! remaining units are released without being analyzed. Keys that no unit
//! owns (array, base type and package keys, or types from the library) are
//! answered last against the completed environment.
//!
//! Cancellation is polled after each unit and before each key.

use crate::error::DriverError;
use crate::options::ResolverOptions;
use crate::project::Project;
use crate::requestor::AstRequestor;
use indexmap::IndexMap;
use jsbind_ast::{SyntaxFlags, SyntaxTree};
use jsbind_binding::{Binding, DefaultBindingResolver, PassContext, ResolvedAst};
use jsbind_common::CancellationToken;
use jsbind_lookup::{Analyzer, CompilerUnit, KeyDescriptor, LookupEnvironment};
use jsbind_parser::{Frontend, JsonFrontend, ParseMode, ParsedUnit};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, debug_span, trace, warn};

// =============================================================================
// Requests and results
// =============================================================================

/// A unit of the batch: its name and its description.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub file_name: Arc<str>,
    pub contents: Arc<str>,
}

impl SourceUnit {
    pub fn new(file_name: impl Into<Arc<str>>, contents: impl Into<Arc<str>>) -> Self {
        SourceUnit {
            file_name: file_name.into(),
            contents: contents.into(),
        }
    }
}

/// What one pass is asked for.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub units: Vec<SourceUnit>,
    /// Units whose resolved tree is delivered.
    pub ast_for: Vec<Arc<str>>,
    pub keys: Vec<String>,
}

impl ResolveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unit(mut self, file_name: &str, contents: &str) -> Self {
        self.units.push(SourceUnit::new(file_name, contents));
        self
    }

    pub fn ast(mut self, file_name: &str) -> Self {
        self.ast_for.push(Arc::from(file_name));
        self
    }

    /// Ask for the tree of every unit added so far.
    pub fn all_asts(mut self) -> Self {
        self.ast_for = self.units.iter().map(|unit| unit.file_name.clone()).collect();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }
}

/// Counters of a finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassStats {
    /// Units analyzed, including the ones that aborted.
    pub processed_units: usize,
    /// Units dropped by the early exit.
    pub released_units: usize,
    pub delivered_asts: usize,
    pub delivered_bindings: usize,
    pub aborted_units: usize,
}

impl PassStats {
    pub fn any_aborted(&self) -> bool {
        self.aborted_units > 0
    }
}

// =============================================================================
// UnitResolver
// =============================================================================

pub struct UnitResolver<F = JsonFrontend> {
    frontend: F,
    options: ResolverOptions,
    cancellation: CancellationToken,
}

impl UnitResolver<JsonFrontend> {
    pub fn new(options: ResolverOptions) -> Self {
        Self::with_frontend(JsonFrontend::new(), options)
    }
}

impl<F: Frontend> UnitResolver<F> {
    pub fn with_frontend(frontend: F, options: ResolverOptions) -> Self {
        UnitResolver {
            frontend,
            options,
            cancellation: CancellationToken::new(),
        }
    }

    /// Poll `token` at every checkpoint of the passes this resolver runs.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Run one pass. Every requested unit that is part of the batch gets one
    /// `accept_ast`, every key one `accept_binding`, unless the pass is
    /// cancelled or a unit fails internally.
    pub fn resolve(
        &self,
        project: &dyn Project,
        request: &ResolveRequest,
        requestor: &mut dyn AstRequestor,
    ) -> Result<PassStats, DriverError> {
        let _span = debug_span!(
            "resolve_pass",
            project = project.name(),
            units = request.units.len(),
            keys = request.keys.len()
        )
        .entered();
        self.cancellation.check()?;

        let name_env = if self.options.resolve_bindings {
            project.name_environment()
        } else {
            None
        };
        let Some(name_env) = name_env else {
            debug!("no name environment, parsing syntax only");
            return self.resolve_syntax_only(request, requestor);
        };

        let units = self.parse_units(request);
        let mut env = LookupEnvironment::new(name_env);
        for unit in units.values() {
            env.build_type_bindings(&unit.tree);
        }
        {
            let trees: Vec<&SyntaxTree> = units.values().map(|unit| &unit.tree).collect();
            env.complete_type_bindings(&trees);
        }

        let (keys_by_file, global_keys) = associate_keys(&mut env, &units, &request.keys);
        let mut wanted: FxHashSet<Arc<str>> = FxHashSet::default();
        for file in &request.ast_for {
            if units.contains_key(file) {
                wanted.insert(file.clone());
            } else {
                warn!(file = %file, "tree requested for a unit outside the batch");
            }
        }
        let files: Vec<Arc<str>> = units.keys().cloned().collect();
        let order = env.processing_order(&files);
        debug!(
            units = order.len(),
            unit_keys = keys_by_file.values().map(Vec::len).sum::<usize>(),
            global_keys = global_keys.len(),
            "pass prepared"
        );

        let context = PassContext::new(env, self.options.bindings_recovery);
        let mut pass = Pass {
            frontend: &self.frontend,
            options: &self.options,
            cancellation: &self.cancellation,
            context: context.clone(),
            keys: &request.keys,
            requestor,
            stats: PassStats::default(),
        };

        let result = pass.run(units, order, wanted, keys_by_file, global_keys);
        context.end_pass();
        let stats = pass.stats;
        match result {
            Ok(()) => {
                debug!(?stats, "pass finished");
                Ok(stats)
            }
            Err(err) => {
                debug!(error = %err, ?stats, "pass stopped");
                Err(err)
            }
        }
    }

    fn parse_units(&self, request: &ResolveRequest) -> IndexMap<Arc<str>, ParsedUnit> {
        let mut units: IndexMap<Arc<str>, ParsedUnit> = IndexMap::with_capacity(request.units.len());
        for (index, unit) in request.units.iter().enumerate() {
            if units.contains_key(&unit.file_name) {
                warn!(file = %unit.file_name, "unit submitted twice, keeping the first");
                continue;
            }
            let mode = if index >= self.options.parse_threshold {
                ParseMode::Diet
            } else {
                ParseMode::Full
            };
            let parsed = self.frontend.parse(&unit.file_name, &unit.contents, mode);
            units.insert(unit.file_name.clone(), parsed);
        }
        units
    }

    /// Deliver bare trees for the requested units and `None` for every key.
    fn resolve_syntax_only(
        &self,
        request: &ResolveRequest,
        requestor: &mut dyn AstRequestor,
    ) -> Result<PassStats, DriverError> {
        let mut stats = PassStats::default();
        let wanted: FxHashSet<&str> = request.ast_for.iter().map(|file| &**file).collect();
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for unit in &request.units {
            if !wanted.contains(&*unit.file_name) || !seen.insert(&*unit.file_name) {
                continue;
            }
            let parsed = self
                .frontend
                .parse(&unit.file_name, &unit.contents, ParseMode::Full);
            requestor.accept_ast(ResolvedAst::syntax_only(Arc::new(parsed.tree)));
            stats.delivered_asts += 1;
            self.cancellation.check()?;
        }
        for key in &request.keys {
            self.cancellation.check()?;
            requestor.accept_binding(key, None);
            stats.delivered_bindings += 1;
        }
        Ok(stats)
    }
}

/// Split the requested keys into the ones a batch unit owns (by index, in
/// request order) and the ones answered after all units.
fn associate_keys(
    env: &mut LookupEnvironment,
    units: &IndexMap<Arc<str>, ParsedUnit>,
    keys: &[String],
) -> (FxHashMap<Arc<str>, Vec<usize>>, Vec<usize>) {
    let mut by_file: FxHashMap<Arc<str>, Vec<usize>> = FxHashMap::default();
    let mut global = Vec::new();
    for (index, key) in keys.iter().enumerate() {
        let descriptor = match KeyDescriptor::parse(key) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                warn!(error = %err, "malformed binding key");
                global.push(index);
                continue;
            }
        };
        let owner = descriptor.type_name().and_then(|name| {
            let segments: Vec<&str> = name.iter().map(String::as_str).collect();
            let ty = env.get_type(&segments)?;
            env.file_of_type(ty)
                .filter(|file| units.contains_key(&***file))
                .cloned()
        });
        match owner {
            Some(file) => {
                trace!(key = %key, file = %file, "key owned by unit");
                by_file.entry(file).or_default().push(index);
            }
            None => global.push(index),
        }
    }
    (by_file, global)
}

// =============================================================================
// Pass state
// =============================================================================

struct Pass<'a, F> {
    frontend: &'a F,
    options: &'a ResolverOptions,
    cancellation: &'a CancellationToken,
    context: Arc<PassContext>,
    keys: &'a [String],
    requestor: &'a mut dyn AstRequestor,
    stats: PassStats,
}

impl<F: Frontend> Pass<'_, F> {
    fn checkpoint(&self) -> Result<(), DriverError> {
        Ok(self.cancellation.check()?)
    }

    fn run(
        &mut self,
        mut units: IndexMap<Arc<str>, ParsedUnit>,
        order: Vec<Arc<str>>,
        mut wanted: FxHashSet<Arc<str>>,
        mut keys_by_file: FxHashMap<Arc<str>, Vec<usize>>,
        global_keys: Vec<usize>,
    ) -> Result<(), DriverError> {
        let mut queue = order.into_iter();
        while let Some(file) = queue.next() {
            if wanted.is_empty() && keys_by_file.is_empty() {
                self.release(std::iter::once(file).chain(queue));
                break;
            }
            let Some(parsed) = units.shift_remove(&file) else {
                continue;
            };
            let wants_ast = wanted.remove(&file);
            let keys = keys_by_file.remove(&file).unwrap_or_default();
            self.resolve_unit(parsed, wants_ast, &keys)?;
            self.checkpoint()?;
        }
        for index in global_keys {
            self.checkpoint()?;
            let binding = self.context.binding_for_key_text(&self.keys[index]);
            self.deliver_binding(index, binding);
        }
        Ok(())
    }

    fn resolve_unit(
        &mut self,
        parsed: ParsedUnit,
        wants_ast: bool,
        keys: &[usize],
    ) -> Result<(), DriverError> {
        let malformed = parsed.tree.flags.contains(SyntaxFlags::MALFORMED);
        let parsed = if parsed.is_diet() {
            self.frontend.parse_bodies(parsed)
        } else {
            parsed
        };
        let mut tree = parsed.tree;
        let _span = debug_span!("resolve_unit", file = %tree.file_name).entered();

        if malformed && !self.options.statements_recovery {
            debug!("malformed unit handed back without bindings");
            return self.deliver_unresolved(Arc::new(tree), wants_ast, keys);
        }

        tree.flags |= SyntaxFlags::RESOLVED_BINDINGS;
        if self.context.recovery() {
            tree.flags |= SyntaxFlags::BINDINGS_RECOVERY;
        }
        let tree = Arc::new(tree);
        let mut unit = CompilerUnit::new(tree.clone());
        let analyzed = {
            let mut env = self.context.write();
            Analyzer::process(&mut env, &mut unit)
        };
        self.stats.processed_units += 1;

        match analyzed {
            Ok(()) => {
                let resolver = Arc::new(DefaultBindingResolver::new(
                    self.context.clone(),
                    Arc::new(unit),
                ));
                if wants_ast {
                    self.deliver_ast(ResolvedAst::new(tree, resolver));
                }
                for &index in keys {
                    self.checkpoint()?;
                    let binding = self.context.binding_for_key_text(&self.keys[index]);
                    self.deliver_binding(index, binding);
                }
                Ok(())
            }
            Err(err) => {
                let scrubbed = self.context.write().scrub_unit(&tree.file_name);
                if !err.is_abort() {
                    warn!(error = %err, scrubbed, "unit failed");
                    return Err(DriverError::Internal(err));
                }
                warn!(error = %err, scrubbed, "unit aborted, handing it back without bindings");
                self.stats.aborted_units += 1;
                let mut bare = (*tree).clone();
                bare.flags -= SyntaxFlags::RESOLVED_BINDINGS | SyntaxFlags::BINDINGS_RECOVERY;
                self.deliver_unresolved(Arc::new(bare), wants_ast, keys)
            }
        }
    }

    fn deliver_unresolved(
        &mut self,
        tree: Arc<SyntaxTree>,
        wants_ast: bool,
        keys: &[usize],
    ) -> Result<(), DriverError> {
        if wants_ast {
            self.deliver_ast(ResolvedAst::syntax_only(tree));
        }
        for &index in keys {
            self.checkpoint()?;
            self.deliver_binding(index, None);
        }
        Ok(())
    }

    fn deliver_ast(&mut self, ast: ResolvedAst) {
        trace!(file = %ast.file_name(), bindings = ast.has_bindings(), "tree ready");
        self.requestor.accept_ast(ast);
        self.stats.delivered_asts += 1;
    }

    fn deliver_binding(&mut self, index: usize, binding: Option<Binding>) {
        let key = &self.keys[index];
        trace!(key = %key, found = binding.is_some(), "binding ready");
        self.requestor.accept_binding(key, binding);
        self.stats.delivered_bindings += 1;
    }

    /// Drop units that will not be analyzed in this pass.
    fn release(&mut self, files: impl Iterator<Item = Arc<str>>) {
        let mut env = self.context.write();
        for file in files {
            env.release_unit(&file);
            self.stats.released_units += 1;
        }
        debug!(released = self.stats.released_units, "early exit");
    }
}

#[cfg(test)]
#[path = "../tests/driver_tests.rs"]
mod driver_tests;
