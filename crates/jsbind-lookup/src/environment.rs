//! Lookup environment.
//!
//! The environment owns every raw binding of a pass and answers "which type
//! or package does this name denote". Units enter it in two phases:
//!
//! 1. [`LookupEnvironment::build_type_bindings`] creates a skeleton binding
//!    for every type a unit declares, plus the unit's own compilation-unit
//!    type. Skeletons are flagged `UNRESOLVED`.
//! 2. [`LookupEnvironment::complete_type_bindings`] connects imports and
//!    superclasses and creates field and method bindings (still
//!    `UNRESOLVED`, with their signatures recorded as pending type
//!    references).
//!
//! Signatures are resolved lazily by [`LookupEnvironment::resolve_types_for`],
//! which clears the `UNRESOLVED` bits. Because every unit of a batch is
//! built before any of them is completed, forward and mutual references
//! between units resolve regardless of submission order.

use crate::constants::literal_constant;
use crate::name_env::{LibraryType, NameEnvironment};
use crate::raw::{
    ArrayData, BaseType, BindingId, CompoundName, FieldData, ImportData, MethodData,
    PackageData, ProblemReason, RawBinding, ReferenceData, TypeFlags,
};
use crate::store::BindingStore;
use indexmap::IndexMap;
use jsbind_ast::{NodeIndex, NodeKind, PrimitiveCode, SyntaxTree};
use jsbind_common::Modifiers;
use jsbind_common::limits::MAX_HIERARCHY_DEPTH;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace, warn};

// =============================================================================
// Type references
// =============================================================================

/// A type as written in a declaration, before lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeRef {
    /// No declared type.
    Untyped,
    Primitive { base: BaseType, dimensions: u32 },
    Named { segments: Vec<Arc<str>>, dimensions: u32 },
}

impl TypeRef {
    /// Read a type node, adding `extra_dimensions` written after a name.
    pub fn from_node(tree: &SyntaxTree, ty: NodeIndex, extra_dimensions: u32) -> TypeRef {
        match tree.kind(ty) {
            Some(NodeKind::PrimitiveType { code }) => TypeRef::Primitive {
                base: BaseType::from_primitive(*code),
                dimensions: extra_dimensions,
            },
            Some(NodeKind::SimpleType { name }) => TypeRef::Named {
                segments: tree.name_segments(*name),
                dimensions: extra_dimensions,
            },
            Some(NodeKind::QualifiedType { qualifier, name }) => {
                let mut segments = match TypeRef::from_node(tree, *qualifier, 0) {
                    TypeRef::Named { segments, .. } => segments,
                    _ => Vec::new(),
                };
                if let Some(id) = tree.identifier(*name) {
                    segments.push(Arc::from(id));
                }
                TypeRef::Named {
                    segments,
                    dimensions: extra_dimensions,
                }
            }
            Some(NodeKind::ArrayType {
                element,
                dimensions,
            }) => TypeRef::from_node(tree, *element, extra_dimensions + dimensions),
            _ if extra_dimensions > 0 => TypeRef::Named {
                segments: vec![Arc::from("Object")],
                dimensions: extra_dimensions,
            },
            _ => TypeRef::Untyped,
        }
    }

    /// Read a library type text (`Number`, `String[]`, `void`).
    pub fn from_text(text: &str) -> TypeRef {
        let mut base = text.trim();
        let mut dimensions = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dimensions += 1;
        }
        if base.is_empty() {
            return TypeRef::Untyped;
        }
        match PrimitiveCode::from_keyword(base) {
            Some(code) => TypeRef::Primitive {
                base: BaseType::from_primitive(code),
                dimensions,
            },
            None => TypeRef::Named {
                segments: base.split('.').map(Arc::from).collect(),
                dimensions,
            },
        }
    }
}

// =============================================================================
// Unit scopes
// =============================================================================

/// What the environment knows about one unit of the pass.
#[derive(Clone, Debug)]
pub struct UnitScope {
    pub file_name: Arc<str>,
    pub package: BindingId,
    /// The binding owning top-level functions and variables.
    pub unit_type: BindingId,
    /// Top-level types in declaration order.
    pub types: Vec<BindingId>,
    pub imports: Vec<BindingId>,
    /// Declaration node to binding: types, fields, field fragments, methods.
    pub declarations: FxHashMap<NodeIndex, BindingId>,
    pub released: bool,
    superclasses: Vec<(BindingId, TypeRef)>,
}

enum PendingMembers {
    Source {
        file_name: Arc<str>,
        fields: Vec<(BindingId, TypeRef)>,
        methods: Vec<(BindingId, Vec<TypeRef>, TypeRef)>,
    },
    Library(LibraryType),
}

// =============================================================================
// LookupEnvironment
// =============================================================================

pub struct LookupEnvironment {
    pub store: BindingStore,
    name_env: Arc<dyn NameEnvironment>,
    /// Constant pool name (`p/q/Foo`) to reference binding.
    types: FxHashMap<Arc<str>, BindingId>,
    /// Slash-separated package name to package binding.
    packages: FxHashMap<Arc<str>, BindingId>,
    default_package: BindingId,
    base_types: FxHashMap<BaseType, BindingId>,
    arrays: FxHashMap<(BindingId, u32), BindingId>,
    missing_types: FxHashMap<Arc<str>, BindingId>,
    units: IndexMap<Arc<str>, UnitScope>,
    pending: FxHashMap<BindingId, PendingMembers>,
}

impl LookupEnvironment {
    pub fn new(name_env: Arc<dyn NameEnvironment>) -> Self {
        let mut store = BindingStore::new();
        let mut base_types = FxHashMap::default();
        for base in BaseType::ALL {
            base_types.insert(base, store.alloc(RawBinding::Base(base)));
        }
        let default_package = store.alloc(RawBinding::Package(PackageData {
            compound_name: CompoundName::new(),
            problem: None,
        }));
        let mut packages = FxHashMap::default();
        packages.insert(Arc::from(""), default_package);
        LookupEnvironment {
            store,
            name_env,
            types: FxHashMap::default(),
            packages,
            default_package,
            base_types,
            arrays: FxHashMap::default(),
            missing_types: FxHashMap::default(),
            units: IndexMap::new(),
            pending: FxHashMap::default(),
        }
    }

    pub fn name_environment(&self) -> &Arc<dyn NameEnvironment> {
        &self.name_env
    }

    pub fn base_type(&self, base: BaseType) -> BindingId {
        self.base_types
            .get(&base)
            .copied()
            .unwrap_or(BindingId::NONE)
    }

    pub fn default_package(&self) -> BindingId {
        self.default_package
    }

    pub fn unit_scope(&self, file_name: &str) -> Option<&UnitScope> {
        self.units.get(file_name)
    }

    pub fn unit_files(&self) -> impl Iterator<Item = &Arc<str>> {
        self.units.keys()
    }

    /// Id of the next field of `declaring_class`: its index among the
    /// class's fields, so the same field gets the same id in every pass.
    fn next_field_id(&self, declaring_class: BindingId) -> u32 {
        self.store
            .reference(declaring_class)
            .map_or(0, |data| data.fields.len() as u32)
    }

    /// The unit declaring a type, if it came from source.
    pub fn file_of_type(&self, ty: BindingId) -> Option<&Arc<str>> {
        self.store.reference(ty)?.file_name.as_ref()
    }

    pub fn is_problem_type(&self, ty: BindingId) -> bool {
        self.store
            .reference(ty)
            .is_some_and(|data| data.problem.is_some())
    }

    // =========================================================================
    // Packages and types by name
    // =========================================================================

    fn joined<S: AsRef<str>>(segments: &[S]) -> Arc<str> {
        let parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        Arc::from(parts.join("/"))
    }

    /// Package binding for `segments`, creating it and its prefixes.
    pub fn get_or_create_package(&mut self, segments: &[Arc<str>]) -> BindingId {
        let mut current = self.default_package;
        for len in 1..=segments.len() {
            let key = Self::joined(&segments[..len]);
            current = match self.packages.get(&key) {
                Some(id) => *id,
                None => {
                    let id = self.store.alloc(RawBinding::Package(PackageData {
                        compound_name: segments[..len].iter().cloned().collect(),
                        problem: None,
                    }));
                    self.packages.insert(key, id);
                    id
                }
            };
        }
        current
    }

    /// A known package, or one the name environment vouches for.
    pub fn get_package(&mut self, segments: &[&str]) -> Option<BindingId> {
        if segments.is_empty() {
            return None;
        }
        if let Some(id) = self.packages.get(&*Self::joined(segments)) {
            return Some(*id);
        }
        if self.name_env.is_package(segments) {
            let owned: Vec<Arc<str>> = segments.iter().map(|s| Arc::from(*s)).collect();
            return Some(self.get_or_create_package(&owned));
        }
        None
    }

    /// Package binding flagged `NotFound`, used for imports of unknown packages.
    pub fn problem_package(&mut self, segments: &[&str]) -> BindingId {
        self.store.alloc(RawBinding::Package(PackageData {
            compound_name: segments.iter().map(|s| Arc::from(*s)).collect(),
            problem: Some(ProblemReason::NotFound),
        }))
    }

    /// Fully qualified type lookup. Library types are installed on first use.
    pub fn get_type(&mut self, segments: &[&str]) -> Option<BindingId> {
        if segments.is_empty() {
            return None;
        }
        if let Some(id) = self.types.get(&*Self::joined(segments)) {
            return Some(*id);
        }
        let library = self.name_env.find_type(segments)?;
        Some(self.install_library_type(library))
    }

    pub fn get_type_or_package(&mut self, segments: &[&str]) -> Option<BindingId> {
        self.get_type(segments)
            .or_else(|| self.get_package(segments))
    }

    /// The universal object type, when the name environment has it.
    pub fn object_type(&mut self) -> Option<BindingId> {
        self.get_type(&["Object"])
    }

    /// `Object`, `String`, `Number`, `Function`, `Boolean` and friends.
    pub fn well_known_type(&mut self, name: &str) -> Option<BindingId> {
        self.get_type(&[name])
    }

    /// Problem reference binding for a name that does not resolve.
    pub fn missing_type(&mut self, segments: &[&str]) -> BindingId {
        let key = Self::joined(segments);
        if let Some(id) = self.missing_types.get(&key) {
            return *id;
        }
        let compound_name: CompoundName = segments.iter().map(|s| Arc::from(*s)).collect();
        let source_name = compound_name
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::from(""));
        let id = self.store.alloc(RawBinding::Reference(ReferenceData {
            compound_name,
            source_name,
            constant_pool_name: None,
            modifiers: Modifiers::empty(),
            flags: TypeFlags::empty(),
            enclosing: BindingId::NONE,
            package: BindingId::NONE,
            superclass: BindingId::NONE,
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
            file_name: None,
            problem: Some(ProblemReason::NotFound),
            closest_match: BindingId::NONE,
        }));
        trace!(name = %key, "missing type");
        self.missing_types.insert(key, id);
        id
    }

    /// Array of `dimensions` over `leaf`. Arrays of arrays are flattened.
    pub fn create_array_type(&mut self, leaf: BindingId, dimensions: u32) -> BindingId {
        let (leaf, dimensions) = match self.store.array(leaf) {
            Some(array) => (array.leaf, array.dimensions + dimensions),
            None => (leaf, dimensions),
        };
        if dimensions == 0 {
            return leaf;
        }
        if let Some(id) = self.arrays.get(&(leaf, dimensions)) {
            return *id;
        }
        let id = self
            .store
            .alloc(RawBinding::Array(ArrayData { leaf, dimensions }));
        self.arrays.insert((leaf, dimensions), id);
        id
    }

    fn install_library_type(&mut self, library: LibraryType) -> BindingId {
        let compound_name: CompoundName = library
            .compound_name
            .iter()
            .map(|s| Arc::from(s.as_str()))
            .collect();
        let package = if compound_name.len() > 1 {
            self.get_or_create_package(&compound_name[..compound_name.len() - 1])
        } else {
            self.default_package
        };
        let constant_pool_name = Self::joined(&compound_name);
        let source_name = compound_name
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::from(""));
        let id = self.store.alloc(RawBinding::Reference(ReferenceData {
            compound_name,
            source_name,
            constant_pool_name: Some(constant_pool_name.clone()),
            modifiers: library.modifiers | Modifiers::UNRESOLVED,
            flags: TypeFlags::BINARY,
            enclosing: BindingId::NONE,
            package,
            superclass: BindingId::NONE,
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
            file_name: None,
            problem: None,
            closest_match: BindingId::NONE,
        }));
        self.types.insert(constant_pool_name.clone(), id);
        debug!(name = %constant_pool_name, "installed library type");

        if let Some(superclass) = library.superclass.as_deref() {
            let segments: Vec<&str> = superclass.split('.').collect();
            if let Some(sup) = self.get_type(&segments)
                && !self.is_subclass_of(sup, id)
                && let Some(data) = self.store.reference_mut(id)
            {
                data.superclass = sup;
            }
        }
        self.pending.insert(id, PendingMembers::Library(library));
        id
    }

    // =========================================================================
    // Scoped lookup
    // =========================================================================

    /// Resolve a written type name as seen from `file` inside `enclosing`.
    pub fn lookup_type(
        &mut self,
        file: Option<&str>,
        enclosing: BindingId,
        segments: &[&str],
    ) -> Option<BindingId> {
        let (first, rest) = segments.split_first()?;
        if let Some(head) = self.lookup_simple_type(file, enclosing, first) {
            if let Some(found) = self.walk_member_types(head, rest) {
                return Some(found);
            }
        }
        for split in (1..=segments.len()).rev() {
            if let Some(ty) = self.get_type(&segments[..split])
                && let Some(found) = self.walk_member_types(ty, &segments[split..])
            {
                return Some(found);
            }
        }
        if let Some(file) = file {
            let package = self.unit_scope(file).map(|scope| scope.package);
            if let Some(package) = package
                && let Some(data) = self.store.package(package)
                && !data.compound_name.is_empty()
            {
                let mut qualified: Vec<Arc<str>> = data.compound_name.to_vec();
                qualified.extend(segments.iter().map(|s| Arc::from(*s)));
                let refs: Vec<&str> = qualified.iter().map(|s| &**s).collect();
                if let Some(found) = self.get_type(&refs) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn walk_member_types(&mut self, mut ty: BindingId, path: &[&str]) -> Option<BindingId> {
        for name in path {
            ty = self.find_member_type(ty, name)?;
        }
        Some(ty)
    }

    fn lookup_simple_type(
        &mut self,
        file: Option<&str>,
        enclosing: BindingId,
        name: &str,
    ) -> Option<BindingId> {
        let mut current = enclosing;
        let mut depth = 0;
        while current.is_some() && depth < MAX_HIERARCHY_DEPTH {
            if let Some(data) = self.store.reference(current)
                && &*data.source_name == name
                && !data.is_compilation_unit()
            {
                return Some(current);
            }
            if let Some(member) = self.find_member_type(current, name) {
                return Some(member);
            }
            current = self
                .store
                .reference(current)
                .map_or(BindingId::NONE, |data| data.enclosing);
            depth += 1;
        }

        let Some(scope) = file.and_then(|file| self.units.get(file)) else {
            return self.get_type(&[name]);
        };
        let top_level = scope.types.clone();
        let imports = scope.imports.clone();
        let package = scope.package;

        for ty in top_level {
            if self
                .store
                .reference(ty)
                .is_some_and(|data| &*data.source_name == name)
            {
                return Some(ty);
            }
        }
        let mut on_demand = Vec::new();
        for import in imports {
            let Some(RawBinding::Import(data)) = self.store.get(import) else {
                continue;
            };
            if data.on_demand {
                on_demand.push(data.resolved);
            } else if data.compound_name.last().is_some_and(|last| &**last == name)
                && self.store.reference(data.resolved).is_some()
            {
                return Some(data.resolved);
            }
        }
        if let Some(found) = self.type_in_package(package, name) {
            return Some(found);
        }
        for target in on_demand {
            if self.store.package(target).is_some() {
                if let Some(found) = self.type_in_package(target, name) {
                    return Some(found);
                }
            } else if self.store.reference(target).is_some()
                && let Some(found) = self.find_member_type(target, name)
            {
                return Some(found);
            }
        }
        self.get_type(&[name])
    }

    fn type_in_package(&mut self, package: BindingId, name: &str) -> Option<BindingId> {
        let data = self.store.package(package)?;
        if !data.is_valid() {
            return None;
        }
        let mut segments: Vec<Arc<str>> = data.compound_name.to_vec();
        segments.push(Arc::from(name));
        let refs: Vec<&str> = segments.iter().map(|s| &**s).collect();
        self.get_type(&refs)
    }

    /// Resolve a type reference. Unknown names yield a `NotFound` problem
    /// binding; `Untyped` yields `NONE`.
    pub fn resolve_type_ref(
        &mut self,
        file: Option<&str>,
        enclosing: BindingId,
        type_ref: &TypeRef,
    ) -> BindingId {
        match type_ref {
            TypeRef::Untyped => BindingId::NONE,
            TypeRef::Primitive { base, dimensions } => {
                let leaf = self.base_type(*base);
                self.create_array_type(leaf, *dimensions)
            }
            TypeRef::Named {
                segments,
                dimensions,
            } => {
                let refs: Vec<&str> = segments.iter().map(|s| &**s).collect();
                let leaf = match self.lookup_type(file, enclosing, &refs) {
                    Some(ty) => ty,
                    None => self.missing_type(&refs),
                };
                self.create_array_type(leaf, *dimensions)
            }
        }
    }

    // =========================================================================
    // Phase 1: type skeletons
    // =========================================================================

    /// Create skeleton bindings for the unit's package, its compilation-unit
    /// type and every type it declares.
    pub fn build_type_bindings(&mut self, tree: &SyntaxTree) {
        let file_name = tree.file_name.clone();
        if self.units.contains_key(&file_name) {
            warn!(file = %file_name, "unit already registered");
            return;
        }
        let Some(NodeKind::SourceFile { package, types, .. }) = tree.kind(tree.root) else {
            return;
        };
        let package_segments = match tree.kind(*package) {
            Some(NodeKind::PackageDeclaration { name }) => tree.name_segments(*name),
            _ => Vec::new(),
        };
        let package_id = self.get_or_create_package(&package_segments);

        let mut unit_compound: CompoundName = package_segments.iter().cloned().collect();
        unit_compound.push(file_name.clone());
        let unit_pool_name = Self::joined(&unit_compound);
        let unit_type = self.store.alloc(RawBinding::Reference(ReferenceData {
            compound_name: unit_compound,
            source_name: file_name.clone(),
            constant_pool_name: Some(unit_pool_name.clone()),
            modifiers: Modifiers::PUBLIC | Modifiers::UNRESOLVED,
            flags: TypeFlags::COMPILATION_UNIT,
            enclosing: BindingId::NONE,
            package: package_id,
            superclass: BindingId::NONE,
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
            file_name: Some(file_name.clone()),
            problem: None,
            closest_match: BindingId::NONE,
        }));
        self.types.insert(unit_pool_name, unit_type);

        let mut scope = UnitScope {
            file_name: file_name.clone(),
            package: package_id,
            unit_type,
            types: Vec::new(),
            imports: Vec::new(),
            declarations: FxHashMap::default(),
            released: false,
            superclasses: vec![(unit_type, TypeRef::Untyped)],
        };
        for decl in types.clone() {
            self.build_source_type(tree, decl, package_id, &package_segments, BindingId::NONE, &mut scope);
        }
        debug!(file = %file_name, types = scope.declarations.len(), "built type bindings");
        self.units.insert(file_name, scope);
    }

    fn build_source_type(
        &mut self,
        tree: &SyntaxTree,
        decl: NodeIndex,
        package: BindingId,
        package_segments: &[Arc<str>],
        enclosing: BindingId,
        scope: &mut UnitScope,
    ) {
        let Some(NodeKind::TypeDeclaration {
            modifiers,
            name,
            superclass,
            body,
            ..
        }) = tree.kind(decl)
        else {
            return;
        };
        let Some(source_name) = tree.identifier(*name).map(Arc::<str>::from) else {
            return;
        };
        let (last_segment, flags) = match self.store.reference(enclosing) {
            Some(outer) => {
                let outer_last = outer
                    .compound_name
                    .last()
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                (
                    Arc::<str>::from(format!("{outer_last}${source_name}")),
                    TypeFlags::MEMBER,
                )
            }
            None => (source_name.clone(), TypeFlags::empty()),
        };
        let mut compound_name: CompoundName = package_segments.iter().cloned().collect();
        compound_name.push(last_segment);
        let constant_pool_name = Self::joined(&compound_name);
        if self.types.contains_key(&constant_pool_name) {
            warn!(name = %constant_pool_name, file = %scope.file_name, "duplicate type declaration");
            return;
        }
        let id = self.store.alloc(RawBinding::Reference(ReferenceData {
            compound_name,
            source_name,
            constant_pool_name: Some(constant_pool_name.clone()),
            modifiers: *modifiers | Modifiers::UNRESOLVED,
            flags,
            enclosing,
            package,
            superclass: BindingId::NONE,
            fields: Vec::new(),
            methods: Vec::new(),
            member_types: Vec::new(),
            file_name: Some(scope.file_name.clone()),
            problem: None,
            closest_match: BindingId::NONE,
        }));
        self.types.insert(constant_pool_name, id);
        scope.declarations.insert(decl, id);
        scope
            .superclasses
            .push((id, TypeRef::from_node(tree, *superclass, 0)));
        match self.store.reference_mut(enclosing) {
            Some(outer) => outer.member_types.push(id),
            None => scope.types.push(id),
        }
        for member in body.clone() {
            if matches!(tree.kind(member), Some(NodeKind::TypeDeclaration { .. })) {
                self.build_source_type(tree, member, package, package_segments, id, scope);
            }
        }
    }

    // =========================================================================
    // Phase 2: hierarchy and members
    // =========================================================================

    /// Connect imports and superclasses, then create member bindings, for
    /// every unit of the batch.
    pub fn complete_type_bindings(&mut self, trees: &[&SyntaxTree]) {
        for tree in trees {
            self.connect_imports(tree);
        }
        for tree in trees {
            self.connect_superclasses(&tree.file_name);
        }
        for tree in trees {
            self.build_members(tree);
        }
    }

    fn connect_imports(&mut self, tree: &SyntaxTree) {
        let Some(NodeKind::SourceFile { imports, .. }) = tree.kind(tree.root) else {
            return;
        };
        let mut bindings = Vec::with_capacity(imports.len());
        for import in imports {
            let Some(NodeKind::ImportDeclaration { name, on_demand }) = tree.kind(*import) else {
                continue;
            };
            let segments = tree.name_segments(*name);
            let refs: Vec<&str> = segments.iter().map(|s| &**s).collect();
            let resolved = if *on_demand {
                self.get_type_or_package(&refs)
            } else {
                self.get_type(&refs)
            };
            let resolved = match resolved {
                Some(id) => id,
                None if *on_demand => self.problem_package(&refs),
                None => self.missing_type(&refs),
            };
            let id = self.store.alloc(RawBinding::Import(ImportData {
                compound_name: segments.into_iter().collect(),
                on_demand: *on_demand,
                resolved,
            }));
            bindings.push((*import, id));
        }
        if let Some(scope) = self.units.get_mut(&tree.file_name) {
            for (node, id) in bindings {
                scope.imports.push(id);
                scope.declarations.insert(node, id);
            }
        }
    }

    fn connect_superclasses(&mut self, file_name: &Arc<str>) {
        let Some(scope) = self.units.get_mut(file_name) else {
            return;
        };
        let superclasses = std::mem::take(&mut scope.superclasses);
        for (ty, type_ref) in superclasses {
            let enclosing = self
                .store
                .reference(ty)
                .map_or(BindingId::NONE, |data| data.enclosing);
            let declared = match &type_ref {
                TypeRef::Untyped => None,
                other => {
                    let candidate = self.resolve_type_ref(Some(&**file_name), enclosing, other);
                    let valid = self
                        .store
                        .reference(candidate)
                        .is_some_and(|data| data.is_valid() && !data.is_compilation_unit());
                    if !valid {
                        debug!(file = %file_name, "superclass does not resolve to a type; using Object");
                    }
                    valid.then_some(candidate)
                }
            };
            let mut superclass = match declared {
                Some(sup) => sup,
                None => self.object_type().unwrap_or(BindingId::NONE),
            };
            if superclass == ty || (superclass.is_some() && self.is_subclass_of(superclass, ty)) {
                warn!(file = %file_name, "superclass cycle broken");
                superclass = match self.object_type() {
                    Some(object) if object != ty && !self.is_subclass_of(object, ty) => object,
                    _ => BindingId::NONE,
                };
            }
            if let Some(data) = self.store.reference_mut(ty) {
                data.superclass = superclass;
            }
        }
    }

    fn build_members(&mut self, tree: &SyntaxTree) {
        let file_name = tree.file_name.clone();
        let Some(scope) = self.units.get(&file_name) else {
            return;
        };
        let unit_type = scope.unit_type;
        let Some(NodeKind::SourceFile {
            types, statements, ..
        }) = tree.kind(tree.root)
        else {
            return;
        };

        let mut declarations = Vec::new();
        for decl in types {
            self.build_type_members(tree, *decl, &mut declarations);
        }

        // Top-level functions and variables belong to the unit's own type.
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut stack: Vec<NodeIndex> = statements.iter().rev().copied().collect();
        while let Some(statement) = stack.pop() {
            match tree.kind(statement) {
                Some(NodeKind::FunctionDeclaration { .. }) => {
                    if let Some((id, params, ret)) = self.build_method(tree, statement, unit_type) {
                        declarations.push((statement, id));
                        methods.push((id, params, ret));
                    }
                }
                Some(NodeKind::VariableDeclarationStatement {
                    modifiers,
                    ty,
                    fragments,
                }) => {
                    for fragment in fragments {
                        if let Some((id, type_ref)) =
                            self.build_field(tree, *fragment, *ty, *modifiers, unit_type)
                        {
                            declarations.push((*fragment, id));
                            fields.push((id, type_ref));
                        }
                    }
                }
                Some(NodeKind::Block { statements }) => {
                    stack.extend(statements.iter().rev().copied());
                }
                _ => {}
            }
        }
        self.pending.insert(
            unit_type,
            PendingMembers::Source {
                file_name: file_name.clone(),
                fields,
                methods,
            },
        );

        if let Some(scope) = self.units.get_mut(&file_name) {
            scope.declarations.extend(declarations);
        }
    }

    fn build_type_members(
        &mut self,
        tree: &SyntaxTree,
        decl: NodeIndex,
        declarations: &mut Vec<(NodeIndex, BindingId)>,
    ) {
        let Some(ty) = self
            .units
            .get(&tree.file_name)
            .and_then(|scope| scope.declarations.get(&decl).copied())
        else {
            return;
        };
        let Some(NodeKind::TypeDeclaration { body, .. }) = tree.kind(decl) else {
            return;
        };
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut has_constructor = false;
        for member in body {
            match tree.kind(*member) {
                Some(NodeKind::FieldDeclaration {
                    modifiers,
                    ty: declared,
                    fragments,
                }) => {
                    for fragment in fragments {
                        if let Some((id, type_ref)) =
                            self.build_field(tree, *fragment, *declared, *modifiers, ty)
                        {
                            declarations.push((*fragment, id));
                            fields.push((id, type_ref));
                        }
                    }
                }
                Some(NodeKind::FunctionDeclaration { is_constructor, .. }) => {
                    has_constructor |= *is_constructor;
                    if let Some((id, params, ret)) = self.build_method(tree, *member, ty) {
                        declarations.push((*member, id));
                        methods.push((id, params, ret));
                    }
                }
                Some(NodeKind::TypeDeclaration { .. }) => {
                    self.build_type_members(tree, *member, declarations);
                }
                _ => {}
            }
        }
        if !has_constructor {
            let id = self.alloc_method(Arc::from(MethodData::CONSTRUCTOR_SELECTOR), Modifiers::PUBLIC, ty);
            methods.push((
                id,
                Vec::new(),
                TypeRef::Primitive {
                    base: BaseType::Void,
                    dimensions: 0,
                },
            ));
        }
        self.pending.insert(
            ty,
            PendingMembers::Source {
                file_name: tree.file_name.clone(),
                fields,
                methods,
            },
        );
    }

    fn build_field(
        &mut self,
        tree: &SyntaxTree,
        fragment: NodeIndex,
        declared: NodeIndex,
        modifiers: Modifiers,
        declaring_class: BindingId,
    ) -> Option<(BindingId, TypeRef)> {
        let Some(NodeKind::VariableDeclarationFragment {
            name,
            extra_dimensions,
            initializer,
        }) = tree.kind(fragment)
        else {
            return None;
        };
        let name: Arc<str> = Arc::from(tree.identifier(*name)?);
        let constant = if modifiers.contains(Modifiers::FINAL) {
            literal_constant(tree, *initializer)
        } else {
            None
        };
        let type_ref = TypeRef::from_node(tree, declared, *extra_dimensions);
        let id = self.next_field_id(declaring_class);
        let field = self.store.alloc(RawBinding::Field(FieldData {
            name,
            ty: BindingId::NONE,
            modifiers: modifiers | Modifiers::UNRESOLVED,
            declaring_class,
            id,
            constant,
            problem: None,
            closest_match: BindingId::NONE,
        }));
        if let Some(data) = self.store.reference_mut(declaring_class) {
            data.fields.push(field);
        }
        Some((field, type_ref))
    }

    fn build_method(
        &mut self,
        tree: &SyntaxTree,
        function: NodeIndex,
        declaring_class: BindingId,
    ) -> Option<(BindingId, Vec<TypeRef>, TypeRef)> {
        let Some(NodeKind::FunctionDeclaration {
            modifiers,
            is_constructor,
            name,
            return_type,
            parameters,
            extra_dimensions,
            ..
        }) = tree.kind(function)
        else {
            return None;
        };
        let selector: Arc<str> = if *is_constructor {
            Arc::from(MethodData::CONSTRUCTOR_SELECTOR)
        } else {
            Arc::from(tree.identifier(*name)?)
        };
        let params = parameters
            .iter()
            .map(|param| {
                TypeRef::from_node(tree, tree.declared_type(*param), tree.extra_dimensions(*param))
            })
            .collect();
        let ret = match TypeRef::from_node(tree, *return_type, *extra_dimensions) {
            TypeRef::Untyped => TypeRef::Primitive {
                base: BaseType::Void,
                dimensions: 0,
            },
            other if *is_constructor => {
                trace!(?other, "ignoring constructor return type");
                TypeRef::Primitive {
                    base: BaseType::Void,
                    dimensions: 0,
                }
            }
            other => other,
        };
        let id = self.alloc_method(selector, *modifiers, declaring_class);
        Some((id, params, ret))
    }

    fn alloc_method(
        &mut self,
        selector: Arc<str>,
        modifiers: Modifiers,
        declaring_class: BindingId,
    ) -> BindingId {
        let id = self.store.alloc(RawBinding::Method(MethodData {
            selector,
            return_type: BindingId::NONE,
            parameters: SmallVec::new(),
            declaring_class,
            modifiers: modifiers | Modifiers::UNRESOLVED,
            locals: Vec::new(),
            problem: None,
            closest_match: BindingId::NONE,
        }));
        if let Some(data) = self.store.reference_mut(declaring_class) {
            data.methods.push(id);
        }
        id
    }

    // =========================================================================
    // Lazy signature resolution
    // =========================================================================

    /// Resolve the field types and method signatures of `ty`, clearing the
    /// `UNRESOLVED` bits. Idempotent.
    pub fn resolve_types_for(&mut self, ty: BindingId) {
        let Some(pending) = self.pending.remove(&ty) else {
            return;
        };
        match pending {
            PendingMembers::Source {
                file_name,
                fields,
                methods,
            } => {
                for (field, type_ref) in fields {
                    let resolved = self.resolve_variable_type(Some(&*file_name), ty, &type_ref);
                    if let Some(data) = self.store.field_mut(field) {
                        data.ty = resolved;
                        data.modifiers.remove(Modifiers::UNRESOLVED);
                    }
                }
                for (method, params, ret) in methods {
                    let parameters = params
                        .iter()
                        .map(|param| self.resolve_parameter_type(Some(&*file_name), ty, param))
                        .collect();
                    let return_type = self.resolve_type_ref(Some(&*file_name), ty, &ret);
                    if let Some(data) = self.store.method_mut(method) {
                        data.parameters = parameters;
                        data.return_type = return_type;
                        data.modifiers.remove(Modifiers::UNRESOLVED);
                    }
                }
            }
            PendingMembers::Library(library) => {
                for field in &library.fields {
                    let resolved = self.resolve_type_ref(None, BindingId::NONE, &TypeRef::from_text(&field.ty));
                    let id = self.next_field_id(ty);
                    let binding = self.store.alloc(RawBinding::Field(FieldData {
                        name: Arc::from(field.name.as_str()),
                        ty: resolved,
                        modifiers: field.modifiers,
                        declaring_class: ty,
                        id,
                        constant: None,
                        problem: None,
                        closest_match: BindingId::NONE,
                    }));
                    if let Some(data) = self.store.reference_mut(ty) {
                        data.fields.push(binding);
                    }
                }
                for method in &library.methods {
                    let parameters = method
                        .parameters
                        .iter()
                        .map(|p| self.resolve_type_ref(None, BindingId::NONE, &TypeRef::from_text(p)))
                        .collect();
                    let return_type =
                        self.resolve_type_ref(None, BindingId::NONE, &TypeRef::from_text(&method.return_type));
                    let binding = self.store.alloc(RawBinding::Method(MethodData {
                        selector: Arc::from(method.selector.as_str()),
                        return_type,
                        parameters,
                        declaring_class: ty,
                        modifiers: method.modifiers,
                        locals: Vec::new(),
                        problem: None,
                        closest_match: BindingId::NONE,
                    }));
                    if let Some(data) = self.store.reference_mut(ty) {
                        data.methods.push(binding);
                    }
                }
            }
        }
        if let Some(data) = self.store.reference_mut(ty) {
            data.modifiers.remove(Modifiers::UNRESOLVED);
        }
        trace!(ty = ty.0, "resolved member signatures");
    }

    /// Type of a declared field or local: untyped declarations are `Object`,
    /// declarations whose type does not resolve have no type.
    pub fn resolve_variable_type(
        &mut self,
        file: Option<&str>,
        enclosing: BindingId,
        type_ref: &TypeRef,
    ) -> BindingId {
        if *type_ref == TypeRef::Untyped {
            return self.object_type().unwrap_or(BindingId::NONE);
        }
        let resolved = self.resolve_type_ref(file, enclosing, type_ref);
        if self.is_problem_type(self.store.leaf_component(resolved)) {
            BindingId::NONE
        } else {
            resolved
        }
    }

    fn resolve_parameter_type(
        &mut self,
        file: Option<&str>,
        enclosing: BindingId,
        type_ref: &TypeRef,
    ) -> BindingId {
        match type_ref {
            TypeRef::Untyped => self.object_type().unwrap_or(BindingId::NONE),
            other => self.resolve_type_ref(file, enclosing, other),
        }
    }

    /// Forget what the environment kept for a unit that will not be resolved.
    pub fn release_unit(&mut self, file_name: &str) {
        if let Some(scope) = self.units.get_mut(file_name) {
            scope.declarations.clear();
            scope.released = true;
            debug!(file = file_name, "released unit");
        }
    }

    /// Turn every type of a failed unit whose signatures were never resolved
    /// into a `NotFound` problem, together with its fields and methods. Key
    /// lookups and other units then see those types as missing instead of
    /// half-built. Returns the number of types scrubbed.
    pub fn scrub_unit(&mut self, file_name: &str) -> usize {
        let Some(scope) = self.units.get(file_name) else {
            return 0;
        };
        let mut queue = scope.types.clone();
        queue.push(scope.unit_type);
        let mut scrubbed = 0;
        while let Some(ty) = queue.pop() {
            let Some(data) = self.store.reference_mut(ty) else {
                continue;
            };
            queue.extend(data.member_types.iter().copied());
            if data.problem.is_some() || !data.modifiers.is_unresolved() {
                continue;
            }
            data.problem = Some(ProblemReason::NotFound);
            let (fields, methods) = (data.fields.clone(), data.methods.clone());
            self.pending.remove(&ty);
            for field in fields {
                if let Some(field) = self.store.field_mut(field) {
                    field.problem = Some(ProblemReason::NotFound);
                }
            }
            for method in methods {
                if let Some(method) = self.store.method_mut(method) {
                    method.problem = Some(ProblemReason::NotFound);
                }
            }
            scrubbed += 1;
        }
        self.release_unit(file_name);
        debug!(file = file_name, scrubbed, "scrubbed unit");
        scrubbed
    }
}

#[cfg(test)]
#[path = "../tests/environment_tests.rs"]
mod environment_tests;
