//! Names, member lookup and problem bindings.

use super::Analyzer;
use crate::error::AnalyzerError;
use crate::raw::{
    BindingId, Constant, FieldData, MethodData, ProblemReason, RawBinding,
};
use jsbind_ast::{NodeIndex, NodeKind};
use jsbind_common::Modifiers;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::trace;

/// What a prefix of a qualified name denotes.
#[derive(Clone, Debug)]
enum Segment {
    Variable(BindingId),
    Type(BindingId),
    Package(Vec<Arc<str>>),
    /// Nothing; the binding recorded for the segment is a problem binding.
    Missing(BindingId),
}

impl Analyzer<'_> {
    // =========================================================================
    // Names used as expressions
    // =========================================================================

    /// Resolve a simple or qualified name. Every segment is recorded; the
    /// outermost node also gets the bindings of all segments.
    pub(super) fn name_expression(
        &mut self,
        node: NodeIndex,
    ) -> Result<(BindingId, Option<Constant>), AnalyzerError> {
        let mut levels = Vec::new();
        self.name_levels(node, &mut levels)?;
        let Some((_, first_name)) = levels.first().copied() else {
            return Ok((BindingId::NONE, None));
        };
        let Some(first) = self.tree.identifier(first_name).map(Arc::<str>::from) else {
            return Ok((BindingId::NONE, None));
        };

        let mut segment = self.first_segment(&first);
        let mut bindings: SmallVec<[BindingId; 4]> = SmallVec::new();
        for (i, (level, simple)) in levels.iter().copied().enumerate() {
            if i > 0 {
                let Some(identifier) = self.tree.identifier(simple).map(Arc::<str>::from) else {
                    break;
                };
                segment = self.next_segment(segment, &identifier);
            }
            let binding = self.segment_binding(&segment);
            let ty = self.segment_type(&segment);
            self.record(level, binding, ty);
            self.record(simple, binding, ty);
            let is_type = matches!(segment, Segment::Type(_));
            self.unit.node_mut(level).is_type_reference = is_type;
            self.unit.node_mut(simple).is_type_reference = is_type;
            bindings.push(binding);
        }

        if let Segment::Missing(_) = segment {
            trace!(name = %first, "name does not resolve");
        }
        let binding = bindings.last().copied().unwrap_or(BindingId::NONE);
        self.unit.node_mut(node).segment_bindings = bindings;
        let constant = self.variable_constant(binding);
        Ok((self.segment_type(&segment), constant))
    }

    /// `(node covering segments 1..=i, simple name of segment i)`, in order.
    fn name_levels(
        &self,
        node: NodeIndex,
        out: &mut Vec<(NodeIndex, NodeIndex)>,
    ) -> Result<(), AnalyzerError> {
        match self.kind(node)? {
            Some(NodeKind::SimpleName { .. }) => out.push((node, node)),
            Some(NodeKind::QualifiedName {
                qualifier, name, ..
            }) => {
                self.name_levels(qualifier, out)?;
                self.kind(name)?;
                out.push((node, name));
            }
            _ => {}
        }
        Ok(())
    }

    fn first_segment(&mut self, name: &Arc<str>) -> Segment {
        for scope in self.locals.iter().rev() {
            if let Some(local) = scope.get(name) {
                return Segment::Variable(*local);
            }
        }
        let mut current = self.context.enclosing_type;
        while current.is_some() {
            if let Some(field) = self.env.find_field(current, name) {
                return self.checked_field(field, false);
            }
            current = self
                .env
                .store
                .reference(current)
                .map_or(BindingId::NONE, |data| data.enclosing);
        }
        if self.context.enclosing_type != self.unit_type
            && let Some(field) = self.env.find_field(self.unit_type, name)
        {
            return Segment::Variable(field);
        }
        let file = self.file_name.clone();
        if let Some(ty) = self
            .env
            .lookup_type(Some(&*file), self.context.enclosing_type, &[&**name])
        {
            return Segment::Type(ty);
        }
        if self.env.get_package(&[&**name]).is_some() {
            return Segment::Package(vec![name.clone()]);
        }
        let enclosing = self.context.enclosing_type;
        Segment::Missing(self.problem_field(name, enclosing, ProblemReason::NotFound, BindingId::NONE))
    }

    fn next_segment(&mut self, previous: Segment, name: &Arc<str>) -> Segment {
        match previous {
            Segment::Package(mut segments) => {
                segments.push(name.clone());
                let refs: Vec<&str> = segments.iter().map(|s| &**s).collect();
                if let Some(ty) = self.env.get_type(&refs) {
                    return Segment::Type(ty);
                }
                if self.env.get_package(&refs).is_some() {
                    return Segment::Package(segments);
                }
                Segment::Missing(self.env.missing_type(&refs))
            }
            Segment::Type(ty) => {
                if let Some(field) = self.env.find_field(ty, name) {
                    return self.checked_field(field, true);
                }
                if let Some(member) = self.env.find_member_type(ty, name) {
                    return Segment::Type(member);
                }
                Segment::Missing(self.problem_field(name, ty, ProblemReason::NotFound, BindingId::NONE))
            }
            Segment::Variable(variable) => {
                let ty = self.env.store.variable_type(variable);
                if ty.is_some()
                    && let Some(field) = self.env.find_field(ty, name)
                {
                    return self.checked_field(field, false);
                }
                Segment::Missing(self.problem_field(name, ty, ProblemReason::NotFound, BindingId::NONE))
            }
            Segment::Missing(_) => Segment::Missing(BindingId::NONE),
        }
    }

    fn segment_binding(&mut self, segment: &Segment) -> BindingId {
        match segment {
            Segment::Variable(id) | Segment::Type(id) | Segment::Missing(id) => *id,
            Segment::Package(segments) => {
                let refs: Vec<&str> = segments.iter().map(|s| &**s).collect();
                self.env.get_package(&refs).unwrap_or(BindingId::NONE)
            }
        }
    }

    fn segment_type(&self, segment: &Segment) -> BindingId {
        match segment {
            Segment::Variable(id) | Segment::Missing(id) => self.variable_type_of(*id),
            Segment::Type(id) => *id,
            Segment::Package(_) => BindingId::NONE,
        }
    }

    /// Type of a field or local; a problem field answers with its closest
    /// match's type.
    fn variable_type_of(&self, id: BindingId) -> BindingId {
        match self.env.store.get(id) {
            Some(RawBinding::Field(data)) if data.problem.is_some() => {
                self.env.store.variable_type(data.closest_match)
            }
            Some(RawBinding::Field(data)) => data.ty,
            Some(RawBinding::Variable(data)) => data.ty,
            _ => BindingId::NONE,
        }
    }

    fn variable_constant(&self, id: BindingId) -> Option<Constant> {
        match self.env.store.get(id)? {
            RawBinding::Field(data) if data.problem.is_none() => data.constant.clone(),
            RawBinding::Variable(data) => data.constant.clone(),
            _ => None,
        }
    }

    /// Apply visibility and static-context rules to a field found by lookup.
    fn checked_field(&mut self, field: BindingId, static_receiver: bool) -> Segment {
        let Some(data) = self.env.store.field(field) else {
            return Segment::Missing(BindingId::NONE);
        };
        let (name, declaring, modifiers) = (data.name.clone(), data.declaring_class, data.modifiers);
        if modifiers.contains(Modifiers::PRIVATE) && !self.can_see_private(declaring) {
            return Segment::Missing(self.problem_field(&name, declaring, ProblemReason::NotVisible, field));
        }
        if !modifiers.contains(Modifiers::STATIC) && self.needs_static(declaring, static_receiver) {
            return Segment::Missing(self.problem_field(
                &name,
                declaring,
                ProblemReason::NonStaticReferenceInStaticContext,
                field,
            ));
        }
        Segment::Variable(field)
    }

    /// Whether an instance member of `declaring` is used without an instance.
    fn needs_static(&self, declaring: BindingId, static_receiver: bool) -> bool {
        let is_unit_member = self
            .env
            .store
            .reference(declaring)
            .is_some_and(|data| data.is_compilation_unit());
        !is_unit_member && (static_receiver || self.context.is_static)
    }

    fn outermost_type(&self, ty: BindingId) -> BindingId {
        let mut current = ty;
        while let Some(data) = self.env.store.reference(current) {
            if data.enclosing.is_none() {
                break;
            }
            current = data.enclosing;
        }
        current
    }

    fn can_see_private(&self, declaring: BindingId) -> bool {
        self.outermost_type(declaring) == self.outermost_type(self.context.enclosing_type)
    }

    // =========================================================================
    // Problem bindings
    // =========================================================================

    pub(super) fn problem_field(
        &mut self,
        name: &str,
        declaring_class: BindingId,
        reason: ProblemReason,
        closest_match: BindingId,
    ) -> BindingId {
        let ty = self.env.store.variable_type(closest_match);
        self.env.store.alloc(RawBinding::Field(FieldData {
            name: Arc::from(name),
            ty,
            modifiers: Modifiers::empty(),
            declaring_class,
            id: FieldData::NO_ID,
            constant: None,
            problem: Some(reason),
            closest_match,
        }))
    }

    pub(super) fn problem_method(
        &mut self,
        selector: &str,
        declaring_class: BindingId,
        arguments: &[BindingId],
        reason: ProblemReason,
        closest_match: BindingId,
    ) -> BindingId {
        let return_type = self
            .env
            .store
            .method(closest_match)
            .map_or(BindingId::NONE, |data| data.return_type);
        self.env.store.alloc(RawBinding::Method(MethodData {
            selector: Arc::from(selector),
            return_type,
            parameters: arguments.iter().copied().collect(),
            declaring_class,
            modifiers: Modifiers::empty(),
            locals: Vec::new(),
            problem: Some(reason),
            closest_match,
        }))
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Pick the method matching the argument types best: same arity with
    /// compatible arguments, then same arity, then the nearest declaration.
    fn select_method(&mut self, candidates: &[BindingId], arguments: &[BindingId]) -> Option<BindingId> {
        let same_arity: Vec<BindingId> = candidates
            .iter()
            .copied()
            .filter(|method| {
                self.env
                    .store
                    .method(*method)
                    .is_some_and(|data| data.parameters.len() == arguments.len())
            })
            .collect();
        for method in &same_arity {
            let parameters = match self.env.store.method(*method) {
                Some(data) => data.parameters.clone(),
                None => continue,
            };
            let applicable = parameters.iter().zip(arguments).all(|(param, arg)| {
                param.is_none()
                    || arg.is_none()
                    || self.env.is_compatible_with(*arg, *param)
                    || self.env.is_boxing_compatible(*arg, *param)
            });
            if applicable {
                return Some(*method);
            }
        }
        same_arity
            .first()
            .or_else(|| candidates.first())
            .copied()
    }

    /// Apply visibility and static-context rules to a method found by lookup.
    fn checked_method(&mut self, method: BindingId, arguments: &[BindingId], static_receiver: bool) -> BindingId {
        let Some(data) = self.env.store.method(method) else {
            return method;
        };
        let (selector, declaring, modifiers) = (data.selector.clone(), data.declaring_class, data.modifiers);
        let is_constructor = data.is_constructor();
        if modifiers.contains(Modifiers::PRIVATE) && !self.can_see_private(declaring) {
            return self.problem_method(&selector, declaring, arguments, ProblemReason::NotVisible, method);
        }
        if !is_constructor
            && !modifiers.contains(Modifiers::STATIC)
            && self.needs_static(declaring, static_receiver)
        {
            return self.problem_method(
                &selector,
                declaring,
                arguments,
                ProblemReason::NonStaticReferenceInStaticContext,
                method,
            );
        }
        method
    }

    fn method_return_type(&self, method: BindingId) -> BindingId {
        match self.env.store.method(method) {
            Some(data) if data.problem.is_some() => self
                .env
                .store
                .method(data.closest_match)
                .map_or(BindingId::NONE, |closest| closest.return_type),
            Some(data) => data.return_type,
            None => BindingId::NONE,
        }
    }

    fn finish_call(&mut self, node: NodeIndex, name: NodeIndex, arguments: &[NodeIndex], method: BindingId) -> BindingId {
        self.convert_arguments(arguments, method);
        let return_type = self.method_return_type(method);
        self.unit.node_mut(node).binding = method;
        self.record(name, method, return_type);
        return_type
    }

    pub(super) fn invocation(
        &mut self,
        node: NodeIndex,
        receiver: NodeIndex,
        name: NodeIndex,
        arguments: &[NodeIndex],
    ) -> Result<BindingId, AnalyzerError> {
        let (owner, static_receiver) = if receiver.is_some() {
            let ty = self.expression(receiver)?;
            let is_type = self.unit.node(receiver).is_some_and(|n| n.is_type_reference);
            (Some(ty), is_type)
        } else {
            (None, false)
        };
        let argument_types = self.arguments(arguments)?;
        self.kind(name)?;
        let Some(selector) = self.tree.identifier(name).map(str::to_string) else {
            return Ok(BindingId::NONE);
        };

        let method = match owner {
            None => self.implicit_method(&selector, &argument_types),
            Some(ty) => {
                let candidates = if self.is_valid_type(ty) {
                    self.env.find_methods(ty, &selector)
                } else {
                    Vec::new()
                };
                match self.select_method(&candidates, &argument_types) {
                    Some(method) => self.checked_method(method, &argument_types, static_receiver),
                    None => self.problem_method(&selector, ty, &argument_types, ProblemReason::NotFound, BindingId::NONE),
                }
            }
        };
        Ok(self.finish_call(node, name, arguments, method))
    }

    /// A call without receiver: the enclosing types from the inside out, then
    /// the unit's own functions.
    fn implicit_method(&mut self, selector: &str, arguments: &[BindingId]) -> BindingId {
        let mut owners = Vec::new();
        let mut current = self.context.enclosing_type;
        while current.is_some() && !owners.contains(&current) {
            owners.push(current);
            current = self
                .env
                .store
                .reference(current)
                .map_or(BindingId::NONE, |data| data.enclosing);
        }
        if !owners.contains(&self.unit_type) {
            owners.push(self.unit_type);
        }
        for owner in owners {
            let candidates = self.env.find_methods(owner, selector);
            if let Some(method) = self.select_method(&candidates, arguments) {
                return self.checked_method(method, arguments, false);
            }
        }
        let enclosing = self.context.enclosing_type;
        self.problem_method(selector, enclosing, arguments, ProblemReason::NotFound, BindingId::NONE)
    }

    pub(super) fn super_invocation(
        &mut self,
        node: NodeIndex,
        name: NodeIndex,
        arguments: &[NodeIndex],
    ) -> Result<BindingId, AnalyzerError> {
        let argument_types = self.arguments(arguments)?;
        self.kind(name)?;
        let Some(selector) = self.tree.identifier(name).map(str::to_string) else {
            return Ok(BindingId::NONE);
        };
        let superclass = self.superclass_of(self.context.enclosing_type);
        let candidates = if superclass.is_some() {
            self.env.find_methods(superclass, &selector)
        } else {
            Vec::new()
        };
        let method = match self.select_method(&candidates, &argument_types) {
            Some(method) => self.checked_method(method, &argument_types, false),
            None => self.problem_method(&selector, superclass, &argument_types, ProblemReason::NotFound, BindingId::NONE),
        };
        Ok(self.finish_call(node, name, arguments, method))
    }

    pub(super) fn instance_creation(
        &mut self,
        node: NodeIndex,
        ty: NodeIndex,
        arguments: &[NodeIndex],
    ) -> Result<BindingId, AnalyzerError> {
        let created = self.resolve_type_node(ty)?;
        let argument_types = self.arguments(arguments)?;
        let constructor = self.constructor_for(created, &argument_types);
        self.convert_arguments(arguments, constructor);
        self.unit.node_mut(node).binding = constructor;
        Ok(created)
    }

    pub(super) fn explicit_constructor_call(
        &mut self,
        node: NodeIndex,
        owner: BindingId,
        arguments: &[NodeIndex],
    ) -> Result<(), AnalyzerError> {
        let argument_types = self.arguments(arguments)?;
        let constructor = self.constructor_for(owner, &argument_types);
        self.convert_arguments(arguments, constructor);
        self.unit.node_mut(node).binding = constructor;
        Ok(())
    }

    fn constructor_for(&mut self, owner: BindingId, arguments: &[BindingId]) -> BindingId {
        let candidates = if self.is_valid_type(owner) {
            self.env
                .find_methods(owner, MethodData::CONSTRUCTOR_SELECTOR)
        } else {
            Vec::new()
        };
        match self.select_method(&candidates, arguments) {
            Some(constructor) => self.checked_method(constructor, arguments, false),
            None => self.problem_method(
                MethodData::CONSTRUCTOR_SELECTOR,
                owner,
                arguments,
                ProblemReason::NotFound,
                BindingId::NONE,
            ),
        }
    }

    fn is_valid_type(&self, ty: BindingId) -> bool {
        match self.env.store.get(ty) {
            Some(RawBinding::Reference(data)) => data.is_valid(),
            Some(RawBinding::Array(_)) => true,
            _ => false,
        }
    }

    // =========================================================================
    // Field accesses
    // =========================================================================

    pub(super) fn field_access(
        &mut self,
        node: NodeIndex,
        receiver: NodeIndex,
        name: NodeIndex,
    ) -> Result<(BindingId, Option<Constant>), AnalyzerError> {
        let owner = self.expression(receiver)?;
        let static_receiver = self.unit.node(receiver).is_some_and(|n| n.is_type_reference);
        self.member_field(node, owner, name, static_receiver)
    }

    pub(super) fn super_field_access(
        &mut self,
        node: NodeIndex,
        name: NodeIndex,
    ) -> Result<(BindingId, Option<Constant>), AnalyzerError> {
        let superclass = self.superclass_of(self.context.enclosing_type);
        self.member_field(node, superclass, name, false)
    }

    fn member_field(
        &mut self,
        node: NodeIndex,
        owner: BindingId,
        name: NodeIndex,
        static_receiver: bool,
    ) -> Result<(BindingId, Option<Constant>), AnalyzerError> {
        self.kind(name)?;
        let Some(identifier) = self.tree.identifier(name).map(Arc::<str>::from) else {
            return Ok((BindingId::NONE, None));
        };
        let found = if self.is_valid_type(owner) {
            self.env.find_field(owner, &identifier)
        } else {
            None
        };
        let field = match found {
            Some(field) => match self.checked_field(field, static_receiver) {
                Segment::Variable(id) | Segment::Missing(id) => id,
                Segment::Type(_) | Segment::Package(_) => BindingId::NONE,
            },
            None => self.problem_field(&identifier, owner, ProblemReason::NotFound, BindingId::NONE),
        };
        let ty = self.variable_type_of(field);
        self.unit.node_mut(node).binding = field;
        self.record(name, field, ty);
        Ok((ty, self.variable_constant(field)))
    }
}
