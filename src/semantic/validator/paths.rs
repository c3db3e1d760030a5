//! Path typing: state-field paths, collection-valued paths, `INDEX`, entity
//! type literals and UPDATE targets.

use smol_str::SmolStr;

use super::SemanticValidator;
use crate::ast::{NodeId, NodeKind};
use crate::diag::ProblemKey;
use crate::semantic::helper::SemanticValidatorHelper;

/// Outcome of resolving a state-field path.
enum PathCheck {
    Valid,
    Invalid(ProblemKey),
    /// `pkg.Enum.CONSTANT`; `valid` is false for an unknown constant.
    EnumConstant { valid: bool, enum_name: SmolStr },
}

impl<H: SemanticValidatorHelper> SemanticValidator<'_, H> {
    /// Validates `root.a.b`. With `association_allowed` false the path must end
    /// at a basic field.
    ///
    /// Returns `false` when a problem was recorded.
    pub(super) fn validate_state_field_path(&mut self, id: NodeId, association_allowed: bool) -> bool {
        let tree = self.tree;
        let NodeKind::StateFieldPath {
            root,
            segments,
            ends_with_dot,
        } = tree.kind(id)
        else {
            self.visit(id);
            return true;
        };

        self.visit(*root);
        if *ends_with_dot || !self.has_identification_variable(*root) {
            return true;
        }

        let check = match self.helper.resolve_mapping(id) {
            Some(mapping) if mapping.is_collection() => {
                PathCheck::Invalid(ProblemKey::StateFieldPathCollectionType)
            }
            Some(mapping) if mapping.is_relationship() && !association_allowed => {
                PathCheck::Invalid(ProblemKey::StateFieldPathAssociationField)
            }
            Some(mapping) if mapping.is_transient() => {
                PathCheck::Invalid(ProblemKey::StateFieldPathNoMapping)
            }
            Some(_) => PathCheck::Valid,
            None => match self.helper.path_type(id) {
                None => PathCheck::Invalid(ProblemKey::StateFieldPathNotResolvable),
                Some(info) if info.is_enum() => {
                    let constant = segments.last().map(|segment| segment.node.as_str());
                    PathCheck::EnumConstant {
                        valid: constant.is_some_and(|constant| {
                            info.enum_constants().iter().any(|known| known == constant)
                        }),
                        enum_name: info.name.clone(),
                    }
                }
                Some(_) => PathCheck::Invalid(ProblemKey::StateFieldPathNoMapping),
            },
        };

        match check {
            PathCheck::Valid => true,
            PathCheck::Invalid(key) => {
                self.problem_at(key, id);
                false
            }
            PathCheck::EnumConstant { valid, enum_name } => {
                // The leading segment was a package name, not a variable.
                self.used.retain(|used| used != root);
                if !valid {
                    if let Some(constant) = segments.last() {
                        self.problem_span(
                            ProblemKey::StateFieldPathInvalidEnumConstant,
                            id,
                            constant.span.clone(),
                            [constant.node.to_string(), enum_name.to_string()],
                        );
                    }
                }
                valid
            }
        }
    }

    /// Validates a path that must denote a collection (`collection_only`) or
    /// at least an association (join paths and derived declarations).
    pub(super) fn validate_collection_valued_path(&mut self, id: NodeId, collection_only: bool) -> bool {
        let Some(path) = self.path_behind(id) else {
            self.visit(id);
            return true;
        };
        let tree = self.tree;
        let (NodeKind::StateFieldPath {
            root,
            ends_with_dot,
            ..
        }
        | NodeKind::CollectionValuedPath {
            root,
            ends_with_dot,
            ..
        }) = tree.kind(path)
        else {
            return true;
        };

        self.visit(*root);
        if *ends_with_dot || !self.has_identification_variable(*root) {
            return true;
        }

        let problem = match self.helper.resolve_mapping(path) {
            None => Some(ProblemKey::CollectionValuedPathNotResolvable),
            Some(mapping) if self.helper.mapping_type(mapping).is_none() => {
                Some(ProblemKey::CollectionValuedPathNotResolvable)
            }
            Some(mapping) if collection_only && !mapping.is_collection() => {
                Some(ProblemKey::CollectionValuedPathNotCollectionType)
            }
            Some(mapping)
                if !collection_only && !mapping.is_relationship() && !mapping.is_collection() =>
            {
                Some(ProblemKey::CollectionValuedPathNotCollectionType)
            }
            Some(_) => None,
        };

        match problem {
            Some(key) => {
                self.problem_at(key, path);
                false
            }
            None => true,
        }
    }

    /// `SET path = value`: only embedded fields may be traversed, and no
    /// step may be a collection.
    pub(super) fn validate_update_item(&mut self, id: NodeId) {
        let Some(path) = self.path_behind(id) else {
            self.visit(id);
            return;
        };
        let tree = self.tree;
        let NodeKind::StateFieldPath { root, segments, .. } = tree.kind(path) else {
            self.visit(path);
            return;
        };
        self.visit(*root);
        let NodeKind::IdentificationVariable { name, .. } = tree.kind(*root) else {
            return;
        };

        let problem = match self.helper.managed_type(name) {
            None => Some(ProblemKey::StateFieldPathNotResolvable),
            Some(mut managed) => {
                let mut problem = None;
                for (index, segment) in segments.iter().enumerate() {
                    let last = index + 1 == segments.len();
                    let Some(mapping) = self.helper.mapping_named(managed, &segment.node) else {
                        problem = Some(ProblemKey::StateFieldPathNotResolvable);
                        break;
                    };
                    if mapping.is_collection() || (!last && !mapping.kind.is_embedded()) {
                        problem = Some(ProblemKey::UpdateItemRelationshipPathExpression);
                        break;
                    }
                    if !last {
                        match self.helper.mapping_managed_type(mapping) {
                            Some(embeddable) => managed = embeddable,
                            None => {
                                problem = Some(ProblemKey::StateFieldPathNotResolvable);
                                break;
                            }
                        }
                    }
                }
                problem
            }
        };

        if let Some(key) = problem {
            self.problem_at(key, path);
        }
    }

    /// `INDEX(v)` needs a variable bound to a collection's elements.
    pub(super) fn validate_index(&mut self, argument: NodeId) {
        self.visit(argument);
        if let NodeKind::IdentificationVariable {
            name,
            is_virtual: false,
            ..
        } = self.tree.kind(argument)
        {
            if !self.helper.is_collection_identification_variable(name) {
                self.problem_at(ProblemKey::IndexWrongVariable, argument);
            }
        }
    }

    pub(super) fn validate_entity_type_literal(&mut self, id: NodeId, name: &str) {
        if self.helper.entity_named(name).is_none() {
            self.problem_at(ProblemKey::EntityTypeLiteralNotResolvable, id);
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// The path node behind `id`: the node itself, or the path a virtual
    /// variable abbreviates.
    pub(super) fn path_behind(&self, id: NodeId) -> Option<NodeId> {
        match self.tree.kind(id) {
            NodeKind::StateFieldPath { .. } | NodeKind::CollectionValuedPath { .. } => Some(id),
            NodeKind::IdentificationVariable {
                is_virtual: true,
                virtual_path: Some(path),
                ..
            } => Some(*path),
            _ => None,
        }
    }

    /// Like [`path_behind`](Self::path_behind), restricted to state-field paths.
    pub(super) fn state_field_path(&self, id: NodeId) -> Option<NodeId> {
        self.path_behind(id)
            .filter(|path| matches!(self.tree.kind(*path), NodeKind::StateFieldPath { .. }))
    }

    /// Paths rooted at `KEY(..)` or `ENTRY(..)` are not resolved.
    fn has_identification_variable(&self, root: NodeId) -> bool {
        match self.tree.kind(root) {
            NodeKind::IdentificationVariable { .. } | NodeKind::Treat { .. } => true,
            NodeKind::Value { expression } => matches!(
                self.tree.kind(*expression),
                NodeKind::IdentificationVariable { .. }
            ),
            _ => false,
        }
    }
}
