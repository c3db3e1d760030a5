//! Operands of arithmetic, ordering comparisons and scalar functions must not
//! navigate to associations.

use super::SemanticValidator;
use crate::ast::{AggregateFunction, NodeId};
use crate::semantic::helper::SemanticValidatorHelper;

/// Which operands of a binary expression passed the path check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct OperandValidity {
    pub(super) left: bool,
    pub(super) right: bool,
}

impl<H: SemanticValidatorHelper> SemanticValidator<'_, H> {
    /// Checks both operands of `+ - * /` or `< <= > >=`, then visits the ones
    /// that passed. A rejected path is not visited again.
    pub(super) fn validate_operands(&mut self, left: NodeId, right: NodeId) -> OperandValidity {
        let validity = OperandValidity {
            left: self.check_basic_path(left),
            right: self.check_basic_path(right),
        };
        if validity.left {
            self.visit(left);
        }
        if validity.right {
            self.visit(right);
        }
        validity
    }

    /// A single function argument: a path must end at a basic field, anything
    /// else is visited normally.
    pub(super) fn validate_basic_operand(&mut self, id: NodeId) -> bool {
        match self.state_field_path(id) {
            Some(path) => self.validate_state_field_path(path, false),
            None => {
                self.visit(id);
                true
            }
        }
    }

    /// `COUNT` accepts any path; the other aggregates need basic operands.
    pub(super) fn validate_aggregate(&mut self, function: AggregateFunction, expression: NodeId) {
        if function == AggregateFunction::Count {
            self.visit(expression);
        } else {
            self.validate_basic_operand(expression);
        }
    }

    fn check_basic_path(&mut self, id: NodeId) -> bool {
        match self.state_field_path(id) {
            Some(path) => self.validate_state_field_path(path, false),
            None => true,
        }
    }
}
