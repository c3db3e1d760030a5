//! Semantic validation for parsed JPQL.
//!
//! A query that parses can still be wrong: a variable may be used before (or
//! without) being declared, a path may navigate to a field the entity does not
//! map, an arithmetic operand may be an association. This module checks those
//! rules against a persistence metamodel.
//!
//! # Architecture
//!
//! - [`Metamodel`] describes entities, embeddables, mappings and named types.
//!   [`InMemoryMetamodel`] builds one in code.
//! - [`SemanticValidatorHelper`] is what the validator asks while walking:
//!   declarations of the current scope, variable types, path resolution and
//!   subquery scope push/pop. [`JpqlQueryContext`] implements it over a
//!   [`Metamodel`].
//! - [`SemanticValidator`] walks the tree once, matching on every node kind,
//!   and accumulates [`Problem`](crate::diag::Problem)s.
//!
//! # Example
//!
//! ```ignore
//! use jpql_parser::grammar::rules::QL_STATEMENT;
//! use jpql_parser::semantic::{InMemoryMetamodel, JpqlQueryContext, ManagedType, SemanticValidator};
//!
//! let model = InMemoryMetamodel::new().with_managed_type(
//!     ManagedType::entity("Employee", "com.acme.Employee").with_basic("name", "java.lang.String"),
//! );
//! let output = jpql_parser::parse("SELECT e FROM Employee e WHERE e.name = 'x'", QL_STATEMENT)?;
//! let context = JpqlQueryContext::new(&output.tree, &model);
//! let problems = SemanticValidator::new(&output.tree, context).validate();
//! assert!(problems.is_empty());
//! ```

mod context;
mod helper;
mod metamodel;
mod validator;

pub use context::JpqlQueryContext;
pub use helper::{
    Declaration, DeclarationKind, DeclaredVariables, JoinDeclaration, SemanticValidatorHelper,
};
pub use metamodel::{
    InMemoryMetamodel, ManagedType, Mapping, MappingKind, Metamodel, TypeInfo, TypeKind,
};
pub use validator::{SemanticValidator, ValidationConfig};
