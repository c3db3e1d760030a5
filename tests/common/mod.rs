//! Common test utilities
//!
//! Shared fixtures and assertion helpers for the integration tests.
//!
//! # Fixture
//! - [`model`] - A small HR metamodel: `Employee`, `Department`, `Project`,
//!   the `Address` embeddable and the `com.acme.Department` enum
//!
//! # Helpers
//! - [`validate_query`] - Parse and validate a full statement against [`model`]
//! - [`assert_valid`] - Assert that a statement produces no problems
//! - [`assert_problems`] - Assert the exact problem keys of a statement
//! - [`parse_cleanly`] - Parse a statement, panicking on syntax problems
//! - [`find_node`] - Locate a node by its source text

#![allow(dead_code)]

use jpql_parser::grammar::rules::QL_STATEMENT;
use jpql_parser::semantic::{InMemoryMetamodel, ManagedType, MappingKind};
use jpql_parser::{ExpressionTree, NodeId, Problem, ProblemKey, ValidationOutcome, parse, validate};

pub const EMPLOYEE: &str = "com.acme.entity.Employee";
pub const DEPARTMENT: &str = "com.acme.entity.Department";
pub const PROJECT: &str = "com.acme.entity.Project";
pub const ADDRESS: &str = "com.acme.entity.Address";
pub const DEPARTMENT_ENUM: &str = "com.acme.Department";

// ============================================================================
// Fixture
// ============================================================================

/// The metamodel every integration test validates against.
pub fn model() -> InMemoryMetamodel {
    InMemoryMetamodel::new()
        .with_managed_type(
            ManagedType::entity("Employee", EMPLOYEE)
                .with_mapping("id", MappingKind::Id, "long")
                .with_basic("name", "java.lang.String")
                .with_basic("salary", "long")
                .with_basic("deptName", "java.lang.String")
                .with_basic("type", DEPARTMENT_ENUM)
                .with_mapping("version", MappingKind::Version, "int")
                .with_mapping("manager", MappingKind::ManyToOne, EMPLOYEE)
                .with_mapping("department", MappingKind::ManyToOne, DEPARTMENT)
                .with_mapping("reports", MappingKind::OneToMany, EMPLOYEE)
                .with_mapping("projects", MappingKind::ManyToMany, PROJECT)
                .with_mapping("address", MappingKind::Embedded, ADDRESS)
                .with_mapping("nicknames", MappingKind::ElementCollection, "java.lang.String")
                .with_mapping("cache", MappingKind::Transient, "java.lang.String"),
        )
        .with_managed_type(
            ManagedType::entity("Department", DEPARTMENT)
                .with_mapping("id", MappingKind::Id, "long")
                .with_basic("name", "java.lang.String")
                .with_mapping("employees", MappingKind::OneToMany, EMPLOYEE),
        )
        .with_managed_type(
            ManagedType::entity("Project", PROJECT)
                .with_mapping("id", MappingKind::Id, "long")
                .with_basic("name", "java.lang.String")
                .with_basic("budget", "double")
                .with_mapping("lead", MappingKind::ManyToOne, EMPLOYEE),
        )
        .with_managed_type(
            ManagedType::embeddable(ADDRESS)
                .with_basic("street", "java.lang.String")
                .with_basic("city", "java.lang.String")
                .with_basic("zip", "java.lang.String"),
        )
        .with_enum(DEPARTMENT_ENUM, ["HR", "ENGINEERING", "SALES"])
}

// ============================================================================
// Formatting and assertion helpers
// ============================================================================

/// Format problems for display in assertion messages.
pub fn format_problems(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(|problem| problem.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse and validate a full statement against [`model`].
pub fn validate_query(source: &str) -> ValidationOutcome {
    validate(source, QL_STATEMENT, &model())
        .unwrap_or_else(|err| panic!("statement rule must be registered: {err}"))
}

pub fn problem_keys(outcome: &ValidationOutcome) -> Vec<ProblemKey> {
    outcome.problems.iter().map(|problem| problem.key).collect()
}

/// Assert that a statement parses and validates without any problem.
pub fn assert_valid(source: &str) {
    let outcome = validate_query(source);
    assert!(
        outcome.is_success(),
        "unexpected problems for `{source}`:\n{}",
        format_problems(&outcome.problems)
    );
}

/// Assert the exact problem keys of a statement, in report order.
pub fn assert_problems(source: &str, expected: &[ProblemKey]) -> ValidationOutcome {
    let outcome = validate_query(source);
    assert_eq!(
        problem_keys(&outcome),
        expected,
        "problems for `{source}`:\n{}",
        format_problems(&outcome.problems)
    );
    outcome
}

/// The problems of `outcome` with `key`.
pub fn problems_with(outcome: &ValidationOutcome, key: ProblemKey) -> Vec<&Problem> {
    outcome
        .problems
        .iter()
        .filter(|problem| problem.key == key)
        .collect()
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parse a statement and return its tree, panicking on syntax problems.
pub fn parse_cleanly(source: &str) -> ExpressionTree {
    let output = parse(source, QL_STATEMENT)
        .unwrap_or_else(|err| panic!("statement rule must be registered: {err}"));
    assert!(
        output.problems.is_empty(),
        "unexpected syntax problems for `{source}`:\n{}",
        format_problems(&output.problems)
    );
    output.tree
}

/// The first node, in creation order, whose source text is exactly `text`.
pub fn find_node(tree: &ExpressionTree, text: &str) -> NodeId {
    tree.nodes()
        .map(|(id, _)| id)
        .find(|id| tree.text(*id) == text)
        .unwrap_or_else(|| panic!("no node with text `{text}` in `{}`", tree.source()))
}
