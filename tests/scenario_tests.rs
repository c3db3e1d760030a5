//! End-to-end queries over the HR fixture, from text to problems.

mod common;

use common::{assert_problems, assert_valid, problems_with, validate_query};
use jpql_parser::ProblemKey;

#[test]
fn basic_numeric_comparison_is_valid() {
    assert_valid("SELECT e FROM Employee e WHERE e.salary > 1000");
}

#[test]
fn association_in_ordering_comparison_is_reported_once() {
    let source = "SELECT e FROM Employee e WHERE e.manager > 1000";
    let outcome = assert_problems(source, &[ProblemKey::StateFieldPathAssociationField]);

    let problem = &outcome.problems[0];
    let start = source.find("e.manager").unwrap();
    assert_eq!(problem.span(), start..start + "e.manager".len());
    assert_eq!(problem.arguments, vec!["e.manager".to_string()]);
    let anchor = problem.anchor.expect("semantic problems are anchored");
    assert_eq!(outcome.tree.text(anchor), "e.manager");
}

#[test]
fn undeclared_root_variable_is_reported_for_every_use() {
    let outcome = validate_query("SELECT e FROM Employee m JOIN m.reports r WHERE e.name = 'x'");

    let undeclared = problems_with(&outcome, ProblemKey::IdentificationVariableNotDeclared);
    assert_eq!(undeclared.len(), 2);
    assert!(undeclared.iter().all(|problem| problem.arguments == ["e"]));
    assert!(problems_with(&outcome, ProblemKey::IdentificationVariableWrongOrder).is_empty());
}

#[test]
fn join_through_a_later_variable_is_wrong_order() {
    let source = "SELECT e FROM Employee e JOIN r.projects p JOIN e.reports r";
    let outcome = assert_problems(source, &[ProblemKey::IdentificationVariableWrongOrder]);

    let problem = &outcome.problems[0];
    let start = source.find("r.projects").unwrap();
    assert_eq!(problem.span(), start..start + 1);
    assert_eq!(problem.message(), "the identification variable 'r' is used before it is declared");
}

#[test]
fn qualified_enum_constant_is_valid() {
    assert_valid("SELECT e FROM Employee e WHERE e.type = com.acme.Department.HR");
}

#[test]
fn unknown_enum_constant_points_at_the_constant() {
    let source = "SELECT e FROM Employee e WHERE e.type = com.acme.Department.FINANCE";
    let outcome = assert_problems(source, &[ProblemKey::StateFieldPathInvalidEnumConstant]);

    let problem = &outcome.problems[0];
    let start = source.find("FINANCE").unwrap();
    assert_eq!(problem.span(), start..start + "FINANCE".len());
    assert_eq!(
        problem.message(),
        "'FINANCE' is not a constant of the enum com.acme.Department"
    );
}

#[test]
fn correlated_subquery_sees_the_outer_scope() {
    assert_valid(
        "SELECT e FROM Employee e \
         WHERE e.id IN (SELECT d.id FROM Department d WHERE d.name = e.deptName)",
    );
}

#[test]
fn subquery_variables_do_not_leak_out() {
    let outcome = validate_query(
        "SELECT d FROM Employee e WHERE e.id IN (SELECT d.id FROM Department d)",
    );
    let undeclared = problems_with(&outcome, ProblemKey::IdentificationVariableNotDeclared);
    assert_eq!(undeclared.len(), 1);
    assert_eq!(undeclared[0].start, "SELECT ".len());
}

#[test]
fn alias_less_update_resolves_bare_fields() {
    assert_valid("UPDATE Employee SET salary = salary * 2 WHERE name = 'x'");
}

#[test]
fn alias_less_delete_subquery_may_name_a_relationship() {
    assert_valid("DELETE FROM Employee WHERE EXISTS (SELECT p FROM projects p WHERE p.budget > 10)");
}

#[test]
fn alias_less_delete_subquery_rejects_a_basic_field() {
    assert_problems(
        "DELETE FROM Employee WHERE EXISTS (SELECT n FROM name n)",
        &[ProblemKey::PathNotRelationshipMapping],
    );
}

#[test]
fn syntax_and_semantic_problems_are_reported_together() {
    let outcome = validate_query("SELECT e FROM Employee e WHERE e.manager > ");
    assert!(outcome.syntax_problems().count() >= 1);
    assert_eq!(
        outcome.semantic_problems().map(|p| p.key).collect::<Vec<_>>(),
        vec![ProblemKey::StateFieldPathAssociationField]
    );
}

#[test]
fn reports_render_through_miette() {
    let outcome = validate_query("SELECT e FROM Employee e WHERE e.manager > 1000");
    let reports = outcome.to_reports();
    assert_eq!(reports.len(), 1);
    let rendered = format!("{:?}", reports[0]);
    assert!(rendered.contains("association"), "{rendered}");
}
