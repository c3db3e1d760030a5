//! Properties that hold across a corpus of queries, valid and broken alike.

mod common;

use common::{model, problem_keys, validate_query};
use jpql_parser::ast::normalize_whitespace;
use jpql_parser::grammar::rules::QL_STATEMENT;
use jpql_parser::{JpqlQueryContext, NodeKind, ProblemKey, SemanticValidator, parse};

const VALID: &[&str] = &[
    "SELECT e FROM Employee e",
    "SELECT e.name, e.salary FROM Employee e WHERE e.salary BETWEEN 10 AND 20",
    "SELECT DISTINCT p FROM Employee e JOIN e.projects p WHERE p.budget > 1.5",
    "SELECT e FROM Employee e LEFT JOIN e.manager m WHERE m.name LIKE 'A%' ESCAPE '!'",
    "SELECT COUNT(e), AVG(e.salary) FROM Employee e GROUP BY e.deptName HAVING COUNT(e) > 2",
    "SELECT e FROM Employee e WHERE e.address.city = :city ORDER BY e.name DESC",
    "SELECT e FROM Employee e WHERE e.projects IS EMPTY OR SIZE(e.reports) > 3",
    "SELECT e FROM Employee e WHERE EXISTS (SELECT r FROM e.reports r WHERE r.salary > e.salary)",
    "SELECT CASE WHEN e.salary > 10 THEN 'high' ELSE 'low' END FROM Employee e",
    "SELECT e FROM Employee e, IN(e.projects) p WHERE p.lead = e",
    "UPDATE Employee e SET e.salary = e.salary * 1.1, e.address.city = 'Oslo'",
    "DELETE FROM Employee e WHERE e.version < 2",
];

const BROKEN: &[&str] = &[
    "",
    "SELECT",
    "SELECT e FROM",
    "SELECT e FROM Employee e WHERE",
    "SELECT e FROM Employee e WHERE e.salary >",
    "SELECT e FROM Employee e WHERE (e.salary > 1",
    "SELECT e FROM Employee e WHERE e.name = 'open",
    "SELECT e FROM Employee e WHERE e.name # 1",
    "SELECT e FROM Employee e ORDER BY",
    "UPDATE Employee e SET",
    "DELETE Employee e",
    "SELECT e FROM Employee e GROUP BY UPPER(e.name)",
    "SELECT e, FROM Employee e JOIN",
    "SELECT x FROM Employee e JOIN y.reports r WHERE z.name = e.manager",
];

fn corpus() -> impl Iterator<Item = &'static str> {
    VALID.iter().chain(BROKEN).copied()
}

#[test]
fn valid_corpus_has_no_problems() {
    for source in VALID {
        let outcome = validate_query(source);
        assert!(
            outcome.is_success(),
            "`{source}`: {:?}",
            problem_keys(&outcome)
        );
    }
}

#[test]
fn broken_corpus_always_yields_a_tree() {
    for source in BROKEN {
        let outcome = validate_query(source);
        assert!(!outcome.is_success(), "`{source}` should report problems");
        assert_eq!(outcome.tree.span(outcome.tree.root()), 0..source.len());
    }
}

#[test]
fn problem_spans_stay_inside_the_text() {
    for source in corpus() {
        let outcome = validate_query(source);
        for problem in &outcome.problems {
            assert!(
                problem.start <= problem.end && problem.end <= source.len(),
                "`{source}`: {problem} at {:?}",
                problem.span()
            );
        }
    }
}

#[test]
fn node_spans_nest_inside_their_parent() {
    for source in VALID {
        let tree = parse(source, QL_STATEMENT).unwrap().tree;
        for (id, node) in tree.nodes() {
            assert!(node.span.end <= source.len(), "`{source}`: {id}");
            if let Some(parent) = node.parent {
                let outer = tree.span(parent);
                assert!(
                    outer.start <= node.span.start && node.span.end <= outer.end,
                    "`{source}`: {id} {:?} escapes {parent} {outer:?}",
                    node.span
                );
            }
        }
    }
}

#[test]
fn validation_is_repeatable() {
    let metamodel = model();
    for source in corpus() {
        let tree = parse(source, QL_STATEMENT).unwrap().tree;
        let first = SemanticValidator::new(&tree, JpqlQueryContext::new(&tree, &metamodel)).validate();
        let second = SemanticValidator::new(&tree, JpqlQueryContext::new(&tree, &metamodel)).validate();
        assert_eq!(first, second, "`{source}`");
    }
}

#[test]
fn clauses_rebuild_the_source_modulo_whitespace() {
    let spaced = [
        "SELECT  e   FROM Employee e",
        "SELECT e\nFROM Employee e\n\tWHERE e.name = 'a  b'",
        "UPDATE Employee e\n  SET e.name = 'x'\n  WHERE e.salary > 1",
    ];
    for source in spaced.into_iter().chain(VALID.iter().copied()) {
        let tree = parse(source, QL_STATEMENT).unwrap().tree;
        let NodeKind::JpqlExpression {
            statement: Some(statement),
            unknown: None,
        } = tree.kind(tree.root())
        else {
            panic!("`{source}` has no complete statement");
        };

        let clauses = tree.children(*statement);
        for pair in clauses.windows(2) {
            assert!(
                tree.span(pair[0]).end <= tree.span(pair[1]).start,
                "`{source}`: clauses out of order"
            );
        }
        let rebuilt = clauses
            .iter()
            .map(|clause| tree.to_parsed_text(*clause))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rebuilt, normalize_whitespace(source), "`{source}`");
    }
}

#[test]
fn duplicated_variables_are_reported_at_both_declarations() {
    let queries = [
        "SELECT e FROM Employee e, Project e",
        "SELECT e FROM Employee e JOIN e.reports E",
        "SELECT e FROM Employee e, IN(e.projects) e",
        "SELECT e FROM Employee e WHERE EXISTS (SELECT p FROM Project p, Department p)",
    ];
    for source in queries {
        let outcome = validate_query(source);
        let duplicates = outcome
            .problems
            .iter()
            .filter(|problem| problem.key == ProblemKey::IdentificationVariableDuplicate)
            .count();
        assert_eq!(duplicates, 2, "`{source}`: {:?}", problem_keys(&outcome));
    }
}

#[test]
fn declared_variables_are_never_undeclared() {
    for source in VALID {
        let outcome = validate_query(source);
        assert!(
            !outcome
                .problems
                .iter()
                .any(|problem| problem.key == ProblemKey::IdentificationVariableNotDeclared),
            "`{source}`"
        );
    }
}
