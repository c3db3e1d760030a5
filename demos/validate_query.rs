//! Query validation demonstration
//!
//! Validates a handful of JPQL statements against a small metamodel and
//! renders every problem through miette.
//!
//! ```bash
//! cargo run --example validate_query
//! cargo run --example validate_query -- "SELECT e FROM Employee e WHERE e.boss = 1"
//! ```

use jpql_parser::grammar::rules::QL_STATEMENT;
use jpql_parser::semantic::{InMemoryMetamodel, ManagedType, MappingKind};
use jpql_parser::validate;

fn metamodel() -> InMemoryMetamodel {
    InMemoryMetamodel::new()
        .with_managed_type(
            ManagedType::entity("Employee", "com.acme.Employee")
                .with_mapping("id", MappingKind::Id, "long")
                .with_basic("name", "java.lang.String")
                .with_basic("salary", "long")
                .with_basic("status", "com.acme.Status")
                .with_mapping("manager", MappingKind::ManyToOne, "com.acme.Employee")
                .with_mapping("projects", MappingKind::ManyToMany, "com.acme.Project"),
        )
        .with_managed_type(
            ManagedType::entity("Project", "com.acme.Project")
                .with_mapping("id", MappingKind::Id, "long")
                .with_basic("name", "java.lang.String"),
        )
        .with_enum("com.acme.Status", ["ACTIVE", "RETIRED"])
}

fn main() {
    println!("=== JPQL Validation Demo ===\n");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let queries: Vec<String> = if args.is_empty() {
        [
            "SELECT e FROM Employee e WHERE e.salary > 1000",
            "SELECT e FROM Employee e WHERE e.manager > 1000",
            "SELECT e FROM Employee e JOIN r.projects p JOIN e.projects r",
            "SELECT e FROM Employee e WHERE e.status = com.acme.Status.FIRED",
            "UPDATE Employee SET salary = salary * 2 WHERE name = 'x'",
            "SELECT e FROM Employee e WHERE e.salary >",
        ]
        .iter()
        .map(|query| query.to_string())
        .collect()
    } else {
        args
    };

    let model = metamodel();
    for query in &queries {
        println!("--- {query}");
        let outcome = match validate(query, QL_STATEMENT, &model) {
            Ok(outcome) => outcome,
            Err(err) => {
                eprintln!("grammar error: {err}");
                std::process::exit(1);
            }
        };

        if outcome.is_success() {
            println!("✓ Query is valid\n");
            continue;
        }

        println!(
            "✗ {} syntax and {} semantic problem(s)",
            outcome.syntax_problems().count(),
            outcome.semantic_problems().count()
        );
        for report in outcome.to_reports() {
            println!("{report:?}");
        }
    }
}
