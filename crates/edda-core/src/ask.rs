//! Deterministic question matcher over a scan run's persisted artifacts.
//!
//! Rules are tried in order; the first that matches answers:
//!
//! 1. join keywords and at least one relationship → a join path
//! 2. a table name with a generated document → the document prefix
//! 3. column names → the matching column names
//! 4. a static help message
//!
//! Matching is plain substring containment on the lowercased question.

use serde::Serialize;

use crate::error::{ScanError, ScanResult};
use crate::models::{RelationshipRecord, TableRecord};
use crate::store::Store;

const JOIN_KEYWORDS: &[&str] = &["join", "relationship", "connect"];

/// Maximum characters of a document returned by the docs rule.
pub const DOC_ANSWER_CHARS: usize = 1200;

/// Maximum referenced column names returned by the schema rule.
pub const MAX_COLUMN_REFERENCES: usize = 10;

pub const HELP_MESSAGE: &str =
    "Try: 'What does orders represent?' or 'How do I join orders to payments?'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub answer: String,
    pub referenced_objects: Vec<String>,
    pub sql_suggestion: Option<String>,
    pub sources: Vec<String>,
}

pub async fn answer_question(
    store: &dyn Store,
    scan_run_id: i64,
    question: &str,
    include_sql: bool,
) -> ScanResult<Answer> {
    if store.get_scan_run(scan_run_id).await?.is_none() {
        return Err(ScanError::not_found("scan run", scan_run_id));
    }
    let q = question.to_lowercase();
    let tables = store.list_tables(scan_run_id).await?;
    let mentioned: Vec<&TableRecord> = tables
        .iter()
        .filter(|t| q.contains(&t.table_name.to_lowercase()))
        .collect();

    if JOIN_KEYWORDS.iter().any(|k| q.contains(k)) {
        let relationships = store.list_relationships(scan_run_id).await?;
        if let Some(rel) = pick_relationship(&relationships, &mentioned) {
            return Ok(join_answer(rel, include_sql));
        }
    }

    for table in &mentioned {
        if let Some(doc) = store.get_table_doc(table.id).await? {
            return Ok(Answer {
                answer: doc.markdown.chars().take(DOC_ANSWER_CHARS).collect(),
                referenced_objects: vec![table.qualified_name()],
                sql_suggestion: None,
                sources: vec!["docs".to_string()],
            });
        }
    }

    let mut matched: Vec<String> = store
        .list_run_columns(scan_run_id)
        .await?
        .into_iter()
        .filter(|c| q.contains(&c.column_name.to_lowercase()))
        .map(|c| c.column_name)
        .collect();
    matched.sort();
    matched.dedup();
    if !matched.is_empty() {
        return Ok(Answer {
            answer: format!("Matching columns: {}", matched.join(", ")),
            referenced_objects: matched.into_iter().take(MAX_COLUMN_REFERENCES).collect(),
            sql_suggestion: None,
            sources: vec!["schema".to_string()],
        });
    }

    Ok(Answer {
        answer: HELP_MESSAGE.to_string(),
        referenced_objects: Vec::new(),
        sql_suggestion: None,
        sources: Vec::new(),
    })
}

/// The relationship between the first two mentioned tables (either
/// direction), else the run's first relationship.
fn pick_relationship<'r>(
    relationships: &'r [RelationshipRecord],
    mentioned: &[&TableRecord],
) -> Option<&'r RelationshipRecord> {
    if let [a, b, ..] = mentioned {
        let (a, b) = (a.table_name.as_str(), b.table_name.as_str());
        let direct = relationships.iter().find(|r| {
            (r.from_table == a && r.to_table == b) || (r.from_table == b && r.to_table == a)
        });
        if direct.is_some() {
            return direct;
        }
    }
    relationships.first()
}

fn join_answer(rel: &RelationshipRecord, include_sql: bool) -> Answer {
    let left = format!("{}.{}", rel.from_table, rel.from_column);
    let right = format!("{}.{}", rel.to_table, rel.to_column);
    let sql = include_sql.then(|| {
        format!(
            "SELECT * FROM {} a JOIN {} b ON a.{}=b.{} LIMIT 100;",
            rel.from_table, rel.to_table, rel.from_column, rel.to_column
        )
    });
    Answer {
        answer: format!("A common join is {} → {}.", left, right),
        referenced_objects: vec![left, right],
        sql_suggestion: sql,
        sources: vec!["relationships".to_string()],
    }
}
