//! Per-table documentation: structured assembly and markdown rendering.
//!
//! [`generate_doc`] assembles a [`TableDoc`] from keys, constraints,
//! relationships and the quality assessment. [`render_markdown`] is a
//! pure function of that document with a fixed section order:
//!
//! 1. title, description, grain
//! 2. primary / foreign keys
//! 3. unique constraints, indexes
//! 4. common joins
//! 5. data quality, warnings
//! 6. usage recommendations
//!
//! Sections with no content are omitted entirely.

use serde::{Deserialize, Serialize};

use crate::models::RelationshipRecord;
use crate::quality::QualityAssessment;
use crate::schema::UniqueGroup;

/// Maximum number of index names and joins kept in a document.
pub const MAX_DOC_ITEMS: usize = 8;

/// Guidance attached to every table.
pub const USAGE_RECOMMENDATIONS: &[&str] = &[
    "Use primary keys for stable joins.",
    "Validate null-heavy columns before relying on them in reporting.",
    "Use date filters when querying large tables.",
];

/// A relationship touching a table, as dotted `schema.table.column` paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRef {
    pub from: String,
    pub to: String,
    pub constraint_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocConstraints {
    pub unique: Vec<UniqueGroup>,
    pub indexes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDoc {
    pub table: String,
    pub what_it_represents: String,
    pub grain: String,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub constraints: DocConstraints,
    pub common_joins: Vec<JoinRef>,
    pub quality_score: Option<u8>,
    pub warnings: Vec<String>,
    pub usage_recommendations: Vec<String>,
}

/// Inputs for [`generate_doc`].
#[derive(Debug, Clone, Default)]
pub struct DocInput<'a> {
    pub schema_name: &'a str,
    pub table_name: &'a str,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<String>,
    pub joins: Vec<JoinRef>,
    pub unique: Vec<UniqueGroup>,
    pub indexes: Vec<String>,
    pub quality: Option<&'a QualityAssessment>,
}

/// Relationships with either end on `schema.table`, in stored order.
pub fn joins_for_table(relationships: &[RelationshipRecord], schema: &str, table: &str) -> Vec<JoinRef> {
    relationships
        .iter()
        .filter(|r| r.touches(schema, table))
        .map(|r| JoinRef {
            from: format!("{}.{}.{}", r.from_schema, r.from_table, r.from_column),
            to: format!("{}.{}.{}", r.to_schema, r.to_table, r.to_column),
            constraint_name: r.constraint_name.clone(),
        })
        .collect()
}

pub fn generate_doc(input: DocInput<'_>) -> TableDoc {
    let mut indexes = input.indexes;
    indexes.truncate(MAX_DOC_ITEMS);
    let mut joins = input.joins;
    joins.truncate(MAX_DOC_ITEMS);

    TableDoc {
        table: format!("{}.{}", input.schema_name, input.table_name),
        what_it_represents: format!(
            "Table `{}` in schema `{}`.",
            input.table_name, input.schema_name
        ),
        grain: "One row represents one record in this table.".to_string(),
        primary_keys: input.primary_keys,
        foreign_keys: input.foreign_keys,
        constraints: DocConstraints {
            unique: input.unique,
            indexes,
        },
        common_joins: joins,
        quality_score: input.quality.map(|q| q.score),
        warnings: input.quality.map(|q| q.reasons.clone()).unwrap_or_default(),
        usage_recommendations: USAGE_RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn render_markdown(doc: &TableDoc) -> String {
    let mut lines: Vec<String> = vec![
        format!("# {}", doc.table),
        String::new(),
        format!("**What it represents:** {}", doc.what_it_represents),
        String::new(),
        format!("**Grain:** {}", doc.grain),
        String::new(),
    ];

    if !doc.primary_keys.is_empty() {
        lines.push(format!("**Primary key(s):** {}", doc.primary_keys.join(", ")));
        lines.push(String::new());
    }
    if !doc.foreign_keys.is_empty() {
        lines.push(format!("**Foreign key column(s):** {}", doc.foreign_keys.join(", ")));
        lines.push(String::new());
    }

    if !doc.constraints.unique.is_empty() {
        lines.push("## Unique constraints".to_string());
        for u in &doc.constraints.unique {
            let name = u.name.as_deref().unwrap_or("unnamed");
            lines.push(format!("- {}: {}", name, u.columns.join(", ")));
        }
        lines.push(String::new());
    }

    if !doc.constraints.indexes.is_empty() {
        lines.push("## Indexes".to_string());
        for name in doc.constraints.indexes.iter().take(MAX_DOC_ITEMS) {
            lines.push(format!("- {}", name));
        }
        lines.push(String::new());
    }

    if !doc.common_joins.is_empty() {
        lines.push("## Common joins".to_string());
        for j in &doc.common_joins {
            let via = j.constraint_name.as_deref().unwrap_or("FK");
            lines.push(format!("- {} → {} ({})", j.from, j.to, via));
        }
        lines.push(String::new());
    }

    if let Some(score) = doc.quality_score {
        lines.push("## Data quality".to_string());
        lines.push(format!("**Quality score:** {}", score));
        lines.push(String::new());
    }

    if !doc.warnings.is_empty() {
        lines.push("**Warnings:**".to_string());
        for w in &doc.warnings {
            lines.push(format!("- {}", w));
        }
        lines.push(String::new());
    }

    if !doc.usage_recommendations.is_empty() {
        lines.push("## Usage recommendations".to_string());
        for r in &doc.usage_recommendations {
            lines.push(format!("- {}", r));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
