//! `edda ask`: answer a question from a run's persisted artifacts.

use anyhow::Result;

use edda_core::ask::{answer_question, Answer};
use edda_core::store::Store;

pub async fn run_ask(
    store: &dyn Store,
    scan_run_id: i64,
    question: &str,
    include_sql: bool,
    json: bool,
) -> Result<()> {
    let answer = answer_question(store, scan_run_id, question, include_sql).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print!("{}", render_answer(&answer));
    }
    Ok(())
}

fn render_answer(answer: &Answer) -> String {
    let mut out = format!("{}\n", answer.answer);
    if !answer.referenced_objects.is_empty() {
        out.push_str(&format!(
            "\nReferenced: {}\n",
            answer.referenced_objects.join(", ")
        ));
    }
    if let Some(sql) = &answer.sql_suggestion {
        out.push_str(&format!("\nSQL:\n  {}\n", sql));
    }
    if !answer.sources.is_empty() {
        out.push_str(&format!("Sources: {}\n", answer.sources.join(", ")));
    }
    out
}
