// output formatting for `ask` and `check` - pretty tables or raw json

use crate::core::{Answer, QueryResult, Verdict};

// cells longer than this get cut
const MAX_WIDTH: usize = 40;

pub struct Output;

impl Output {
    // nice table format for humans
    pub fn pretty(answer: &Answer) {
        println!("sql: {}\n", answer.generated_sql);
        print!("{}", render_table(&answer.result));
    }

    // raw json for scripts
    pub fn raw(answer: &Answer) -> Result<(), crate::Error> {
        let json = serde_json::json!({
            "generated_sql": answer.generated_sql,
            "results": answer.result.rows,
        });
        println!("{}", serde_json::to_string(&json)?);
        Ok(())
    }

    pub fn verdict(verdict: &Verdict) {
        match verdict {
            Verdict::Allowed(sql) => println!("allowed: {sql}"),
            Verdict::Denied { statement, reason } => {
                println!("denied ({reason}): {}", reason.description());
                println!("statement: {statement}");
            }
        }
    }
}

fn render_table(result: &QueryResult) -> String {
    let mut out = format!("rows: {}\n\n", result.row_count);

    if result.rows.is_empty() {
        out.push_str("no results\n");
        return out;
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(format_value(v))).collect())
        .collect();

    // figure out column widths
    let mut widths: Vec<usize> = result
        .columns
        .iter()
        .map(|c| c.chars().count().min(MAX_WIDTH))
        .collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |values: Vec<String>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(v, &w)| format!("{v:w$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    out.push_str(&line(result.columns.clone()));
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&sep.join("-+-"));
    out.push('\n');

    for row in cells {
        out.push_str(&line(row));
        out.push('\n');
    }

    out
}

fn truncate(s: String) -> String {
    if s.chars().count() > MAX_WIDTH {
        let head: String = s.chars().take(MAX_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        s
    }
}

fn format_value(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
