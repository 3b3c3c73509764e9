//! Knowledge-base export.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::NaiveDateTime;

/// Renders the knowledge base as one Markdown document: a title, the
/// generation timestamp, then one `##` section per issue type separated by
/// horizontal rules.
#[must_use]
pub fn knowledge_base_markdown(
    knowledge_base: &BTreeMap<String, String>,
    generated_at: NaiveDateTime,
) -> String {
    let mut out = String::from("# Knowledge Base\n\n");
    out.push_str(&format!(
        "Generated on: {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    for (issue_type, summary) in knowledge_base {
        out.push_str(&format!("## {issue_type}\n\n{}\n\n---\n\n", summary.trim()));
    }
    out
}

/// Writes the knowledge base as CSV rows of
/// `Issue Type, Summary, Date Generated`.
///
/// # Errors
///
/// Returns [`csv::Error`] if writing to `writer` fails.
pub fn write_knowledge_base_csv<W: Write>(
    knowledge_base: &BTreeMap<String, String>,
    generated_at: NaiveDateTime,
    writer: W,
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["Issue Type", "Summary", "Date Generated"])?;
    let date = generated_at.format("%Y-%m-%d").to_string();
    for (issue_type, summary) in knowledge_base {
        csv_writer.write_record([issue_type.as_str(), summary.as_str(), date.as_str()])?;
    }
    csv_writer.flush()?;
    Ok(())
}
