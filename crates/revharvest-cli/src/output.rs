//! Writing command results to a file or stdout.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

/// Pretty-prints `value` as JSON to `out`, or to stdout when `out` is `None`.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    value: &T,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
            tracing::info!(path = %path.display(), "wrote output");
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, value)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_pretty_json_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_json(&serde_json::json!({ "total_reviews": 2 }), Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "{\n  \"total_reviews\": 2\n}\n");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = write_json(&1, Some(Path::new("/no/such/dir/out.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to create"));
    }
}
