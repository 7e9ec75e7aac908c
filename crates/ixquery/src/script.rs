// crates/ixquery/src/script.rs

//! Batch execution: one query per script line.
//!
//! ```text
//! # comment
//! -q 'title:hello' -o hello.txt
//! --query "tag:b"
//! ```

use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use crate::mode::SIGIL;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One executable script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub query: String,
    pub output: Option<PathBuf>,
}

/// Split on whitespace, honouring single and double quotes. Quoted and bare
/// runs next to each other join into one token; `''` is an empty token.
pub fn split_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unbalanced quote {q}"));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

/// Parse line `lineno` of `path`. Blank and `#` lines yield `None`.
pub fn parse_line(path: &Path, lineno: usize, line: &str) -> Result<Option<ScriptLine>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let at = |msg: String| Error::config(format!("{}:{lineno}: {msg}", path.display()));

    let tokens = split_line(trimmed).map_err(at)?;
    let mut query = None;
    let mut output = None;

    let mut iter = tokens.into_iter();
    while let Some(token) = iter.next() {
        let slot = match token.as_str() {
            "-q" | "-query" | "--query" => &mut query,
            "-o" | "-output" | "--output" => &mut output,
            other => return Err(at(format!("unexpected token: {other}"))),
        };
        let Some(value) = iter.next() else {
            return Err(at(format!("{token} requires a value")));
        };
        *slot = Some(value);
    }

    let Some(query) = query else {
        return Err(at("script line requires -q".to_string()));
    };
    if query.starts_with(SIGIL) {
        return Err(at(format!("query mode not allowed in scripts: {query}")));
    }

    Ok(Some(ScriptLine {
        query,
        output: output.map(PathBuf::from),
    }))
}

/// Run every line of the script at `path` through `exec`. Lines without an
/// output override write to `out`. The first failing line stops the run.
#[tracing::instrument(skip(exec, out))]
pub fn run_script(exec: &mut QueryExecutor<'_>, path: &Path, out: &mut dyn Write) -> Result<()> {
    let file = File::open(path)?;
    let mut executed = 0usize;

    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let Some(request) = parse_line(path, i + 1, &line)? else {
            continue;
        };
        debug!(line = i + 1, query = %request.query, "script line");

        match &request.output {
            Some(target) => {
                let mut sink = BufWriter::new(File::create(target)?);
                exec.run_query(Some(request.query.as_str()), &mut sink)?;
                sink.flush()?;
            }
            None => {
                exec.run_query(Some(request.query.as_str()), out)?;
            }
        }
        executed += 1;
    }

    info!(executed, "script finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{sample_set, settings};
    use crate::settings::FormatKind;
    use std::fs;
    use tempfile::TempDir;

    fn parse(line: &str) -> Result<Option<ScriptLine>> {
        parse_line(Path::new("batch.txt"), 7, line)
    }

    #[test]
    fn split_honours_quotes() {
        assert_eq!(
            split_line(r#"-q "title:hello world" -o 'out file.txt'"#).unwrap(),
            ["-q", "title:hello world", "-o", "out file.txt"]
        );
        assert_eq!(split_line(r#"a"b c"d '' x"#).unwrap(), ["ab cd", "", "x"]);
        assert_eq!(split_line(r#"'say "hi"'"#).unwrap(), [r#"say "hi""#]);
        assert!(split_line("   ").unwrap().is_empty());
        assert!(split_line("-q 'open").is_err());
    }

    #[test]
    fn parse_accepts_every_flag_spelling() {
        for (q, o) in [("-q", "-o"), ("-query", "-output"), ("--query", "--output")] {
            let line = parse(&format!("{o} x.txt {q} tag:a")).unwrap().unwrap();
            assert_eq!(line.query, "tag:a");
            assert_eq!(line.output, Some(PathBuf::from("x.txt")));
        }
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("   \t").unwrap(), None);
        assert_eq!(parse("  # -q tag:a").unwrap(), None);
    }

    #[test]
    fn malformed_lines_name_file_and_line() {
        for line in ["-q tag:a --fields x", "-o out.txt", "-q", "-q %all", "-q 'tag:a"] {
            let err = parse(line).unwrap_err();
            assert!(err.is_config(), "{line}: {err:?}");
            assert!(err.to_string().contains("batch.txt:7:"), "{line}: {err}");
        }
        let err = parse("-o out.txt").unwrap_err();
        assert!(err.to_string().contains("script line requires -q"));
    }

    #[test]
    fn lines_run_independently_with_per_line_sinks() {
        let dir = TempDir::new().unwrap();
        let redirected = dir.path().join("a.tsv");
        let script = dir.path().join("batch.txt");
        fs::write(
            &script,
            format!(
                "# batch\n-q tag:a -o '{}'\n\n-q tag:b\n",
                redirected.display()
            ),
        )
        .unwrap();

        let set = sample_set();
        let mut s = settings(&["tag"]);
        s.format = FormatKind::Tabular;
        let mut exec = QueryExecutor::new(&set, s).unwrap();

        let mut out = Vec::new();
        run_script(&mut exec, &script, &mut out).unwrap();

        // each line starts its own printed count, so each prints a header
        assert_eq!(fs::read_to_string(&redirected).unwrap(), "tag\na|b\n");
        assert_eq!(String::from_utf8(out).unwrap(), "tag\na|b\nb\n");
    }

    #[test]
    fn bad_line_stops_the_run() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("batch.txt");
        fs::write(&script, "-q tag:a\n-q %ids 0\n-q tag:b\n").unwrap();

        let set = sample_set();
        let mut exec = QueryExecutor::new(&set, settings(&["tag"])).unwrap();
        let mut out = Vec::new();
        let err = run_script(&mut exec, &script, &mut out).unwrap_err();
        assert!(err.to_string().contains("batch.txt:2:"), "{err}");
        assert_eq!(String::from_utf8(out).unwrap(), "tag: a\ntag: b\n");
    }

    #[test]
    fn failing_redirected_query_stops_the_run_and_leaves_its_sink_empty() {
        let dir = TempDir::new().unwrap();
        let redirected = dir.path().join("b.txt");
        let script = dir.path().join("batch.txt");
        fs::write(
            &script,
            format!(
                "-q tag:a\n-q nofield:x -o '{}'\n-q tag:b\n",
                redirected.display()
            ),
        )
        .unwrap();

        let set = sample_set();
        let mut exec = QueryExecutor::new(&set, settings(&["tag"])).unwrap();
        let mut out = Vec::new();
        let err = run_script(&mut exec, &script, &mut out).unwrap_err();
        assert!(err.is_config(), "{err:?}");

        // the sink was created and closed without output; line 3 never ran
        assert_eq!(fs::read_to_string(&redirected).unwrap(), "");
        assert_eq!(String::from_utf8(out).unwrap(), "tag: a\ntag: b\n");
    }
}
