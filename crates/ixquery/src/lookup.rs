// crates/ixquery/src/lookup.rs

//! Direct document dumps by global ordinal, bypassing the query path.
//!
//! Ids share the executor's projection and formatting but ignore the output
//! limit and the regex filter. The score column, if shown, is always `1.0`.

use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use tracing::info;

/// Score reported for documents fetched by id.
pub const LOOKUP_SCORE: f32 = 1.0;

/// Print the documents named by `ids`, in the order given.
pub fn dump_ids<S: AsRef<str>>(
    exec: &mut QueryExecutor<'_>,
    ids: &[S],
    out: &mut dyn Write,
) -> Result<usize> {
    dump_lines(exec, ids.iter().map(|id| Ok::<_, io::Error>(id.as_ref().to_string())), out)
}

/// Print the documents listed in `path`: whitespace separated ids, blank
/// lines ignored.
pub fn dump_id_file(exec: &mut QueryExecutor<'_>, path: &Path, out: &mut dyn Write) -> Result<usize> {
    let file = File::open(path)?;
    dump_lines(exec, BufReader::new(file).lines(), out)
}

/// Every id is parsed and resolved before anything is written, so a bad id
/// prints nothing.
fn dump_lines<I>(exec: &mut QueryExecutor<'_>, lines: I, out: &mut dyn Write) -> Result<usize>
where
    I: Iterator<Item = io::Result<String>>,
{
    exec.begin();

    let mut targets = Vec::new();
    for line in lines {
        let line = line?;
        for token in line.split_whitespace() {
            let ordinal: u64 = token
                .parse()
                .map_err(|_| Error::config(format!("invalid document id: {token}")))?;
            targets.push(exec.index().resolve(ordinal)?);
        }
    }

    for at in &targets {
        let doc = exec.index().fetch(at, exec.projector().selection())?;
        let projection = exec.projector().project(&doc, at.ordinal, LOOKUP_SCORE);
        exec.emit(&projection, out)?;
    }

    info!(printed = exec.printed(), "id lookup finished");
    Ok(exec.printed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{sample_set, settings};
    use crate::settings::FormatKind;
    use tempfile::NamedTempFile;

    fn dump(exec: &mut QueryExecutor<'_>, ids: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        dump_ids(exec, ids, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn ids_print_in_request_order_with_fixed_score() {
        let set = sample_set();
        let mut s = settings(&["title"]);
        s.show_id = true;
        s.show_score = true;
        let mut exec = QueryExecutor::new(&set, s).unwrap();
        let out = dump(&mut exec, &["2", "0"]).unwrap();
        assert_eq!(
            out,
            "<id>: 2\n<score>: 1.0\ntitle: Third post\n\n<id>: 0\n<score>: 1.0\ntitle: Hello World\n"
        );
    }

    #[test]
    fn ids_ignore_limit_and_regex() {
        let set = sample_set();
        let mut s = settings(&["title"]);
        s.output_limit = Some(1);
        s.regex = Some("title:/nothing/".into());
        s.format = FormatKind::Tabular;
        s.suppress_names = true;
        let mut exec = QueryExecutor::new(&set, s).unwrap();
        let out = dump(&mut exec, &["0", "1", "2"]).unwrap();
        assert_eq!(out, "Hello World\nSecond post\nThird post\n");
    }

    #[test]
    fn malformed_or_unknown_ids_are_config_errors() {
        let set = sample_set();
        let mut exec = QueryExecutor::new(&set, settings(&[])).unwrap();
        for bad in ["x", "-1", "1.5", "99"] {
            let err = dump(&mut exec, &[bad]).unwrap_err();
            assert!(err.is_config(), "{bad}: {err:?}");
        }
    }

    #[test]
    fn failure_prints_nothing() {
        let set = sample_set();
        let mut exec = QueryExecutor::new(&set, settings(&["title"])).unwrap();
        let mut out = Vec::new();
        assert!(dump_ids(&mut exec, &["0", "oops"], &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn id_file_skips_blank_lines_and_splits_on_whitespace() {
        let set = sample_set();
        let mut s = settings(&["tag"]);
        s.format = FormatKind::Json;
        let mut exec = QueryExecutor::new(&set, s).unwrap();

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "1").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  0   1 ").unwrap();
        file.flush().unwrap();

        let mut out = Vec::new();
        let printed = dump_id_file(&mut exec, file.path(), &mut out).unwrap();
        assert_eq!(printed, 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"tag\":\"b\"}\n{\"tag\":[\"a\",\"b\"]}\n{\"tag\":\"b\"}\n"
        );
    }

    #[test]
    fn missing_id_file_is_io_error() {
        let set = sample_set();
        let mut exec = QueryExecutor::new(&set, settings(&[])).unwrap();
        let err = dump_id_file(&mut exec, Path::new("/no/such/ids"), &mut Vec::new()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
