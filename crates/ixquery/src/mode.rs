// crates/ixquery/src/mode.rs

use crate::enumerate;
use crate::error::{Error, Result};
use crate::executor::QueryExecutor;
use crate::lookup;
use crate::script;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Prefix that marks a directive as a mode instead of a query.
pub const SIGIL: char = '%';

/// What one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Query(String),
    MatchAll,
    EnumerateFields,
    CountFields,
    EnumerateTerms(String),
    Ids(Vec<String>),
    IdFile(PathBuf),
    Script(PathBuf),
}

impl Mode {
    /// Interpret directive tokens, e.g. `["%enumerate-terms", "title"]` or
    /// `["tag:a"]`.
    pub fn parse<S: AsRef<str>>(directive: &[S]) -> Result<Self> {
        let Some((head, rest)) = directive.split_first() else {
            return Err(Error::config("no query or mode given"));
        };
        let head = head.as_ref();
        let rest: Vec<String> = rest.iter().map(|s| s.as_ref().to_string()).collect();

        if !head.starts_with(SIGIL) {
            if !rest.is_empty() {
                return Err(Error::config(format!(
                    "a query must be a single argument, got extra: {}",
                    rest.join(" ")
                )));
            }
            return Ok(Mode::Query(head.to_string()));
        }

        let mode = match head {
            "%all" => {
                no_args(head, &rest)?;
                Mode::MatchAll
            }
            "%enumerate-fields" => {
                no_args(head, &rest)?;
                Mode::EnumerateFields
            }
            "%count-fields" => {
                no_args(head, &rest)?;
                Mode::CountFields
            }
            "%enumerate-terms" => Mode::EnumerateTerms(one_arg(head, rest, "field")?),
            "%ids" => {
                if rest.is_empty() {
                    return Err(Error::config("%ids requires at least one id"));
                }
                Mode::Ids(rest)
            }
            "%id-file" => Mode::IdFile(one_arg(head, rest, "file")?.into()),
            "%script" => Mode::Script(one_arg(head, rest, "file")?.into()),
            other => return Err(Error::config(format!("unknown query mode: {other}"))),
        };
        Ok(mode)
    }
}

fn no_args(mode: &str, rest: &[String]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::config(format!("{mode} takes no arguments")))
    }
}

fn one_arg(mode: &str, rest: Vec<String>, what: &str) -> Result<String> {
    match <[String; 1]>::try_from(rest) {
        Ok([arg]) => Ok(arg),
        Err(_) => Err(Error::config(format!("{mode} requires exactly one {what}"))),
    }
}

/// Execute `mode`, writing to `out`.
#[tracing::instrument(skip(exec, out))]
pub fn dispatch(exec: &mut QueryExecutor<'_>, mode: &Mode, out: &mut dyn Write) -> Result<()> {
    match mode {
        Mode::Query(text) => {
            exec.run_query(Some(text.as_str()), out)?;
        }
        Mode::MatchAll => {
            exec.run_query(None, out)?;
        }
        Mode::EnumerateFields => enumerate::enumerate_fields(exec.index(), out)?,
        Mode::CountFields => enumerate::count_fields(exec.index(), out)?,
        Mode::EnumerateTerms(field) => enumerate::enumerate_terms(exec.index(), field, out)?,
        Mode::Ids(ids) => {
            lookup::dump_ids(exec, ids, out)?;
        }
        Mode::IdFile(path) => {
            lookup::dump_id_file(exec, path, out)?;
        }
        Mode::Script(path) => script::run_script(exec, path, out)?,
    }
    Ok(())
}

/// Parse and execute one directive.
pub fn run<S: AsRef<str>>(
    exec: &mut QueryExecutor<'_>,
    directive: &[S],
    out: &mut dyn Write,
) -> Result<()> {
    let mode = Mode::parse(directive)?;
    debug!(?mode, "dispatching");
    dispatch(exec, &mode, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::{sample_set, settings};

    #[test]
    fn plain_tokens_are_queries() {
        assert_eq!(Mode::parse(&["tag:a"]).unwrap(), Mode::Query("tag:a".into()));
        assert_eq!(
            Mode::parse(&["title:\"hello world\""]).unwrap(),
            Mode::Query("title:\"hello world\"".into())
        );
    }

    #[test]
    fn sigil_modes_parse_with_arguments() {
        assert_eq!(Mode::parse(&["%all"]).unwrap(), Mode::MatchAll);
        assert_eq!(Mode::parse(&["%enumerate-fields"]).unwrap(), Mode::EnumerateFields);
        assert_eq!(Mode::parse(&["%count-fields"]).unwrap(), Mode::CountFields);
        assert_eq!(
            Mode::parse(&["%enumerate-terms", "tag"]).unwrap(),
            Mode::EnumerateTerms("tag".into())
        );
        assert_eq!(
            Mode::parse(&["%ids", "1 2", "3"]).unwrap(),
            Mode::Ids(vec!["1 2".into(), "3".into()])
        );
        assert_eq!(Mode::parse(&["%id-file", "ids.txt"]).unwrap(), Mode::IdFile("ids.txt".into()));
        assert_eq!(Mode::parse(&["%script", "s.txt"]).unwrap(), Mode::Script("s.txt".into()));
    }

    #[test]
    fn malformed_directives_are_config_errors() {
        let bad: &[&[&str]] = &[
            &[],
            &["tag:a", "tag:b"],
            &["%all", "x"],
            &["%enumerate-terms"],
            &["%enumerate-terms", "a", "b"],
            &["%ids"],
            &["%id-file"],
            &["%script", "a", "b"],
            &["%bogus"],
        ];
        for directive in bad {
            let err = Mode::parse(directive).unwrap_err();
            assert!(err.is_config(), "{directive:?}: {err:?}");
        }
        let err = Mode::parse(&["%bogus"]).unwrap_err();
        assert!(err.to_string().contains("unknown query mode: %bogus"));
    }

    #[test]
    fn run_routes_to_each_operation() {
        let set = sample_set();
        let mut exec = QueryExecutor::new(&set, settings(&["title"])).unwrap();

        let mut out = Vec::new();
        run(&mut exec, &["%ids", "1"], &mut out).unwrap();
        run(&mut exec, &["%enumerate-terms", "tag"], &mut out).unwrap();
        run(&mut exec, &["tag:a"], &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "title: Second post\na (1)\nb (2)\ntitle: Hello World\n"
        );
    }
}
