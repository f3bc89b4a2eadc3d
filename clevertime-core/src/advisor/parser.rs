//! Local `CREATE TABLE` parsing
//!
//! GreptimeDB DDL is mostly standard SQL, with a few extensions sqlparser
//! does not know about: `TIME INDEX (col)`, column-level `TIME INDEX`, and
//! `FULLTEXT` / `INVERTED` / `SKIPPING` column indexes. Table options after
//! the column list (`ENGINE=`, `WITH(...)`, `PARTITION ON COLUMNS`) are
//! dropped. The extensions are rewritten into column comments carrying a
//! marker, which survive parsing and are read back from the AST.

use super::{Column, IndexKind, SemanticType};
use crate::{AdvisorError, Result};
use regex::{Captures, Regex};
use sqlparser::ast::{ColumnDef, ColumnOption, Statement as SqlStatement, TableConstraint};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::OnceLock;
use tracing::info;

const TIME_INDEX_MARKER: &str = "clevertime:time_index";
const INDEX_MARKER_PREFIX: &str = "clevertime:index:";

fn table_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i),\s*(TIME|INVERTED)\s+INDEX\s*\(([^)]*)\)").expect("valid regex")
    })
}

fn column_time_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bTIME\s+INDEX\b").expect("valid regex"))
}

fn column_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(FULLTEXT|INVERTED|SKIPPING)\b(?:\s+INDEX\b)?(?:\s+WITH\s*\([^)]*\))?")
            .expect("valid regex")
    })
}

/// Table-level index declarations pulled out of the column list
#[derive(Debug, Default)]
struct TableIndexes {
    time_index: Option<String>,
    inverted: HashSet<String>,
}

/// Parse a `CREATE TABLE` statement into advisor columns
pub fn parse_create_table(sql: &str) -> Result<Vec<Column>> {
    let (head, body) = split_table_body(sql)?;
    let (body, indexes) = extract_table_indexes(body);
    let body = rewrite_unquoted(column_time_index_re(), &body, |body, start, _| {
        (!starts_column(body, start)).then(|| format!(" COMMENT '{}'", TIME_INDEX_MARKER))
    });
    let body = rewrite_unquoted(column_index_re(), &body, |body, start, caps| {
        (!starts_column(body, start))
            .then(|| format!(" COMMENT '{}{}'", INDEX_MARKER_PREFIX, caps[1].to_lowercase()))
    });
    let rewritten = format!("{}{})", head, body);

    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, &rewritten)
        .map_err(|e| AdvisorError::SqlParse(e.to_string()))?;

    let statement = statements
        .into_iter()
        .next()
        .ok_or_else(|| AdvisorError::SqlParse("Empty statement".into()))?;

    match statement {
        SqlStatement::CreateTable {
            name,
            columns,
            constraints,
            ..
        } => {
            let mut primary_keys: HashSet<String> = HashSet::new();
            for constraint in &constraints {
                if let TableConstraint::Unique {
                    columns,
                    is_primary: true,
                    ..
                } = constraint
                {
                    primary_keys.extend(columns.iter().map(|c| c.value.clone()));
                }
            }

            let parsed: Vec<Column> = columns
                .iter()
                .map(|def| to_column(def, &primary_keys, &indexes))
                .collect();

            info!("Parsed table {} with {} columns", name, parsed.len());
            Ok(parsed)
        }
        _ => Err(AdvisorError::SqlParse(
            "Only CREATE TABLE statements are supported".into(),
        )),
    }
}

fn to_column(def: &ColumnDef, primary_keys: &HashSet<String>, indexes: &TableIndexes) -> Column {
    let name = def.name.value.clone();

    let mut is_primary = primary_keys.contains(&name);
    let mut is_time = indexes.time_index.as_deref() == Some(name.as_str());
    let mut not_null = false;
    let mut marked: Option<IndexKind> = None;

    for option in &def.options {
        match &option.option {
            ColumnOption::Unique {
                is_primary: true, ..
            } => is_primary = true,
            ColumnOption::NotNull => not_null = true,
            ColumnOption::Comment(comment) if comment == TIME_INDEX_MARKER => is_time = true,
            ColumnOption::Comment(comment) => {
                if let Some(kind) = comment.strip_prefix(INDEX_MARKER_PREFIX) {
                    marked = match kind {
                        "fulltext" => Some(IndexKind::Fulltext),
                        "inverted" => Some(IndexKind::Inverted),
                        "skipping" => Some(IndexKind::Skipping),
                        _ => marked,
                    };
                }
            }
            _ => {}
        }
    }
    if marked.is_none() && indexes.inverted.contains(&name) {
        marked = Some(IndexKind::Inverted);
    }

    let (semantic_type, index) = if is_time {
        (SemanticType::Timestamp, Some(IndexKind::Time))
    } else if is_primary {
        (SemanticType::Tag, Some(IndexKind::Primary))
    } else {
        (SemanticType::Field, marked)
    };

    Column {
        name,
        data_type: type_name(&def.data_type.to_string()),
        semantic_type,
        nullable: !is_time && !not_null,
        index,
        cardinality: None,
    }
}

/// `TIMESTAMP(3)` -> `timestamp`, `DOUBLE PRECISION` -> `double`
fn type_name(rendered: &str) -> String {
    rendered
        .split('(')
        .next()
        .and_then(|s| s.split_whitespace().next())
        .unwrap_or_default()
        .to_lowercase()
}

/// Split `CREATE TABLE t (...) rest` into `CREATE TABLE t (` and the column list
fn split_table_body(sql: &str) -> Result<(&str, &str)> {
    let open = find_unquoted(sql, '(')
        .ok_or_else(|| AdvisorError::SqlParse("Missing column list".into()))?;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, ch) in sql[open..].char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let close = open + i;
                        return Ok((&sql[..=open], &sql[open + 1..close]));
                    }
                }
                _ => {}
            },
        }
    }

    Err(AdvisorError::SqlParse("Unbalanced parentheses in column list".into()))
}

fn find_unquoted(sql: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in sql.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == target => return Some(i),
            None if matches!(ch, '\'' | '"' | '`') => quote = Some(ch),
            None => {}
        }
    }
    None
}

fn extract_table_indexes(body: &str) -> (String, TableIndexes) {
    let mut indexes = TableIndexes::default();

    let stripped = rewrite_unquoted(table_index_re(), body, |_, _, caps| {
        let names = caps[2]
            .split(',')
            .map(|c| c.trim().trim_matches(|ch| matches!(ch, '"' | '`')).to_string())
            .filter(|c| !c.is_empty());

        if caps[1].eq_ignore_ascii_case("time") {
            indexes.time_index = names.into_iter().next();
        } else {
            indexes.inverted.extend(names);
        }
        Some(String::new())
    });

    (stripped, indexes)
}

/// Byte ranges covered by quoted literals and identifiers
fn quoted_spans(sql: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut open: Option<(char, usize)> = None;
    for (i, ch) in sql.char_indices() {
        match open {
            Some((q, start)) if ch == q => {
                spans.push(start..i + 1);
                open = None;
            }
            Some(_) => {}
            None if matches!(ch, '\'' | '"' | '`') => open = Some((ch, i)),
            None => {}
        }
    }
    if let Some((_, start)) = open {
        spans.push(start..sql.len());
    }
    spans
}

/// Whether `pos` is where a column definition begins, i.e. the keyword is a column name
fn starts_column(body: &str, pos: usize) -> bool {
    let before = body[..pos].trim_end();
    before.is_empty() || before.ends_with(',')
}

/// Replace matches of `re` outside quotes. `replace` gets the whole input,
/// the match offset and the captures; `None` keeps the match as is.
fn rewrite_unquoted<F>(re: &Regex, body: &str, mut replace: F) -> String
where
    F: FnMut(&str, usize, &Captures<'_>) -> Option<String>,
{
    let quoted = quoted_spans(body);
    let mut out = String::with_capacity(body.len());
    let mut last = 0;

    for caps in re.captures_iter(body) {
        let Some(m) = caps.get(0) else { continue };
        if quoted.iter().any(|span| span.contains(&m.start())) {
            continue;
        }
        if let Some(replacement) = replace(body, m.start(), &caps) {
            out.push_str(&body[last..m.start()]);
            out.push_str(&replacement);
            last = m.end();
        }
    }

    out.push_str(&body[last..]);
    out
}
