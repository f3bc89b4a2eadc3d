//! Identifier quoting conversion between SQL dialects
//!
//! PostgreSQL quotes identifiers with `"`, MySQL with `` ` ``. Conversion
//! swaps one for the other outside single-quoted string literals and leaves
//! everything else as is.

use crate::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgresql,
    Mysql,
}

impl Dialect {
    fn identifier_quote(&self) -> char {
        match self {
            Dialect::Postgresql => '"',
            Dialect::Mysql => '`',
        }
    }
}

impl FromStr for Dialect {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => Ok(Dialect::Postgresql),
            "mysql" => Ok(Dialect::Mysql),
            other => Err(AdvisorError::InvalidInput(format!("unknown dialect: {}", other))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgresql => write!(f, "postgresql"),
            Dialect::Mysql => write!(f, "mysql"),
        }
    }
}

/// Convert `sql` written in `from` into `to`.
///
/// Blank input yields an empty string.
pub fn convert(sql: &str, from: Dialect, to: Dialect) -> String {
    if sql.trim().is_empty() {
        return String::new();
    }
    if from == to {
        return sql.to_string();
    }
    swap_identifier_quotes(sql, from.identifier_quote(), to.identifier_quote())
}

fn swap_identifier_quotes(sql: &str, from: char, to: char) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        if ch == '\'' {
            in_single_quote = !in_single_quote;
            result.push(ch);
        } else if ch == from && !in_single_quote {
            result.push(to);
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_to_mysql() {
        let sql = r#"SELECT "host", 'say "hi"' FROM "monitor""#;
        assert_eq!(
            convert(sql, Dialect::Postgresql, Dialect::Mysql),
            r#"SELECT `host`, 'say "hi"' FROM `monitor`"#
        );
    }

    #[test]
    fn test_mysql_to_postgres() {
        let sql = "SELECT `a` FROM `t` WHERE b = 'x`y'";
        assert_eq!(
            convert(sql, Dialect::Mysql, Dialect::Postgresql),
            "SELECT \"a\" FROM \"t\" WHERE b = 'x`y'"
        );
    }

    #[test]
    fn test_escaped_quote_toggles_twice() {
        let sql = r#"SELECT 'it''s' AS "v""#;
        assert_eq!(
            convert(sql, Dialect::Postgresql, Dialect::Mysql),
            "SELECT 'it''s' AS `v`"
        );
    }

    #[test]
    fn test_same_dialect_and_blank_input() {
        assert_eq!(convert("  \n", Dialect::Mysql, Dialect::Postgresql), "");
        assert_eq!(convert("SELECT \"a\"", Dialect::Postgresql, Dialect::Postgresql), "SELECT \"a\"");
    }

    #[test]
    fn test_parse_dialect() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgresql);
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::Mysql);
        assert!("oracle".parse::<Dialect>().is_err());
    }
}
