//! Advisory rules

use super::{Column, GlobalData, Suggestion};
use crate::config::{HIGH_CARDINALITY, SHARDING_THROUGHPUT};
use tracing::debug;

const SHARDING_DOC: &str =
    "https://docs.greptime.com/user-guide/administration/manage-data/table-sharding";
const APPEND_ONLY_DOC: &str = "https://docs.greptime.com/user-guide/administration/performance-tuning-tips/#using-append-only-table-if-possible";

/// Flag wide indexed columns and a wide inverted index overall.
///
/// Columns with unknown cardinality count as 1.
pub fn optimize_cardinality(columns: &[Column]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let mut inverted_cardinality: u64 = 1;

    for col in columns {
        if !col.index.map(|i| i.is_inverted()).unwrap_or(false) {
            continue;
        }
        let cardinality = col.cardinality.unwrap_or(1);
        inverted_cardinality = inverted_cardinality.saturating_mul(cardinality);

        if cardinality >= HIGH_CARDINALITY {
            debug!("High cardinality column {}: {}", col.name, cardinality);
            suggestions.push(Suggestion {
                title: format!("Consider removing index from `{}`", col.name),
                sql: None,
                explanation: format!(
                    "The cardinality of the `{}` column is greater than 1,000,000. \
                     Consider removing the index to improve performance.",
                    col.name
                ),
            });
        }
    }

    if inverted_cardinality >= HIGH_CARDINALITY {
        suggestions.push(Suggestion {
            title: "Consider removing some keys from primary key".to_string(),
            sql: None,
            explanation: format!(
                "The cardinality of the inverted index is {}, which is greater than 1,000,000. \
                 Consider removing some keys from the primary key to reduce the cardinality \
                 of the inverted index.",
                inverted_cardinality
            ),
        });
    }

    suggestions
}

/// Flag fulltext indexes on non-string columns
pub fn optimize_fulltext_index(columns: &[Column]) -> Vec<Suggestion> {
    columns
        .iter()
        .filter(|col| col.index == Some(super::IndexKind::Fulltext) && !col.is_string())
        .map(|col| Suggestion {
            title: format!(
                "Consider removing fulltext index from `{}` which is not a String column",
                col.name
            ),
            sql: None,
            explanation: format!(
                "The `{}` column has a fulltext index. Fulltext on a non-String column is not recommended.",
                col.name
            ),
        })
        .collect()
}

/// Suggest sharding for high ingest rates
pub fn optimize_partitioning(global: &GlobalData) -> Vec<Suggestion> {
    if global.ingest_throughput.unwrap_or(0) < SHARDING_THROUGHPUT {
        return Vec::new();
    }

    vec![Suggestion {
        title: "Consider table sharding".to_string(),
        sql: Some("PARTITION ON COLUMNS (...) (\n    ...\n);".to_string()),
        explanation: format!(
            "Consider sharding the table to distribute the data across multiple nodes and \
             improve ingest performance. Document: {}",
            SHARDING_DOC
        ),
    }]
}

/// Suggest an append-only table when deduplication is not needed
pub fn optimize_append_only(global: &GlobalData) -> Vec<Suggestion> {
    if !global.has_duplicates {
        return Vec::new();
    }

    vec![Suggestion {
        title: "Consider using append-only table".to_string(),
        sql: Some("CREATE TABLE users (\n    ...\n) with('append_mode'='true')".to_string()),
        explanation: format!(
            "Consider using an append-only table to skip data deduplication and improve \
             ingest/query performance. Document: {}",
            APPEND_ONLY_DOC
        ),
    }]
}

/// Run every rule, in a fixed order
pub fn generate_suggestions(columns: &[Column], global: &GlobalData) -> Vec<Suggestion> {
    let mut suggestions = optimize_cardinality(columns);
    suggestions.extend(optimize_fulltext_index(columns));
    suggestions.extend(optimize_partitioning(global));
    suggestions.extend(optimize_append_only(global));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::{IndexKind, SemanticType};

    fn column(name: &str, data_type: &str, index: Option<IndexKind>, cardinality: Option<u64>) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            semantic_type: SemanticType::Field,
            nullable: true,
            index,
            cardinality,
        }
    }

    #[test]
    fn test_high_cardinality_column() {
        let columns = vec![
            column("host", "string", Some(IndexKind::Primary), Some(2_000_000)),
            column("cpu", "double", None, Some(5_000_000)),
        ];
        let suggestions = optimize_cardinality(&columns);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].title, "Consider removing index from `host`");
        assert!(suggestions[1].explanation.contains("2000000"));
    }

    #[test]
    fn test_product_of_inverted_columns() {
        let columns = vec![
            column("host", "string", Some(IndexKind::Primary), Some(1_000)),
            column("dc", "string", Some(IndexKind::Inverted), Some(1_000)),
            column("msg", "string", Some(IndexKind::Fulltext), Some(1_000_000)),
        ];
        let suggestions = optimize_cardinality(&columns);

        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].explanation.contains("1000000"));
    }

    #[test]
    fn test_unknown_cardinality_is_neutral() {
        let columns = vec![
            column("host", "string", Some(IndexKind::Primary), None),
            column("ts", "timestamp", Some(IndexKind::Time), None),
        ];
        assert!(optimize_cardinality(&columns).is_empty());
    }

    #[test]
    fn test_product_saturates() {
        let columns = vec![
            column("a", "string", Some(IndexKind::Primary), Some(u64::MAX / 2)),
            column("b", "string", Some(IndexKind::Primary), Some(u64::MAX / 2)),
        ];
        let suggestions = optimize_cardinality(&columns);
        assert_eq!(suggestions.len(), 3);
    }

    #[test]
    fn test_fulltext_on_non_string() {
        let columns = vec![
            column("msg", "string", Some(IndexKind::Fulltext), None),
            column("code", "int", Some(IndexKind::Fulltext), None),
        ];
        let suggestions = optimize_fulltext_index(&columns);
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].title.contains("`code`"));
    }

    #[test]
    fn test_partitioning_threshold() {
        let mut global = GlobalData::default();
        assert!(optimize_partitioning(&global).is_empty());

        global.ingest_throughput = Some(499_999);
        assert!(optimize_partitioning(&global).is_empty());

        global.ingest_throughput = Some(500_000);
        let suggestions = optimize_partitioning(&global);
        assert_eq!(suggestions.len(), 1);
        assert!(suggestions[0].sql.as_deref().unwrap().starts_with("PARTITION ON COLUMNS"));
    }

    #[test]
    fn test_generate_order() {
        let columns = vec![column("code", "bigint", Some(IndexKind::Fulltext), None)];
        let global = GlobalData {
            ingest_throughput: Some(1_000_000),
            has_duplicates: true,
        };
        let titles: Vec<String> = generate_suggestions(&columns, &global)
            .into_iter()
            .map(|s| s.title)
            .collect();

        assert_eq!(titles.len(), 3);
        assert!(titles[0].starts_with("Consider removing fulltext index"));
        assert_eq!(titles[1], "Consider table sharding");
        assert_eq!(titles[2], "Consider using append-only table");
    }
}
