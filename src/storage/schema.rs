//! SQL generation for target tables

use crate::table::TableSpec;

/// Quote an identifier for SQLite (`"name"`, embedded quotes doubled)
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal (`'value'`, embedded quotes doubled)
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `CREATE TABLE IF NOT EXISTS` statement for a table definition
pub fn create_table_sql(spec: &TableSpec) -> String {
    let columns: Vec<String> = spec
        .columns
        .iter()
        .map(|column| {
            let mut def = format!("    {} {}", quote_ident(&column.name), column.kind.sql_type());
            if !column.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(default) = &column.default {
                def.push_str(" DEFAULT ");
                def.push_str(&quote_literal(default));
            }
            def
        })
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_ident(&spec.name),
        columns.join(",\n")
    )
}

/// Positional `INSERT` covering every column, in declaration order
pub fn insert_sql(spec: &TableSpec) -> String {
    let names: Vec<String> = spec.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<String> = (1..=spec.columns.len()).map(|i| format!("?{}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&spec.name),
        names.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnSpec, ColumnType};

    fn sample_spec() -> TableSpec {
        TableSpec::new(
            "facts",
            vec![
                ColumnSpec::new("id", ColumnType::Integer).not_null(),
                ColumnSpec::new("code", ColumnType::Text).not_null().with_default("@"),
                ColumnSpec::new("seen_at", ColumnType::Timestamp),
            ],
        )
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(&sample_spec());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"facts\""));
        assert!(sql.contains("\"id\" INTEGER NOT NULL"));
        assert!(sql.contains("\"code\" TEXT NOT NULL DEFAULT '@'"));
        assert!(sql.contains("\"seen_at\" DATETIME"));
        assert!(!sql.contains("\"seen_at\" DATETIME NOT NULL"));
    }

    #[test]
    fn test_insert_sql() {
        assert_eq!(
            insert_sql(&sample_spec()),
            "INSERT INTO \"facts\" (\"id\", \"code\", \"seen_at\") VALUES (?1, ?2, ?3)"
        );
    }

    #[test]
    fn test_generated_sql_executes() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let spec = sample_spec();
        conn.execute(&create_table_sql(&spec), []).unwrap();
        conn.execute(
            &insert_sql(&spec),
            rusqlite::params![1, "A", "2020-01-01 00:00:00"],
        )
        .unwrap();
        conn.execute("INSERT INTO facts (id) VALUES (2)", []).unwrap();

        let code: String = conn
            .query_row("SELECT code FROM facts WHERE id = 2", [], |row| row.get(0))
            .unwrap();
        assert_eq!(code, "@");
    }
}
