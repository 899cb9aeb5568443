// sqlx::Error -> store error translation

use schemaless_core::error::AppError;

/// Render a driver error as a cause string with SQLite result-code context.
pub fn describe_sqlx_error(err: &sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => {
            // SQLite error codes: https://www.sqlite.org/rescode.html
            match db_err.code() {
                Some(code) => match code.as_ref() {
                    "2067" | "1555" => {
                        format!("Unique constraint violation: {} ({})", db_err.message(), code)
                    }
                    "1299" => format!("NOT NULL constraint violation: {} ({})", db_err.message(), code),
                    "5" => format!("Database locked (SQLITE_BUSY): {}", db_err.message()),
                    "13" => format!("Database full: {}", db_err.message()),
                    "11" => format!("Database corrupt: {}", db_err.message()),
                    other => format!("Database error [{}]: {}", other, db_err.message()),
                },
                None => format!("Database error: {}", db_err.message()),
            }
        }
        sqlx::Error::RowNotFound => "Row not found".to_string(),
        sqlx::Error::ColumnNotFound(col) => format!("Column not found: {}", col),
        sqlx::Error::PoolClosed => "Connection pool closed".to_string(),
        // Connection, pool, protocol errors
        _ => err.to_string(),
    }
}

/// Map errors that are not tied to a single entity operation
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    AppError::Database(describe_sqlx_error(&err))
}

/// `ALTER TABLE ... ADD COLUMN` lost a race (or the column differs only by case)
pub fn is_duplicate_column(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("duplicate column name"),
        _ => false,
    }
}
