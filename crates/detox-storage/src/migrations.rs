use anyhow::Result;
use rusqlite::Connection;

/// Initialize database schema
///
/// # Errors
///
/// Returns an error if database table creation fails
pub fn init_schema(conn: &Connection) -> Result<()> {
    // Settings table - time limit, watched apps, monitoring switch
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            id TEXT PRIMARY KEY,
            time_limit_minutes INTEGER NOT NULL,
            watched_apps TEXT NOT NULL,
            monitoring_enabled INTEGER DEFAULT 0
        )",
        [],
    )?;

    // Add columns introduced after the first release
    let columns_to_add = vec![("monitoring_enabled", "INTEGER DEFAULT 0")];

    for (column_name, column_type) in columns_to_add {
        let column_exists: Result<i32, rusqlite::Error> = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM pragma_table_info('settings') WHERE name='{column_name}'"
            ),
            [],
            |row| row.get(0),
        );

        if column_exists.unwrap_or(0) == 0 {
            conn.execute(
                &format!("ALTER TABLE settings ADD COLUMN {column_name} {column_type}"),
                [],
            )?;
            log::info!("Added {column_name} column to settings table");
        }
    }

    // Intervention history - single row keyed by name
    conn.execute(
        "CREATE TABLE IF NOT EXISTS intervention_history (
            key TEXT PRIMARY KEY,
            last_first_reminder_date TEXT
        )",
        [],
    )?;

    Ok(())
}
