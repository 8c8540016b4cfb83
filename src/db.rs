// ==========================================
// 合同数据登记系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 统一建表入口 init_schema（幂等，CREATE TABLE IF NOT EXISTS）
// ==========================================

use crate::domain::interface_call::RAW_DATA_FIELD_COUNT;
use crate::domain::contract::ContractField;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 合同字段列定义（暂存表与业务表共用）
fn contract_columns_ddl() -> String {
    ContractField::ALL
        .iter()
        .map(|f| format!("            {} TEXT", f.column()))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// RawData 通用列定义 field_01 .. field_50
fn raw_data_columns_ddl() -> String {
    (1..=RAW_DATA_FIELD_COUNT)
        .map(|i| format!("            field_{:02} TEXT NOT NULL DEFAULT ''", i))
        .collect::<Vec<_>>()
        .join(",\n")
}

/// 初始化数据库 schema（幂等）
///
/// # 参数
/// - `conn`: 已配置的连接
///
/// # 返回
/// - Ok(()): 所有表已存在或已创建
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS system (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS dataset_type (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS interface_definition (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            interface_type TEXT NOT NULL,
            url TEXT NOT NULL DEFAULT '',
            system_id INTEGER NOT NULL REFERENCES system(id) ON DELETE CASCADE,
            dataset_type_id INTEGER NOT NULL REFERENCES dataset_type(id) ON DELETE CASCADE,
            UNIQUE(system_id, dataset_type_id, interface_type)
        );

        CREATE TABLE IF NOT EXISTS org_unit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            unit_type TEXT NOT NULL,
            parent_org_unit_id INTEGER REFERENCES org_unit(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS mapping (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            system_id INTEGER NOT NULL REFERENCES system(id) ON DELETE CASCADE,
            org_unit_id INTEGER NOT NULL REFERENCES org_unit(id) ON DELETE CASCADE,
            UNIQUE(system_id, name)
        );

        CREATE TABLE IF NOT EXISTS app_user (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL DEFAULT '',
            email TEXT NOT NULL DEFAULT '',
            is_superuser INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS user_org_unit (
            user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
            org_unit_id INTEGER NOT NULL REFERENCES org_unit(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, org_unit_id)
        );

        CREATE TABLE IF NOT EXISTS user_permission (
            user_id INTEGER NOT NULL REFERENCES app_user(id) ON DELETE CASCADE,
            permission TEXT NOT NULL,
            PRIMARY KEY (user_id, permission)
        );

        CREATE TABLE IF NOT EXISTS interface_call (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date_time_creation TEXT NOT NULL,
            filename TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL,
            message TEXT NOT NULL DEFAULT '',
            number_of_rows_received INTEGER NOT NULL DEFAULT 0,
            number_of_data_rows_received INTEGER NOT NULL DEFAULT 0,
            number_of_empty_rows INTEGER NOT NULL DEFAULT 0,
            number_of_header_rows INTEGER NOT NULL DEFAULT 0,
            number_of_data_rows_ok INTEGER NOT NULL DEFAULT 0,
            number_of_data_rows_warning INTEGER NOT NULL DEFAULT 0,
            number_of_data_rows_error INTEGER NOT NULL DEFAULT 0,
            number_of_data_rows_ignored INTEGER NOT NULL DEFAULT 0,
            interface_definition_id INTEGER REFERENCES interface_definition(id) ON DELETE CASCADE,
            user_id INTEGER REFERENCES app_user(id) ON DELETE SET NULL,
            username TEXT,
            user_email TEXT
        );

        CREATE TABLE IF NOT EXISTS data_per_org_unit (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            interface_call_id INTEGER NOT NULL REFERENCES interface_call(id) ON DELETE CASCADE,
            org_unit_id INTEGER NOT NULL REFERENCES org_unit(id) ON DELETE CASCADE,
            number_of_data_rows_ok INTEGER NOT NULL DEFAULT 0,
            number_of_data_rows_warning INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 0,
            UNIQUE(interface_call_id, org_unit_id)
        );

        CREATE INDEX IF NOT EXISTS idx_dpou_org_unit_active
            ON data_per_org_unit(org_unit_id, active);
        "#,
    )?;

    let columns = contract_columns_ddl();

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS raw_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            interface_call_id INTEGER NOT NULL REFERENCES interface_call(id) ON DELETE CASCADE,
            seq_nr INTEGER NOT NULL,
            status TEXT NOT NULL,
            message TEXT,
{raw}
        );

        CREATE TABLE IF NOT EXISTS stage_contract (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            interface_call_id INTEGER NOT NULL REFERENCES interface_call(id) ON DELETE CASCADE,
            data_per_org_unit_id INTEGER REFERENCES data_per_org_unit(id) ON DELETE CASCADE,
            seq_nr INTEGER NOT NULL,
            row_status TEXT,
            row_message TEXT,
{columns}
        );

        CREATE TABLE IF NOT EXISTS contract (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            data_per_org_unit_id INTEGER NOT NULL REFERENCES data_per_org_unit(id) ON DELETE CASCADE,
            seq_nr INTEGER NOT NULL,
{columns},
            UNIQUE(contract_nr)
        );

        CREATE INDEX IF NOT EXISTS idx_stage_contract_dpou ON stage_contract(data_per_org_unit_id);
        CREATE INDEX IF NOT EXISTS idx_contract_dpou ON contract(data_per_org_unit_id);
        CREATE INDEX IF NOT EXISTS idx_raw_data_call ON raw_data(interface_call_id, seq_nr);
        "#,
        raw = raw_data_columns_ddl(),
        columns = columns,
    ))?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let raw_columns: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('raw_data') WHERE name LIKE 'field_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(raw_columns, RAW_DATA_FIELD_COUNT as i64);
    }
}
