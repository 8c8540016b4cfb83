// ==========================================
// 合同数据登记系统 - 接口调用仓储
// ==========================================
// 表: interface_call
// 状态迁移只在这里落库，迁移规则由激活引擎决定
// ==========================================

use crate::domain::interface_call::{InterfaceCall, RowCounters, UploadUser};
use crate::domain::types::InterfaceCallStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const INTERFACE_CALL_COLUMNS: &str = r#"
    id, date_time_creation, filename, status, message,
    number_of_rows_received, number_of_data_rows_received, number_of_empty_rows,
    number_of_header_rows, number_of_data_rows_ok, number_of_data_rows_warning,
    number_of_data_rows_error, number_of_data_rows_ignored,
    interface_definition_id, user_id, username, user_email
"#;

/// 读取状态列；未知状态作为转换失败上抛，仓储错误层归为完整性错误
pub(crate) fn status_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<InterfaceCallStatus> {
    let raw: String = row.get(idx)?;
    InterfaceCallStatus::from_str(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("未知的接口调用状态: {}", raw).into(),
        )
    })
}

fn map_interface_call(row: &Row<'_>) -> rusqlite::Result<InterfaceCall> {
    Ok(InterfaceCall {
        id: row.get(0)?,
        date_time_creation: row.get(1)?,
        filename: row.get(2)?,
        status: status_column(row, 3)?,
        message: row.get(4)?,
        counters: RowCounters {
            rows_received: row.get(5)?,
            data_rows_received: row.get(6)?,
            empty_rows: row.get(7)?,
            header_rows: row.get(8)?,
            data_rows_ok: row.get(9)?,
            data_rows_warning: row.get(10)?,
            data_rows_error: row.get(11)?,
            data_rows_ignored: row.get(12)?,
        },
        interface_definition_id: row.get(13)?,
        user: UploadUser {
            user_id: row.get(14)?,
            username: row.get(15)?,
            user_email: row.get(16)?,
        },
    })
}

pub struct InterfaceCallRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InterfaceCallRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建调用记录（id 由数据库分配，入参 id 忽略）
    pub fn insert(&self, call: &InterfaceCall) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_tx(&conn, call)
    }

    pub fn insert_tx(conn: &Connection, call: &InterfaceCall) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO interface_call (
                date_time_creation, filename, status, message,
                interface_definition_id, user_id, username, user_email
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                call.date_time_creation,
                call.filename,
                call.status.to_db_str(),
                call.message,
                call.interface_definition_id,
                call.user.user_id,
                call.user.username,
                call.user.user_email,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<InterfaceCall>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, id)
    }

    pub fn find_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<InterfaceCall>> {
        let sql = format!("SELECT {} FROM interface_call WHERE id = ?1", INTERFACE_CALL_COLUMNS);
        let call = conn
            .query_row(&sql, params![id], map_interface_call)
            .optional()?;
        Ok(call)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<InterfaceCall>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM interface_call ORDER BY date_time_creation DESC, id DESC",
            INTERFACE_CALL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let calls = stmt
            .query_map([], map_interface_call)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(calls)
    }

    pub fn update_status(
        &self,
        id: i64,
        status: InterfaceCallStatus,
        message: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        Self::update_status_with_message_tx(&conn, id, status, message)
    }

    pub fn update_status_with_message_tx(
        conn: &Connection,
        id: i64,
        status: InterfaceCallStatus,
        message: &str,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE interface_call SET status = ?1, message = ?2 WHERE id = ?3",
            params![status.to_db_str(), message, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("InterfaceCall", id));
        }
        Ok(())
    }

    /// 只改状态，保留导入时写入的 message
    pub fn update_status_tx(
        conn: &Connection,
        id: i64,
        status: InterfaceCallStatus,
    ) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE interface_call SET status = ?1 WHERE id = ?2",
            params![status.to_db_str(), id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("InterfaceCall", id));
        }
        Ok(())
    }

    pub fn set_interface_definition(&self, id: i64, interface_definition_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE interface_call SET interface_definition_id = ?1 WHERE id = ?2",
            params![interface_definition_id, id],
        )?;
        Ok(())
    }

    pub fn update_counters_tx(
        conn: &Connection,
        id: i64,
        counters: &RowCounters,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE interface_call SET
                number_of_rows_received = ?1,
                number_of_data_rows_received = ?2,
                number_of_empty_rows = ?3,
                number_of_header_rows = ?4,
                number_of_data_rows_ok = ?5,
                number_of_data_rows_warning = ?6,
                number_of_data_rows_error = ?7,
                number_of_data_rows_ignored = ?8
            WHERE id = ?9
            "#,
            params![
                counters.rows_received,
                counters.data_rows_received,
                counters.empty_rows,
                counters.header_rows,
                counters.data_rows_ok,
                counters.data_rows_warning,
                counters.data_rows_error,
                counters.data_rows_ignored,
                id,
            ],
        )?;
        Ok(())
    }
}
