// ==========================================
// 合同数据登记系统 - RawData 仓储
// ==========================================
// 每个文件行一条审计记录，50 个通用文本列
// ==========================================

use crate::domain::interface_call::{RawData, RAW_DATA_FIELD_COUNT};
use crate::domain::types::RowStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};

fn raw_columns() -> String {
    (1..=RAW_DATA_FIELD_COUNT)
        .map(|i| format!("field_{:02}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct RawDataRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RawDataRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入一行审计记录（fields 不足 50 列时补空串）
    pub fn insert_tx(
        conn: &Connection,
        interface_call_id: i64,
        seq_nr: i64,
        status: RowStatus,
        message: Option<&str>,
        row_values: &[Option<String>],
    ) -> RepositoryResult<i64> {
        let fields = RawData::pad_fields(row_values);
        let placeholders = (1..=RAW_DATA_FIELD_COUNT + 4)
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO raw_data (interface_call_id, seq_nr, status, message, {}) VALUES ({})",
            raw_columns(),
            placeholders
        );
        let head = vec![
            Value::Integer(interface_call_id),
            Value::Integer(seq_nr),
            Value::Text(status.to_db_str().to_string()),
            message
                .map(|m| Value::Text(m.to_string()))
                .unwrap_or(Value::Null),
        ];
        conn.execute(
            &sql,
            params_from_iter(head.into_iter().chain(fields.into_iter().map(Value::Text))),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_by_call(&self, interface_call_id: i64) -> RepositoryResult<Vec<RawData>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, interface_call_id, seq_nr, status, message, {} FROM raw_data \
             WHERE interface_call_id = ?1 ORDER BY seq_nr",
            raw_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![interface_call_id], |row| {
                let raw_status: String = row.get(3)?;
                let status = RowStatus::from_str(&raw_status).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        Type::Text,
                        format!("未知的行状态: {}", raw_status).into(),
                    )
                })?;
                let mut fields = Vec::with_capacity(RAW_DATA_FIELD_COUNT);
                for i in 0..RAW_DATA_FIELD_COUNT {
                    fields.push(row.get::<_, String>(5 + i)?);
                }
                Ok(RawData {
                    id: row.get(0)?,
                    interface_call_id: row.get(1)?,
                    seq_nr: row.get(2)?,
                    status,
                    message: row.get(4)?,
                    fields,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
