// ==========================================
// 合同数据登记系统 - 数据集查询（只读）
// ==========================================
// 一个“数据集” = 一个 DPOU 连同其调用、组织单元、系统、数据集类型
// 过滤谓词在 api::dataset_api 中组合
// ==========================================

use crate::domain::types::InterfaceCallStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::interface_call_repo::status_column;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRecord {
    pub data_per_org_unit_id: i64,
    pub active: bool,
    pub number_of_data_rows_ok: i64,
    pub number_of_data_rows_warning: i64,
    pub org_unit_id: i64,
    pub org_unit_name: String,
    pub interface_call_id: i64,
    pub interface_call_status: InterfaceCallStatus,
    pub date_time_creation: NaiveDateTime,
    pub filename: String,
    pub username: Option<String>,
    pub interface_definition_name: Option<String>,
    pub system_name: Option<String>,
    pub dataset_type_name: Option<String>,
}

pub struct DatasetQueryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DatasetQueryRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 全部数据集，按调用时间倒序
    pub fn list_all(&self) -> RepositoryResult<Vec<DatasetRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT
                d.id, d.active, d.number_of_data_rows_ok, d.number_of_data_rows_warning,
                o.id, o.name,
                c.id, c.status, c.date_time_creation, c.filename, c.username,
                i.name, s.name, t.name
            FROM data_per_org_unit d
            JOIN org_unit o ON o.id = d.org_unit_id
            JOIN interface_call c ON c.id = d.interface_call_id
            LEFT JOIN interface_definition i ON i.id = c.interface_definition_id
            LEFT JOIN system s ON s.id = i.system_id
            LEFT JOIN dataset_type t ON t.id = i.dataset_type_id
            ORDER BY c.date_time_creation DESC, d.id
            "#,
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DatasetRecord {
                    data_per_org_unit_id: row.get(0)?,
                    active: row.get(1)?,
                    number_of_data_rows_ok: row.get(2)?,
                    number_of_data_rows_warning: row.get(3)?,
                    org_unit_id: row.get(4)?,
                    org_unit_name: row.get(5)?,
                    interface_call_id: row.get(6)?,
                    interface_call_status: status_column(row, 7)?,
                    date_time_creation: row.get(8)?,
                    filename: row.get(9)?,
                    username: row.get(10)?,
                    interface_definition_name: row.get(11)?,
                    system_name: row.get(12)?,
                    dataset_type_name: row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
