// ==========================================
// 合同数据登记系统 - DataPerOrgUnit 仓储
// ==========================================
// 表: data_per_org_unit
// 兄弟 DPOU = 相同 org_unit + 相同 dataset_type（经 interface_call → interface_definition）
// ==========================================

use crate::domain::interface_call::DataPerOrgUnit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const DPOU_COLUMNS: &str = "d.id, d.interface_call_id, d.org_unit_id, \
     d.number_of_data_rows_ok, d.number_of_data_rows_warning, d.active";

fn map_dpou(row: &Row<'_>) -> rusqlite::Result<DataPerOrgUnit> {
    Ok(DataPerOrgUnit {
        id: row.get(0)?,
        interface_call_id: row.get(1)?,
        org_unit_id: row.get(2)?,
        number_of_data_rows_ok: row.get(3)?,
        number_of_data_rows_warning: row.get(4)?,
        active: row.get(5)?,
    })
}

/// DPOU 所属的数据集类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpouDatasetType {
    pub dataset_type_id: i64,
    pub dataset_type_name: String,
}

pub struct DataPerOrgUnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DataPerOrgUnitRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查找或创建 (interface_call, org_unit) 对应的 DPOU
    pub fn find_or_create_tx(
        conn: &Connection,
        interface_call_id: i64,
        org_unit_id: i64,
    ) -> RepositoryResult<DataPerOrgUnit> {
        conn.execute(
            "INSERT OR IGNORE INTO data_per_org_unit (interface_call_id, org_unit_id) VALUES (?1, ?2)",
            params![interface_call_id, org_unit_id],
        )?;
        let sql = format!(
            "SELECT {} FROM data_per_org_unit d WHERE d.interface_call_id = ?1 AND d.org_unit_id = ?2",
            DPOU_COLUMNS
        );
        let dpou = conn.query_row(&sql, params![interface_call_id, org_unit_id], map_dpou)?;
        Ok(dpou)
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<DataPerOrgUnit>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, id)
    }

    pub fn find_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<DataPerOrgUnit>> {
        let sql = format!("SELECT {} FROM data_per_org_unit d WHERE d.id = ?1", DPOU_COLUMNS);
        let dpou = conn.query_row(&sql, params![id], map_dpou).optional()?;
        Ok(dpou)
    }

    pub fn list_by_call(&self, interface_call_id: i64) -> RepositoryResult<Vec<DataPerOrgUnit>> {
        let conn = self.get_conn()?;
        Self::list_by_call_tx(&conn, interface_call_id)
    }

    pub fn list_by_call_tx(
        conn: &Connection,
        interface_call_id: i64,
    ) -> RepositoryResult<Vec<DataPerOrgUnit>> {
        let sql = format!(
            "SELECT {} FROM data_per_org_unit d WHERE d.interface_call_id = ?1 ORDER BY d.id",
            DPOU_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params![interface_call_id], map_dpou)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    pub fn set_active_tx(conn: &Connection, id: i64, active: bool) -> RepositoryResult<()> {
        let affected = conn.execute(
            "UPDATE data_per_org_unit SET active = ?1 WHERE id = ?2",
            params![active, id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("DataPerOrgUnit", id));
        }
        Ok(())
    }

    pub fn increment_counters_tx(
        conn: &Connection,
        id: i64,
        ok: i64,
        warning: i64,
    ) -> RepositoryResult<()> {
        conn.execute(
            r#"
            UPDATE data_per_org_unit SET
                number_of_data_rows_ok = number_of_data_rows_ok + ?1,
                number_of_data_rows_warning = number_of_data_rows_warning + ?2
            WHERE id = ?3
            "#,
            params![ok, warning, id],
        )?;
        Ok(())
    }

    /// 通过 interface_call → interface_definition → dataset_type 链取数据集类型
    ///
    /// # 返回
    /// - Err(IntegrityError): 链上任一环为空
    pub fn dataset_type_tx(conn: &Connection, dpou_id: i64) -> RepositoryResult<DpouDatasetType> {
        let chain: Option<(Option<i64>, Option<i64>, Option<String>)> = conn
            .query_row(
                r#"
                SELECT c.interface_definition_id, i.dataset_type_id, t.name
                FROM data_per_org_unit d
                JOIN interface_call c ON c.id = d.interface_call_id
                LEFT JOIN interface_definition i ON i.id = c.interface_definition_id
                LEFT JOIN dataset_type t ON t.id = i.dataset_type_id
                WHERE d.id = ?1
                "#,
                params![dpou_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match chain {
            None => Err(RepositoryError::not_found("DataPerOrgUnit", dpou_id)),
            Some((Some(_), Some(dataset_type_id), Some(dataset_type_name))) => Ok(DpouDatasetType {
                dataset_type_id,
                dataset_type_name,
            }),
            Some((definition, dataset_type, _)) => Err(RepositoryError::IntegrityError(format!(
                "DataPerOrgUnit {} has no resolvable dataset type (interface_definition={:?}, dataset_type={:?})",
                dpou_id, definition, dataset_type
            ))),
        }
    }

    /// 同组织单元、同数据集类型、已激活的其他 DPOU
    pub fn active_siblings_tx(
        conn: &Connection,
        dpou: &DataPerOrgUnit,
        dataset_type_id: i64,
    ) -> RepositoryResult<Vec<DataPerOrgUnit>> {
        let sql = format!(
            r#"
            SELECT {}, i.dataset_type_id
            FROM data_per_org_unit d
            JOIN interface_call c ON c.id = d.interface_call_id
            LEFT JOIN interface_definition i ON i.id = c.interface_definition_id
            WHERE d.org_unit_id = ?1 AND d.active = 1 AND d.id <> ?2
            ORDER BY d.id
            "#,
            DPOU_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let candidates = stmt
            .query_map(params![dpou.org_unit_id, dpou.id], |row| {
                Ok((map_dpou(row)?, row.get::<_, Option<i64>>(6)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut siblings = Vec::new();
        for (candidate, candidate_type) in candidates {
            match candidate_type {
                Some(t) if t == dataset_type_id => siblings.push(candidate),
                Some(_) => {}
                None => {
                    return Err(RepositoryError::IntegrityError(format!(
                        "active DataPerOrgUnit {} has no resolvable dataset type",
                        candidate.id
                    )))
                }
            }
        }
        Ok(siblings)
    }

    /// (org_unit, dataset_type) 下激活 DPOU 数量
    pub fn count_active(&self, org_unit_id: i64, dataset_type_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM data_per_org_unit d
            JOIN interface_call c ON c.id = d.interface_call_id
            JOIN interface_definition i ON i.id = c.interface_definition_id
            WHERE d.org_unit_id = ?1 AND i.dataset_type_id = ?2 AND d.active = 1
            "#,
            params![org_unit_id, dataset_type_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
