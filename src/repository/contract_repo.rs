// ==========================================
// 合同数据登记系统 - 合同仓储（暂存表 / 业务表）
// ==========================================
// 表: stage_contract / contract
// 列清单由 ContractField 生成，两表共用
// ==========================================

use crate::domain::contract::{Contract, ContractField, ContractValues, StageContract};
use crate::domain::types::RowStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::sync::{Arc, Mutex};

fn field_columns() -> String {
    ContractField::ALL
        .iter()
        .map(|f| f.column())
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_values(row: &Row<'_>, offset: usize) -> rusqlite::Result<ContractValues> {
    let mut values = ContractValues::new();
    for (i, field) in ContractField::ALL.iter().enumerate() {
        values.set(*field, row.get::<_, Option<String>>(offset + i)?);
    }
    Ok(values)
}

fn value_params(values: &ContractValues) -> impl Iterator<Item = Value> + '_ {
    ContractField::ALL.iter().map(move |f| match values.get(*f) {
        Some(v) => Value::Text(v.to_string()),
        None => Value::Null,
    })
}

fn map_stage(row: &Row<'_>) -> rusqlite::Result<StageContract> {
    Ok(StageContract {
        id: row.get(0)?,
        interface_call_id: row.get(1)?,
        data_per_org_unit_id: row.get(2)?,
        seq_nr: row.get(3)?,
        row_status: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| RowStatus::from_str(&s)),
        row_message: row.get(5)?,
        values: read_values(row, 6)?,
    })
}

fn map_contract(row: &Row<'_>) -> rusqlite::Result<Contract> {
    Ok(Contract {
        id: row.get(0)?,
        data_per_org_unit_id: row.get(1)?,
        seq_nr: row.get(2)?,
        values: read_values(row, 3)?,
    })
}

pub struct ContractRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContractRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 暂存表 =====

    pub fn insert_stage_tx(conn: &Connection, stage: &StageContract) -> RepositoryResult<i64> {
        let count = ContractField::ALL.len() + 5;
        let sql = format!(
            "INSERT INTO stage_contract (interface_call_id, data_per_org_unit_id, seq_nr, row_status, row_message, {}) \
             VALUES ({})",
            field_columns(),
            placeholders(count)
        );
        let head = vec![
            Value::Integer(stage.interface_call_id),
            stage
                .data_per_org_unit_id
                .map(Value::Integer)
                .unwrap_or(Value::Null),
            Value::Integer(stage.seq_nr),
            stage
                .row_status
                .map(|s| Value::Text(s.to_db_str().to_string()))
                .unwrap_or(Value::Null),
            stage
                .row_message
                .clone()
                .map(Value::Text)
                .unwrap_or(Value::Null),
        ];
        conn.execute(
            &sql,
            params_from_iter(head.into_iter().chain(value_params(&stage.values))),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn list_stage_by_dpou_tx(
        conn: &Connection,
        data_per_org_unit_id: i64,
    ) -> RepositoryResult<Vec<StageContract>> {
        let sql = format!(
            "SELECT id, interface_call_id, data_per_org_unit_id, seq_nr, row_status, row_message, {} \
             FROM stage_contract WHERE data_per_org_unit_id = ?1 ORDER BY seq_nr",
            field_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![data_per_org_unit_id], map_stage)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_stage_by_call(&self, interface_call_id: i64) -> RepositoryResult<Vec<StageContract>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, interface_call_id, data_per_org_unit_id, seq_nr, row_status, row_message, {} \
             FROM stage_contract WHERE interface_call_id = ?1 ORDER BY seq_nr",
            field_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![interface_call_id], map_stage)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_stage_by_dpou(&self, data_per_org_unit_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM stage_contract WHERE data_per_org_unit_id = ?1",
            params![data_per_org_unit_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ===== 业务表 =====

    pub fn insert_contract_tx(conn: &Connection, contract: &Contract) -> RepositoryResult<i64> {
        let count = ContractField::ALL.len() + 2;
        let sql = format!(
            "INSERT INTO contract (data_per_org_unit_id, seq_nr, {}) VALUES ({})",
            field_columns(),
            placeholders(count)
        );
        let head = vec![
            Value::Integer(contract.data_per_org_unit_id),
            Value::Integer(contract.seq_nr),
        ];
        conn.execute(
            &sql,
            params_from_iter(head.into_iter().chain(value_params(&contract.values))),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn delete_by_dpou_tx(conn: &Connection, data_per_org_unit_id: i64) -> RepositoryResult<usize> {
        let deleted = conn.execute(
            "DELETE FROM contract WHERE data_per_org_unit_id = ?1",
            params![data_per_org_unit_id],
        )?;
        Ok(deleted)
    }

    pub fn list_by_dpou(&self, data_per_org_unit_id: i64) -> RepositoryResult<Vec<Contract>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, data_per_org_unit_id, seq_nr, {} FROM contract \
             WHERE data_per_org_unit_id = ?1 ORDER BY seq_nr",
            field_columns()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![data_per_org_unit_id], map_contract)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_by_call(&self, interface_call_id: i64) -> RepositoryResult<Vec<Contract>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT c.id, c.data_per_org_unit_id, c.seq_nr, {} FROM contract c \
             JOIN data_per_org_unit d ON d.id = c.data_per_org_unit_id \
             WHERE d.interface_call_id = ?1 ORDER BY c.seq_nr",
            ContractField::ALL
                .iter()
                .map(|f| format!("c.{}", f.column()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![interface_call_id], map_contract)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_by_dpou(&self, data_per_org_unit_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM contract WHERE data_per_org_unit_id = ?1",
            params![data_per_org_unit_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM contract", [], |row| row.get(0))?;
        Ok(count)
    }
}
