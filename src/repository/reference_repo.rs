// ==========================================
// 合同数据登记系统 - 静态参考数据仓储
// ==========================================
// 表: system / dataset_type / interface_definition / mapping
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::reference::{DatasetType, InterfaceDefinition, Mapping, System};
use crate::domain::types::Channel;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const INTERFACE_DEFINITION_COLUMNS: &str =
    "id, name, description, interface_type, url, system_id, dataset_type_id";

fn map_interface_definition(row: &Row<'_>) -> rusqlite::Result<InterfaceDefinition> {
    let interface_type: String = row.get(3)?;
    let channel = Channel::from_str(&interface_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown interface_type '{}'", interface_type).into(),
        )
    })?;
    Ok(InterfaceDefinition {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        channel,
        url: row.get(4)?,
        system_id: row.get(5)?,
        dataset_type_id: row.get(6)?,
    })
}

// ==========================================
// ReferenceRepository
// ==========================================
pub struct ReferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== System =====

    pub fn create_system(&self, name: &str, description: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO system (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_system_by_name(&self, name: &str) -> RepositoryResult<Option<System>> {
        let conn = self.get_conn()?;
        Self::find_system_by_name_tx(&conn, name)
    }

    pub fn find_system_by_name_tx(conn: &Connection, name: &str) -> RepositoryResult<Option<System>> {
        let system = conn
            .query_row(
                "SELECT id, name, description FROM system WHERE name = ?1",
                params![name],
                |row| {
                    Ok(System {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(system)
    }

    pub fn find_system_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<System>> {
        let system = conn
            .query_row(
                "SELECT id, name, description FROM system WHERE id = ?1",
                params![id],
                |row| {
                    Ok(System {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(system)
    }

    // ===== DatasetType =====

    pub fn create_dataset_type(&self, name: &str, description: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO dataset_type (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_dataset_type_by_name(&self, name: &str) -> RepositoryResult<Option<DatasetType>> {
        let conn = self.get_conn()?;
        Self::find_dataset_type_by_name_tx(&conn, name)
    }

    pub fn find_dataset_type_by_name_tx(
        conn: &Connection,
        name: &str,
    ) -> RepositoryResult<Option<DatasetType>> {
        let dataset_type = conn
            .query_row(
                "SELECT id, name, description FROM dataset_type WHERE name = ?1",
                params![name],
                |row| {
                    Ok(DatasetType {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(dataset_type)
    }

    // ===== InterfaceDefinition =====

    pub fn create_interface_definition(
        &self,
        name: &str,
        description: &str,
        channel: Channel,
        system_id: i64,
        dataset_type_id: i64,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO interface_definition (name, description, interface_type, system_id, dataset_type_id)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![name, description, channel.to_db_str(), system_id, dataset_type_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按 (system, dataset_type, channel) 三元组查询
    pub fn find_interface_definition_tx(
        conn: &Connection,
        system_id: i64,
        dataset_type_id: i64,
        channel: Channel,
    ) -> RepositoryResult<Option<InterfaceDefinition>> {
        let sql = format!(
            "SELECT {} FROM interface_definition \
             WHERE system_id = ?1 AND dataset_type_id = ?2 AND interface_type = ?3",
            INTERFACE_DEFINITION_COLUMNS
        );
        let def = conn
            .query_row(
                &sql,
                params![system_id, dataset_type_id, channel.to_db_str()],
                map_interface_definition,
            )
            .optional()?;
        Ok(def)
    }

    pub fn find_interface_definition_by_id_tx(
        conn: &Connection,
        id: i64,
    ) -> RepositoryResult<Option<InterfaceDefinition>> {
        let sql = format!(
            "SELECT {} FROM interface_definition WHERE id = ?1",
            INTERFACE_DEFINITION_COLUMNS
        );
        let def = conn
            .query_row(&sql, params![id], map_interface_definition)
            .optional()?;
        Ok(def)
    }

    pub fn list_interface_definitions(&self) -> RepositoryResult<Vec<InterfaceDefinition>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM interface_definition ORDER BY id",
            INTERFACE_DEFINITION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let defs = stmt
            .query_map([], map_interface_definition)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(defs)
    }

    // ===== Mapping =====

    pub fn create_mapping(
        &self,
        name: &str,
        system_id: i64,
        org_unit_id: i64,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO mapping (name, system_id, org_unit_id) VALUES (?1, ?2, ?3)",
            params![name, system_id, org_unit_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按系统 + 名称精确匹配
    pub fn find_mapping_tx(
        conn: &Connection,
        system_id: i64,
        name: &str,
    ) -> RepositoryResult<Option<Mapping>> {
        let mapping = conn
            .query_row(
                "SELECT id, name, system_id, org_unit_id FROM mapping WHERE system_id = ?1 AND name = ?2",
                params![system_id, name],
                |row| {
                    Ok(Mapping {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        system_id: row.get(2)?,
                        org_unit_id: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(mapping)
    }
}
