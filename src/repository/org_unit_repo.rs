// ==========================================
// 合同数据登记系统 - 组织单元仓储
// ==========================================
// 组织树: org_unit.parent_org_unit_id 自引用
// 写入时校验无环；读取遍历使用 visited 集合
// ==========================================

use crate::domain::reference::OrganizationalUnit;
use crate::domain::types::OrgUnitType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

fn map_org_unit(row: &Row<'_>) -> rusqlite::Result<OrganizationalUnit> {
    Ok(OrganizationalUnit {
        id: row.get(0)?,
        name: row.get(1)?,
        unit_type: OrgUnitType::from_str(&row.get::<_, String>(2)?),
        parent_org_unit_id: row.get(3)?,
    })
}

pub struct OrgUnitRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrgUnitRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建组织单元（新节点不可能成环，只校验父节点存在）
    pub fn create(
        &self,
        name: &str,
        unit_type: OrgUnitType,
        parent_org_unit_id: Option<i64>,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        if let Some(parent_id) = parent_org_unit_id {
            if Self::find_by_id_tx(&conn, parent_id)?.is_none() {
                return Err(RepositoryError::not_found("OrganizationalUnit", parent_id));
            }
        }
        conn.execute(
            "INSERT INTO org_unit (name, unit_type, parent_org_unit_id) VALUES (?1, ?2, ?3)",
            params![name, unit_type.to_db_str(), parent_org_unit_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 修改父节点
    ///
    /// # 返回
    /// - Err(ValidationError): 新父节点是自身或自身的后代（会形成环）
    pub fn set_parent(&self, id: i64, parent_org_unit_id: Option<i64>) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if Self::find_by_id_tx(&tx, id)?.is_none() {
            return Err(RepositoryError::not_found("OrganizationalUnit", id));
        }

        if let Some(parent_id) = parent_org_unit_id {
            // 从新父节点向上走，若遇到自身则成环
            let mut visited = HashSet::new();
            let mut current = Some(parent_id);
            while let Some(node) = current {
                if node == id {
                    return Err(RepositoryError::ValidationError(format!(
                        "setting parent {} on org unit {} would create a cycle",
                        parent_id, id
                    )));
                }
                if !visited.insert(node) {
                    return Err(RepositoryError::IntegrityError(format!(
                        "org unit tree already contains a cycle at {}",
                        node
                    )));
                }
                current = match Self::find_by_id_tx(&tx, node)? {
                    Some(unit) => unit.parent_org_unit_id,
                    None => return Err(RepositoryError::not_found("OrganizationalUnit", node)),
                };
            }
        }

        tx.execute(
            "UPDATE org_unit SET parent_org_unit_id = ?1 WHERE id = ?2",
            params![parent_org_unit_id, id],
        )?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<OrganizationalUnit>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, id)
    }

    pub fn find_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<OrganizationalUnit>> {
        let unit = conn
            .query_row(
                "SELECT id, name, unit_type, parent_org_unit_id FROM org_unit WHERE id = ?1",
                params![id],
                map_org_unit,
            )
            .optional()?;
        Ok(unit)
    }

    pub fn find_by_name(&self, name: &str) -> RepositoryResult<Option<OrganizationalUnit>> {
        let conn = self.get_conn()?;
        let unit = conn
            .query_row(
                "SELECT id, name, unit_type, parent_org_unit_id FROM org_unit WHERE name = ?1",
                params![name],
                map_org_unit,
            )
            .optional()?;
        Ok(unit)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<OrganizationalUnit>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, unit_type, parent_org_unit_id FROM org_unit ORDER BY id",
        )?;
        let units = stmt
            .query_map([], map_org_unit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    /// 直接子节点
    pub fn children_tx(conn: &Connection, id: i64) -> RepositoryResult<Vec<i64>> {
        let mut stmt = conn.prepare("SELECT id FROM org_unit WHERE parent_org_unit_id = ?1")?;
        let ids = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// 根节点集合及其全部后代（含根自身）
    pub fn expand_descendants_tx(conn: &Connection, roots: &[i64]) -> RepositoryResult<BTreeSet<i64>> {
        let mut result = BTreeSet::new();
        let mut stack: Vec<i64> = roots.to_vec();
        while let Some(id) = stack.pop() {
            if !result.insert(id) {
                continue;
            }
            stack.extend(Self::children_tx(conn, id)?);
        }
        Ok(result)
    }

    pub fn expand_descendants(&self, roots: &[i64]) -> RepositoryResult<BTreeSet<i64>> {
        let conn = self.get_conn()?;
        Self::expand_descendants_tx(&conn, roots)
    }
}
