// ==========================================
// 合同数据登记系统 - 用户仓储
// ==========================================
// 表: app_user / user_org_unit / user_permission
// ==========================================

use crate::domain::user::User;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct UserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl UserRepository {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn create(
        &self,
        username: &str,
        display_name: &str,
        email: &str,
        is_superuser: bool,
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO app_user (username, display_name, email, is_superuser) VALUES (?1, ?2, ?3, ?4)",
            params![username, display_name, email, is_superuser],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_org_unit(&self, user_id: i64, org_unit_id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO user_org_unit (user_id, org_unit_id) VALUES (?1, ?2)",
            params![user_id, org_unit_id],
        )?;
        Ok(())
    }

    /// 权限名与 InterfaceDefinition.name 对应（“我负责的”）
    pub fn add_permission(&self, user_id: i64, permission: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO user_permission (user_id, permission) VALUES (?1, ?2)",
            params![user_id, permission],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        Self::load_tx(&conn, "id = ?1", &id)
    }

    pub fn find_by_username(&self, username: &str) -> RepositoryResult<Option<User>> {
        let conn = self.get_conn()?;
        Self::load_tx(&conn, "username = ?1", &username)
    }

    fn load_tx(
        conn: &Connection,
        predicate: &str,
        key: &dyn rusqlite::ToSql,
    ) -> RepositoryResult<Option<User>> {
        let sql = format!(
            "SELECT id, username, display_name, email, is_superuser FROM app_user WHERE {}",
            predicate
        );
        let user = conn
            .query_row(&sql, [key], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    display_name: row.get(2)?,
                    email: row.get(3)?,
                    is_superuser: row.get(4)?,
                    org_unit_ids: Vec::new(),
                    permissions: Vec::new(),
                })
            })
            .optional()?;

        let Some(mut user) = user else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT org_unit_id FROM user_org_unit WHERE user_id = ?1 ORDER BY org_unit_id",
        )?;
        user.org_unit_ids = stmt
            .query_map(params![user.id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT permission FROM user_permission WHERE user_id = ?1 ORDER BY permission",
        )?;
        user.permissions = stmt
            .query_map(params![user.id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(Some(user))
    }
}
