// ==========================================
// 合同数据登记系统 - 组织单元授权
// ==========================================
// 用户被授权于其直属组织单元及全部下级单元
// 判定: 从目标单元沿父链向上，遇到用户直属单元即授权
// 父链遍历使用 visited 集合，重复访问 = 组织树成环（致命）
// ==========================================

use crate::domain::user::User;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::OrgUnitRepository;
use rusqlite::Connection;
use std::collections::{BTreeSet, HashSet};
use tracing::error;

pub struct OrgUnitAuthorizer;

impl OrgUnitAuthorizer {
    /// 用户是否被授权于组织单元
    ///
    /// # 返回
    /// - Err(OrgUnitCycle): 父链成环
    pub fn is_authorized_for_tx(
        conn: &Connection,
        user: &User,
        org_unit_id: i64,
    ) -> EngineResult<bool> {
        if user.is_superuser {
            return Ok(true);
        }
        let own: HashSet<i64> = user.org_unit_ids.iter().copied().collect();
        if own.is_empty() {
            return Ok(false);
        }

        let mut visited = HashSet::new();
        let mut current = Some(org_unit_id);
        while let Some(node) = current {
            if !visited.insert(node) {
                error!(org_unit_id = node, user = %user.username, "组织树成环");
                return Err(EngineError::OrgUnitCycle(node));
            }
            if own.contains(&node) {
                return Ok(true);
            }
            current = OrgUnitRepository::find_by_id_tx(conn, node)?
                .and_then(|unit| unit.parent_org_unit_id);
        }
        Ok(false)
    }

    /// 用户可见的全部组织单元（超级用户返回 None = 不限）
    pub fn org_units_of_user_tx(
        conn: &Connection,
        user: &User,
    ) -> EngineResult<Option<BTreeSet<i64>>> {
        if user.is_superuser {
            return Ok(None);
        }
        Ok(Some(OrgUnitRepository::expand_descendants_tx(
            conn,
            &user.org_unit_ids,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::types::OrgUnitType;
    use std::sync::{Arc, Mutex};

    fn user(org_unit_ids: Vec<i64>, is_superuser: bool) -> User {
        User {
            id: 1,
            username: "piet".into(),
            display_name: "Piet".into(),
            email: "piet@example.org".into(),
            is_superuser,
            org_unit_ids,
            permissions: vec![],
        }
    }

    #[test]
    fn test_authorized_through_ancestor_and_cycle_detected() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let shared = Arc::new(Mutex::new(conn));
        let repo = OrgUnitRepository::from_connection(shared.clone());

        let root = repo.create("ROOT", OrgUnitType::Department, None).unwrap();
        let cluster = repo.create("CLUSTER", OrgUnitType::Cluster, Some(root)).unwrap();
        let team = repo.create("TEAM", OrgUnitType::Team, Some(cluster)).unwrap();
        let other = repo.create("OTHER", OrgUnitType::Team, None).unwrap();

        let conn = shared.lock().unwrap();
        let u = user(vec![cluster], false);
        assert!(OrgUnitAuthorizer::is_authorized_for_tx(&conn, &u, team).unwrap());
        assert!(OrgUnitAuthorizer::is_authorized_for_tx(&conn, &u, cluster).unwrap());
        assert!(!OrgUnitAuthorizer::is_authorized_for_tx(&conn, &u, root).unwrap());
        assert!(!OrgUnitAuthorizer::is_authorized_for_tx(&conn, &u, other).unwrap());
        assert!(OrgUnitAuthorizer::is_authorized_for_tx(&conn, &user(vec![], true), other).unwrap());

        let visible = OrgUnitAuthorizer::org_units_of_user_tx(&conn, &u).unwrap().unwrap();
        assert_eq!(visible.into_iter().collect::<Vec<_>>(), vec![cluster, team]);

        // 绕过写入校验直接制造环
        conn.execute(
            "UPDATE org_unit SET parent_org_unit_id = ?1 WHERE id = ?2",
            [team, root],
        )
        .unwrap();
        let err = OrgUnitAuthorizer::is_authorized_for_tx(&conn, &user(vec![other], false), team)
            .unwrap_err();
        assert!(matches!(err, EngineError::OrgUnitCycle(_)));
    }
}
