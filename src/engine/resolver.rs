// ==========================================
// 合同数据登记系统 - 接口定义解析器
// ==========================================
// 职责:
// - (系统名, 数据集类型名, 通道) → InterfaceDefinition（三种缺失各自报错）
// - (系统, 分类文本) → OrganizationalUnit（未映射返回 None，由调用方决定处理）
// 红线: Engine 不拼 SQL，通过 Repository 访问
// ==========================================

use crate::domain::reference::{InterfaceDefinition, OrganizationalUnit, System};
use crate::domain::types::Channel;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::{OrgUnitRepository, ReferenceRepository};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::error;

pub struct InterfaceDefinitionResolver {
    conn: Arc<Mutex<Connection>>,
}

impl InterfaceDefinitionResolver {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> EngineResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| EngineError::Repository(RepositoryError::LockError(e.to_string())))
    }

    pub fn resolve_interface_definition(
        &self,
        system_name: &str,
        dataset_type_name: &str,
        channel: Channel,
    ) -> EngineResult<InterfaceDefinition> {
        let conn = self.get_conn()?;
        Self::resolve_interface_definition_tx(&conn, system_name, dataset_type_name, channel)
    }

    /// # 返回
    /// - Err(SystemNotRegistered / DatasetTypeNotRegistered / InterfaceDefinitionNotRegistered)
    pub fn resolve_interface_definition_tx(
        conn: &Connection,
        system_name: &str,
        dataset_type_name: &str,
        channel: Channel,
    ) -> EngineResult<InterfaceDefinition> {
        let system = Self::resolve_system_tx(conn, system_name)?;

        let dataset_type = ReferenceRepository::find_dataset_type_by_name_tx(conn, dataset_type_name)?
            .ok_or_else(|| {
                error!(dataset_type = dataset_type_name, "数据集类型未登记");
                EngineError::DatasetTypeNotRegistered(dataset_type_name.to_string())
            })?;

        ReferenceRepository::find_interface_definition_tx(conn, system.id, dataset_type.id, channel)?
            .ok_or_else(|| {
                error!(
                    system = system_name,
                    dataset_type = dataset_type_name,
                    channel = %channel,
                    "接口定义未登记"
                );
                EngineError::InterfaceDefinitionNotRegistered {
                    system: system_name.to_string(),
                    dataset_type: dataset_type_name.to_string(),
                    channel: channel.to_string(),
                }
            })
    }

    pub fn resolve_system_tx(conn: &Connection, system_name: &str) -> EngineResult<System> {
        ReferenceRepository::find_system_by_name_tx(conn, system_name)?.ok_or_else(|| {
            error!(system = system_name, "系统未登记");
            EngineError::SystemNotRegistered(system_name.to_string())
        })
    }

    pub fn resolve_org_unit(
        &self,
        system: &System,
        mapping_name: &str,
    ) -> EngineResult<Option<OrganizationalUnit>> {
        let conn = self.get_conn()?;
        Self::resolve_org_unit_tx(&conn, system, mapping_name)
    }

    /// 分类文本精确匹配 Mapping（按系统隔离）
    pub fn resolve_org_unit_tx(
        conn: &Connection,
        system: &System,
        mapping_name: &str,
    ) -> EngineResult<Option<OrganizationalUnit>> {
        let Some(mapping) = ReferenceRepository::find_mapping_tx(conn, system.id, mapping_name)? else {
            return Ok(None);
        };
        let unit = OrgUnitRepository::find_by_id_tx(conn, mapping.org_unit_id)?.ok_or_else(|| {
            EngineError::Integrity(format!(
                "mapping '{}' points to missing org unit {}",
                mapping.name, mapping.org_unit_id
            ))
        })?;
        Ok(Some(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::types::OrgUnitType;

    fn setup() -> (Arc<Mutex<Connection>>, ReferenceRepository) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        (conn.clone(), ReferenceRepository::from_connection(conn))
    }

    #[test]
    fn test_three_distinct_not_registered_errors() {
        let (conn, refs) = setup();
        let resolver = InterfaceDefinitionResolver::new(conn);

        let err = resolver
            .resolve_interface_definition("Negometrix", "Contracten", Channel::Upload)
            .unwrap_err();
        assert!(matches!(err, EngineError::SystemNotRegistered(_)));

        let system_id = refs.create_system("Negometrix", "").unwrap();
        let err = resolver
            .resolve_interface_definition("Negometrix", "Contracten", Channel::Upload)
            .unwrap_err();
        assert!(matches!(err, EngineError::DatasetTypeNotRegistered(_)));

        let dt_id = refs.create_dataset_type("Contracten", "").unwrap();
        let err = resolver
            .resolve_interface_definition("Negometrix", "Contracten", Channel::Upload)
            .unwrap_err();
        assert!(matches!(err, EngineError::InterfaceDefinitionNotRegistered { .. }));
        assert!(err.is_integrity());

        refs.create_interface_definition("negometrix_upload", "", Channel::Upload, system_id, dt_id)
            .unwrap();
        let def = resolver
            .resolve_interface_definition("Negometrix", "Contracten", Channel::Upload)
            .unwrap();
        assert_eq!(def.system_id, system_id);
        assert_eq!(def.dataset_type_id, dt_id);
    }

    #[test]
    fn test_resolve_org_unit_exact_match_scoped_by_system() {
        let (conn, refs) = setup();
        let org_units = OrgUnitRepository::from_connection(conn.clone());
        let resolver = InterfaceDefinitionResolver::new(conn);

        let negometrix = refs.create_system("Negometrix", "").unwrap();
        let other = refs.create_system("Other", "").unwrap();
        let iaas = org_units.create("IAAS", OrgUnitType::Team, None).unwrap();
        refs.create_mapping("Cloud services", negometrix, iaas).unwrap();

        let system = System { id: negometrix, name: "Negometrix".into(), description: String::new() };
        let unit = resolver.resolve_org_unit(&system, "Cloud services").unwrap().unwrap();
        assert_eq!(unit.id, iaas);
        assert!(resolver.resolve_org_unit(&system, "cloud services").unwrap().is_none());

        let other_system = System { id: other, name: "Other".into(), description: String::new() };
        assert!(resolver.resolve_org_unit(&other_system, "Cloud services").unwrap().is_none());
    }
}
