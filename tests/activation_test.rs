// ==========================================
// 激活引擎集成测试
// ==========================================
// 测试目标: 每个 (组织单元, 数据集类型) 至多一个激活 DPOU
// 级联/非级联激活、重复键回滚、幂等、往返
// ==========================================

mod test_helpers;

use contract_registry::api::{ApiError, RegistryApi};
use contract_registry::config::ConfigManager;
use contract_registry::domain::interface_call::DataPerOrgUnit;
use contract_registry::domain::types::InterfaceCallStatus;
use contract_registry::domain::user::User;
use contract_registry::engine::{ActivationEngine, EngineError, TransitionReport};
use contract_registry::logging;
use contract_registry::repository::error::RepositoryError;
use contract_registry::repository::{
    ContractRepository, DataPerOrgUnitRepository, InterfaceCallRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

struct Fixture {
    _db: NamedTempFile,
    conn: Arc<Mutex<Connection>>,
    org: test_helpers::TestOrg,
    admin: User,
    api: RegistryApi<ConfigManager>,
    engine: ActivationEngine,
    seeded: contract_registry::app::SeededReference,
}

impl Fixture {
    fn new() -> Self {
        logging::init_test();
        let (db, conn) = test_helpers::create_test_db().unwrap();
        let seeded = test_helpers::seed_reference(&conn);
        let org = test_helpers::build_org(&conn, &seeded);
        let admin = test_helpers::add_user(&conn, "admin", true, &[], &[]);
        let api = RegistryApi::new(conn.clone(), test_helpers::config(&conn));
        let engine = ActivationEngine::new(conn.clone());
        Fixture {
            _db: db,
            conn,
            org,
            admin,
            api,
            engine,
            seeded,
        }
    }

    /// 上传 (合同号, 分类) 行，返回调用 id
    fn upload(&self, rows: &[(&str, &str)]) -> i64 {
        let file = test_helpers::write_contract_csv(rows);
        let outcome = self.api.upload_file(file.path(), &self.admin).unwrap();
        assert_eq!(outcome.status, InterfaceCallStatus::Ok);
        outcome.interface_call_id
    }

    fn units(&self, call_id: i64) -> Vec<DataPerOrgUnit> {
        DataPerOrgUnitRepository::from_connection(self.conn.clone())
            .list_by_call(call_id)
            .unwrap()
    }

    fn unit_for(&self, call_id: i64, org_unit_id: i64) -> DataPerOrgUnit {
        self.units(call_id)
            .into_iter()
            .find(|u| u.org_unit_id == org_unit_id)
            .unwrap()
    }

    fn call_status(&self, call_id: i64) -> InterfaceCallStatus {
        InterfaceCallRepository::from_connection(self.conn.clone())
            .find_by_id(call_id)
            .unwrap()
            .unwrap()
            .status
    }

    fn contracts(&self) -> ContractRepository {
        ContractRepository::from_connection(self.conn.clone())
    }

    fn active_count(&self, org_unit_id: i64) -> i64 {
        DataPerOrgUnitRepository::from_connection(self.conn.clone())
            .count_active(org_unit_id, self.seeded.dataset_type_id)
            .unwrap()
    }
}

// ==========================================
// 测试用例
// ==========================================

#[test]
fn test_cascading_call_activation_replaces_previous_upload() {
    let f = Fixture::new();

    // A: IAAS + EUS，已激活
    let call_a = f.upload(&[("1", "IAAS"), ("2", "EUS")]);
    f.api.activate_interface_call(call_a, false).unwrap();
    assert_eq!(f.call_status(call_a), InterfaceCallStatus::Active);
    assert!(f.units(call_a).iter().all(|u| u.active));
    assert_eq!(f.contracts().count_all().unwrap(), 2);

    // B: IAAS + SITES，级联激活
    let call_b = f.upload(&[("3", "IAAS"), ("4", "SITES")]);
    let report = f.api.activate_interface_call(call_b, true).unwrap();

    // A 整体停用（包括与 B 无冲突的 EUS）
    assert_eq!(f.call_status(call_a), InterfaceCallStatus::Inactive);
    assert!(f.units(call_a).iter().all(|u| !u.active));
    // B 完全激活
    assert_eq!(f.call_status(call_b), InterfaceCallStatus::Active);
    assert!(f.units(call_b).iter().all(|u| u.active));

    assert_eq!(report.deactivated_units.len(), 2);
    assert_eq!(report.activated_units.len(), 2);
    assert!(report
        .call_status_changes
        .contains(&(call_a, InterfaceCallStatus::Inactive)));
    assert!(report
        .call_status_changes
        .contains(&(call_b, InterfaceCallStatus::Active)));

    // 业务表只剩 B 的合同
    let nrs: Vec<String> = f
        .contracts()
        .list_by_call(call_b)
        .unwrap()
        .iter()
        .filter_map(|c| c.values.get(contract_registry::ContractField::ContractNr).map(str::to_string))
        .collect();
    assert_eq!(nrs, vec!["3".to_string(), "4".to_string()]);
    assert_eq!(f.contracts().count_all().unwrap(), 2);

    for org_unit_id in [f.org.iaas, f.org.eus, f.org.sites] {
        assert!(f.active_count(org_unit_id) <= 1);
    }
}

#[test]
fn test_non_cascading_activation_conflict_changes_nothing() {
    let f = Fixture::new();

    let call_a = f.upload(&[("1", "IAAS")]);
    let call_b = f.upload(&[("2", "IAAS")]);
    let dpou_a = f.unit_for(call_a, f.org.iaas);
    let dpou_b = f.unit_for(call_b, f.org.iaas);

    f.engine.activate_dpou(dpou_a.id, false).unwrap();

    let err = f.engine.activate_dpou(dpou_b.id, false).unwrap_err();
    match &err {
        EngineError::OtherActiveDataPerOrgUnit {
            id,
            dataset_type_name,
            org_unit_name,
        } => {
            assert_eq!(*id, dpou_b.id);
            assert_eq!(dataset_type_name, "Contracten");
            assert_eq!(org_unit_name, "IAAS");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(f.unit_for(call_a, f.org.iaas).active);
    assert!(!f.unit_for(call_b, f.org.iaas).active);
    assert_eq!(f.call_status(call_a), InterfaceCallStatus::Active);
    assert_eq!(f.call_status(call_b), InterfaceCallStatus::Ok);
    assert_eq!(f.contracts().count_by_dpou(dpou_b.id).unwrap(), 0);

    // 通过 API 时带稳定错误码
    let api_err = f.api.activate_dpou(dpou_b.id, false).unwrap_err();
    assert_eq!(api_err.code(), "OTHER_ACTIVE_DATASET");
}

#[test]
fn test_non_cascading_call_activation_rolls_back_on_conflict() {
    let f = Fixture::new();

    let call_a = f.upload(&[("1", "IAAS")]);
    f.api.activate_interface_call(call_a, false).unwrap();

    // B 的 EUS 无冲突、IAAS 冲突: 整体回滚，EUS 也不激活
    let call_b = f.upload(&[("2", "EUS"), ("3", "IAAS")]);
    let err = f.api.activate_interface_call(call_b, false).unwrap_err();
    assert!(matches!(err, ApiError::OtherActiveDataset(_)));

    assert!(f.units(call_b).iter().all(|u| !u.active));
    assert_eq!(f.call_status(call_b), InterfaceCallStatus::Ok);
    assert_eq!(f.contracts().count_all().unwrap(), 1);
}

#[test]
fn test_duplicate_contract_nr_rolls_back_activation() {
    let f = Fixture::new();

    let call = f.upload(&[("41", "IAAS"), ("41", "IAAS")]);
    let dpou = f.unit_for(call, f.org.iaas);
    assert_eq!(f.contracts().count_stage_by_dpou(dpou.id).unwrap(), 2);

    let err = f.engine.activate_dpou(dpou.id, true).unwrap_err();
    match &err {
        EngineError::DuplicateKey {
            table,
            seq_nr,
            field_name,
            value,
            description,
        } => {
            assert_eq!(table, "contract");
            assert_eq!(*seq_nr, 3);
            assert_eq!(field_name, "contract_nr");
            assert_eq!(value, "41");
            assert_eq!(description, "41: Contract 41");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    assert!(!f.unit_for(call, f.org.iaas).active);
    assert_eq!(f.call_status(call), InterfaceCallStatus::Ok);
    assert_eq!(f.contracts().count_by_dpou(dpou.id).unwrap(), 0);
    assert_eq!(f.contracts().count_all().unwrap(), 0);
}

#[test]
fn test_duplicate_key_restores_cascade_deactivated_call() {
    let f = Fixture::new();

    // A: IAAS + EUS，已激活
    let call_a = f.upload(&[("1", "IAAS"), ("2", "EUS")]);
    f.api.activate_interface_call(call_a, false).unwrap();

    // B: IAAS 下合同号重复；级联会先停用 A，再在复制时失败
    let call_b = f.upload(&[("41", "IAAS"), ("41", "IAAS")]);
    let err = f.api.activate_interface_call(call_b, true).unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_KEY");

    // A 的停用随事务一起回滚
    assert_eq!(f.call_status(call_a), InterfaceCallStatus::Active);
    assert!(f.units(call_a).iter().all(|u| u.active));
    assert_eq!(f.contracts().count_all().unwrap(), 2);
    for unit in f.units(call_a) {
        assert_eq!(f.contracts().count_by_dpou(unit.id).unwrap(), 1);
    }

    assert_eq!(f.call_status(call_b), InterfaceCallStatus::Ok);
    assert!(f.units(call_b).iter().all(|u| !u.active));
    assert_eq!(f.active_count(f.org.iaas), 1);
    assert_eq!(f.active_count(f.org.eus), 1);
}

#[test]
fn test_activation_is_idempotent() {
    let f = Fixture::new();

    let call = f.upload(&[("1", "IAAS"), ("2", "EUS")]);
    let iaas = f.unit_for(call, f.org.iaas);

    let first = f.engine.activate_dpou(iaas.id, false).unwrap();
    assert_eq!(first.activated_units, vec![iaas.id]);
    let again = f.engine.activate_dpou(iaas.id, false).unwrap();
    assert!(again.activated_units.is_empty());
    assert!(again.call_status_changes.is_empty());
    assert_eq!(f.contracts().count_by_dpou(iaas.id).unwrap(), 1);

    // 调用只部分激活
    let detail = f.api.interface_call_detail(call).unwrap();
    assert!(detail.aggregate.is_active());
    assert!(!detail.is_completely_active);
    assert!(!detail.is_completely_inactive);

    f.api.activate_interface_call(call, false).unwrap();
    let detail = f.api.interface_call_detail(call).unwrap();
    assert!(detail.is_completely_active);
    assert_eq!(detail.contracts.len(), 2);
    assert_eq!(detail.staged_contracts.len(), 2);

    // 已完全激活的调用再次激活为空操作
    let noop = f.api.activate_interface_call(call, true).unwrap();
    assert_eq!(noop, TransitionReport::default());

    // 停用已停用的 DPOU 也是空操作
    f.api.deactivate_interface_call(call).unwrap();
    let noop = f.engine.deactivate_dpou(iaas.id).unwrap();
    assert_eq!(noop, TransitionReport::default());
    let noop = f.api.deactivate_interface_call(call).unwrap();
    assert_eq!(noop, TransitionReport::default());
}

#[test]
fn test_activate_then_deactivate_round_trip_keeps_staged_rows() {
    let f = Fixture::new();

    let call = f.upload(&[("1", "IAAS"), ("2", "IAAS"), ("3", "IAAS")]);
    let dpou = f.unit_for(call, f.org.iaas);

    let report = f.engine.activate_dpou(dpou.id, false).unwrap();
    assert_eq!(report.business_rows_inserted, 3);
    assert_eq!(f.contracts().count_by_dpou(dpou.id).unwrap(), 3);

    let report = f.engine.deactivate_dpou(dpou.id).unwrap();
    assert_eq!(report.business_rows_deleted, 3);
    assert_eq!(f.contracts().count_by_dpou(dpou.id).unwrap(), 0);
    assert_eq!(f.contracts().count_stage_by_dpou(dpou.id).unwrap(), 3);

    // 可再次激活
    f.engine.activate_dpou(dpou.id, false).unwrap();
    assert_eq!(f.contracts().count_by_dpou(dpou.id).unwrap(), 3);
}

#[test]
fn test_deactivating_last_child_makes_call_inactive_in_any_order() {
    for reverse in [false, true] {
        let f = Fixture::new();
        let call = f.upload(&[("1", "IAAS"), ("2", "EUS"), ("3", "SITES")]);
        f.api.activate_interface_call(call, false).unwrap();

        let mut ids: Vec<i64> = f.units(call).iter().map(|u| u.id).collect();
        if reverse {
            ids.reverse();
        }
        let (last, rest) = ids.split_last().unwrap();
        for id in rest {
            f.api.deactivate_dpou(*id).unwrap();
            assert_eq!(f.call_status(call), InterfaceCallStatus::Active);
        }
        f.api.deactivate_dpou(*last).unwrap();
        assert_eq!(f.call_status(call), InterfaceCallStatus::Inactive);
        assert_eq!(f.contracts().count_all().unwrap(), 0);
    }
}

#[test]
fn test_cascading_dpou_activation_deactivates_whole_sibling_call() {
    let f = Fixture::new();

    let call_a = f.upload(&[("1", "IAAS"), ("2", "EUS")]);
    f.api.activate_interface_call(call_a, false).unwrap();

    let call_b = f.upload(&[("3", "IAAS")]);
    let dpou_b = f.unit_for(call_b, f.org.iaas);
    f.api.activate_dpou(dpou_b.id, true).unwrap();

    assert_eq!(f.call_status(call_a), InterfaceCallStatus::Inactive);
    assert!(!f.unit_for(call_a, f.org.eus).active);
    assert_eq!(f.call_status(call_b), InterfaceCallStatus::Active);
    assert_eq!(f.active_count(f.org.iaas), 1);
    assert_eq!(f.active_count(f.org.eus), 0);
}

#[test]
fn test_unknown_ids_are_not_found() {
    let f = Fixture::new();
    let err = f.api.activate_dpou(999, false).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = f.api.deactivate_interface_call(999).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[test]
fn test_unsupported_dataset_type_is_integrity_error() {
    let f = Fixture::new();
    let call = f.upload(&[("1", "IAAS")]);
    let dpou = f.unit_for(call, f.org.iaas);

    {
        let conn = f.conn.lock().unwrap();
        conn.execute(
            "UPDATE dataset_type SET name = 'Licenties' WHERE id = ?1",
            [f.seeded.dataset_type_id],
        )
        .unwrap();
    }

    let err = f.engine.activate_dpou(dpou.id, false).unwrap_err();
    assert!(matches!(err, EngineError::UnsupportedDatasetType(ref name) if name == "Licenties"));
    assert!(err.is_integrity());
    assert!(!f.unit_for(call, f.org.iaas).active);
}

#[test]
fn test_unknown_call_status_in_database_is_integrity_error() {
    let f = Fixture::new();
    let call = f.upload(&[("1", "IAAS")]);

    {
        let conn = f.conn.lock().unwrap();
        conn.execute(
            "UPDATE interface_call SET status = 'BOGUS' WHERE id = ?1",
            [call],
        )
        .unwrap();
    }

    let err = InterfaceCallRepository::from_connection(f.conn.clone())
        .find_by_id(call)
        .unwrap_err();
    assert!(matches!(err, RepositoryError::IntegrityError(ref msg) if msg.contains("BOGUS")));

    let err = f.api.activate_interface_call(call, true).unwrap_err();
    assert_eq!(err.code(), "INTEGRITY");
    assert!(!f.unit_for(call, f.org.iaas).active);
    assert_eq!(f.contracts().count_all().unwrap(), 0);
}
