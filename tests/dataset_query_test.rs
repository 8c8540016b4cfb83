// ==========================================
// 数据集查询与组织树集成测试
// ==========================================
// 测试目标: 用户可见范围、过滤条件、组织树成环处理
// ==========================================

mod test_helpers;

use contract_registry::api::{DatasetApi, DatasetFilter, RegistryApi};
use contract_registry::app::NEGOMETRIX_UPLOAD_DEFINITION;
use contract_registry::domain::types::{InterfaceCallStatus, RowStatus};
use contract_registry::importer::ContractUploadService;
use contract_registry::repository::error::RepositoryError;
use contract_registry::repository::{InterfaceCallRepository, OrgUnitRepository, RawDataRepository};

#[test]
fn test_datasets_visible_per_user_and_filtered() {
    let (_db, conn) = test_helpers::create_test_db().unwrap();
    let seeded = test_helpers::seed_reference(&conn);
    let org = test_helpers::build_org(&conn, &seeded);

    let admin = test_helpers::add_user(&conn, "admin", true, &[], &[]);
    let jan = test_helpers::add_user(&conn, "jan", false, &[org.iaas], &[]);
    let manager = test_helpers::add_user(
        &conn,
        "manager",
        false,
        &[org.cio],
        &[NEGOMETRIX_UPLOAD_DEFINITION],
    );

    let registry = RegistryApi::new(conn.clone(), test_helpers::config(&conn));
    let first = test_helpers::write_contract_csv(&[("1", "IAAS"), ("2", "EUS")]);
    let second = test_helpers::write_contract_csv(&[("3", "SITES")]);
    let call_1 = registry.upload_file(first.path(), &admin).unwrap().interface_call_id;
    registry.upload_file(second.path(), &admin).unwrap();
    registry.activate_interface_call(call_1, false).unwrap();

    let api = DatasetApi::new(conn.clone());
    let all = DatasetFilter::default();

    let visible = api.datasets_for_user(&jan, &all).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].org_unit_name, "IAAS");
    assert_eq!(visible[0].system_name.as_deref(), Some("Negometrix"));
    assert_eq!(visible[0].dataset_type_name.as_deref(), Some("Contracten"));
    assert_eq!(visible[0].interface_call_status, InterfaceCallStatus::Active);

    assert_eq!(api.datasets_for_user(&manager, &all).unwrap().len(), 3);
    assert_eq!(api.datasets_for_user(&admin, &all).unwrap().len(), 3);

    let active = DatasetFilter::from_params(&[("active", "true")]);
    assert_eq!(api.datasets_for_user(&admin, &active).unwrap().len(), 2);
    let inactive = DatasetFilter::from_params(&[("active", "false")]);
    let rows = api.datasets_for_user(&admin, &inactive).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].org_unit_name, "SITES");

    let other_system = DatasetFilter::from_params(&[("system", "Topdesk")]);
    assert!(api.datasets_for_user(&admin, &other_system).unwrap().is_empty());
    let contracts = DatasetFilter::from_params(&[("system", "Negometrix"), ("dataset_type", "Contracten")]);
    assert_eq!(api.datasets_for_user(&admin, &contracts).unwrap().len(), 3);

    // "我负责的" = 接口定义名在用户权限内
    let mine = DatasetFilter::from_params(&[("responsibility", "user")]);
    assert_eq!(api.datasets_for_user(&manager, &mine).unwrap().len(), 3);
    assert!(api.datasets_for_user(&admin, &mine).unwrap().is_empty());
}

#[test]
fn test_registry_lists_calls_newest_first_with_raw_rows() {
    let (_db, conn) = test_helpers::create_test_db().unwrap();
    let seeded = test_helpers::seed_reference(&conn);
    test_helpers::build_org(&conn, &seeded);
    let admin = test_helpers::add_user(&conn, "admin", true, &[], &[]);

    let registry = RegistryApi::new(conn.clone(), test_helpers::config(&conn));
    let first = test_helpers::write_contract_csv(&[("1", "IAAS")]);
    let second = test_helpers::write_contract_csv(&[("2", "EUS"), ("3", "Onbekend")]);
    let call_1 = registry.upload_file(first.path(), &admin).unwrap().interface_call_id;
    let call_2 = registry.upload_file(second.path(), &admin).unwrap().interface_call_id;

    let calls = registry.list_interface_calls().unwrap();
    let ids: Vec<i64> = calls.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![call_2, call_1]);
    assert_eq!(calls[0].counters.rows_received, 3);

    let raw = registry.raw_data(call_2).unwrap();
    let summary: Vec<(i64, RowStatus)> = raw.iter().map(|r| (r.seq_nr, r.status)).collect();
    assert_eq!(
        summary,
        vec![(1, RowStatus::HeaderRow), (2, RowStatus::DataOk), (3, RowStatus::DataError)]
    );
    assert_eq!(raw[1].fields[0], "2");
    assert!(registry.raw_data(999).unwrap().is_empty());
}

#[test]
fn test_org_unit_cycle_rejected_at_write_time() {
    let (_db, conn) = test_helpers::create_test_db().unwrap();
    let seeded = test_helpers::seed_reference(&conn);
    let org = test_helpers::build_org(&conn, &seeded);
    let repo = OrgUnitRepository::from_connection(conn.clone());

    let err = repo.set_parent(org.cio, Some(org.iaas)).unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError(_)));
    let err = repo.set_parent(org.iaas, Some(org.iaas)).unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError(_)));

    // 合法的移动
    repo.set_parent(org.sites, Some(org.iaas)).unwrap();
    let descendants = repo.expand_descendants(&[org.iaas]).unwrap();
    assert!(descendants.contains(&org.sites));
    assert!(!descendants.contains(&org.eus));
}

#[test]
fn test_org_unit_cycle_at_read_time_aborts_ingestion() {
    let (_db, conn) = test_helpers::create_test_db().unwrap();
    let seeded = test_helpers::seed_reference(&conn);
    let org = test_helpers::build_org(&conn, &seeded);
    let user = test_helpers::add_user(&conn, "jan", false, &[org.sites], &[]);

    // 绕过写时校验直接制造环: CIO → IAAS → CIO
    {
        let guard = conn.lock().unwrap();
        guard
            .execute(
                "UPDATE org_unit SET parent_org_unit_id = ?1 WHERE id = ?2",
                [org.iaas, org.cio],
            )
            .unwrap();
    }

    let file = test_helpers::write_contract_csv(&[("1", "IAAS")]);
    let service = ContractUploadService::new(conn.clone(), test_helpers::config(&conn));
    let outcome = service.process_file(file.path(), &user).unwrap();

    assert_eq!(outcome.status, InterfaceCallStatus::Error);
    assert_eq!(
        outcome.message,
        format!("Reason: Org unit tree contains a cycle at org unit {}", org.iaas)
    );

    // 行写入整体回滚
    let raw = RawDataRepository::from_connection(conn.clone())
        .list_by_call(outcome.interface_call_id)
        .unwrap();
    assert!(raw.is_empty());
    let call = InterfaceCallRepository::from_connection(conn.clone())
        .find_by_id(outcome.interface_call_id)
        .unwrap()
        .unwrap();
    assert_eq!(call.counters.rows_received, 0);
}
