// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、静态参考数据、组织单元/用户构造、CSV 上传文件
// ==========================================

#![allow(dead_code)]

use contract_registry::app::{seed_reference_data, SeededReference};
use contract_registry::config::ConfigManager;
use contract_registry::db::{init_schema, open_sqlite_connection};
use contract_registry::domain::types::OrgUnitType;
use contract_registry::domain::user::User;
use contract_registry::repository::{OrgUnitRepository, ReferenceRepository, UserRepository};
use rusqlite::Connection;
use std::error::Error;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// 简化版 Negometrix 表头（必填表头 + 分类 + 名称 + 日期 + 金额）
pub const CONTRACT_HEADER: &str =
    "Contract nr.,Contract status,Categorie,Naam contract,Startdatum contract,Gecontracteerde waarde";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<Mutex<Connection>>: 共享连接
pub fn create_test_db() -> Result<(NamedTempFile, Arc<Mutex<Connection>>), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;

    Ok((temp_file, Arc::new(Mutex::new(conn))))
}

/// Negometrix / Contracten / Upload 定义
pub fn seed_reference(conn: &Arc<Mutex<Connection>>) -> SeededReference {
    let repo = ReferenceRepository::from_connection(conn.clone());
    seed_reference_data(&repo).expect("seed reference data")
}

pub fn config(conn: &Arc<Mutex<Connection>>) -> Arc<ConfigManager> {
    Arc::new(ConfigManager::from_connection(conn.clone()).expect("config manager"))
}

/// 测试组织树:
/// CIO (DEPARTMENT)
/// ├── IAAS (TEAM)
/// ├── EUS (TEAM)
/// └── SITES (TEAM)
pub struct TestOrg {
    pub cio: i64,
    pub iaas: i64,
    pub eus: i64,
    pub sites: i64,
}

/// 建组织树，并为每个团队建同名映射
pub fn build_org(conn: &Arc<Mutex<Connection>>, seeded: &SeededReference) -> TestOrg {
    let org_repo = OrgUnitRepository::from_connection(conn.clone());
    let ref_repo = ReferenceRepository::from_connection(conn.clone());

    let cio = org_repo.create("CIO", OrgUnitType::Department, None).unwrap();
    let iaas = org_repo.create("IAAS", OrgUnitType::Team, Some(cio)).unwrap();
    let eus = org_repo.create("EUS", OrgUnitType::Team, Some(cio)).unwrap();
    let sites = org_repo.create("SITES", OrgUnitType::Team, Some(cio)).unwrap();

    for (name, id) in [("IAAS", iaas), ("EUS", eus), ("SITES", sites)] {
        ref_repo.create_mapping(name, seeded.system_id, id).unwrap();
    }

    TestOrg {
        cio,
        iaas,
        eus,
        sites,
    }
}

/// 创建用户并返回完整加载的 User
pub fn add_user(
    conn: &Arc<Mutex<Connection>>,
    username: &str,
    is_superuser: bool,
    org_unit_ids: &[i64],
    permissions: &[&str],
) -> User {
    let repo = UserRepository::from_connection(conn.clone());
    let id = repo
        .create(username, &format!("{} (test)", username), &format!("{}@example.org", username), is_superuser)
        .unwrap();
    for org_unit_id in org_unit_ids {
        repo.add_org_unit(id, *org_unit_id).unwrap();
    }
    for permission in permissions {
        repo.add_permission(id, permission).unwrap();
    }
    repo.find_by_id(id).unwrap().unwrap()
}

/// 写临时 CSV 上传文件（首行为表头），"" 写出真正的空行
pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("contracts_")
        .suffix(".csv")
        .tempfile()
        .unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file.flush().unwrap();
    file
}

/// 标准合同文件: 表头 + 每个 (合同号, 分类) 一行
pub fn write_contract_csv(rows: &[(&str, &str)]) -> NamedTempFile {
    let mut lines = vec![CONTRACT_HEADER.to_string()];
    for (contract_nr, category) in rows {
        lines.push(format!(
            "{},Actief,{},Contract {},2024-01-01,1000",
            contract_nr, category, contract_nr
        ));
    }
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_csv(&refs)
}
