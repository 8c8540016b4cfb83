// ==========================================
// 合同数据登记系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、配置和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{DatasetApi, RegistryApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{OrgUnitRepository, ReferenceRepository, UserRepository};

/// 应用状态
///
/// 所有仓储与 API 共享同一个数据库连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 上传/激活 API
    pub registry_api: Arc<RegistryApi<ConfigManager>>,

    /// 数据集查询 API
    pub dataset_api: Arc<DatasetApi>,

    /// 静态参考数据仓储
    pub reference_repo: Arc<ReferenceRepository>,

    /// 组织单元仓储
    pub org_unit_repo: Arc<OrgUnitRepository>,

    /// 用户仓储
    pub user_repo: Arc<UserRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化配置管理器与仓储
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        Self::from_connection(db_path, Arc::new(Mutex::new(conn)))
    }

    /// 使用已打开（且已建表）的连接创建
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        Ok(Self {
            registry_api: Arc::new(RegistryApi::new(conn.clone(), config.clone())),
            dataset_api: Arc::new(DatasetApi::new(conn.clone())),
            reference_repo: Arc::new(ReferenceRepository::from_connection(conn.clone())),
            org_unit_repo: Arc::new(OrgUnitRepository::from_connection(conn.clone())),
            user_repo: Arc::new(UserRepository::from_connection(conn.clone())),
            config,
            conn,
            db_path,
        })
    }
}

/// 获取默认数据库路径
///
/// 顺序: 环境变量 CONTRACT_REGISTRY_DB_PATH → 用户数据目录 → ./contract_registry.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("CONTRACT_REGISTRY_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./contract_registry.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("contract-registry");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("contract_registry.db");
        }
    }
    path.to_string_lossy().to_string()
}
