// ==========================================
// 合同数据登记系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 上传 → 暂存 → 按组织单元激活（每个组织单元/数据集类型至多一个激活数据集）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 解析/授权/激活
pub mod engine;

// 导入层 - 上传文件
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{Channel, InterfaceCallStatus, OrgUnitType, RowOutcome, RowStatus};

// 领域实体
pub use domain::{
    Contract, ContractField, DataPerOrgUnit, InterfaceCall, InterfaceCallAggregate,
    OrganizationalUnit, StageContract, User,
};

// 引擎
pub use engine::{ActivationEngine, EngineError, InterfaceDefinitionResolver, OrgUnitAuthorizer};

// 导入
pub use importer::{ContractUploadService, ImportError, IngestionPipeline, UploadOutcome};

// API
pub use api::{ApiError, DatasetApi, DatasetFilter, RegistryApi};

/// 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用名称
pub const APP_NAME: &str = "合同数据登记系统";
