// ==========================================
// 合同数据登记系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化; 多记录操作通过 *_tx 函数共享同一事务
// ==========================================

pub mod contract_repo;
pub mod dataset_query;
pub mod dpou_repo;
pub mod error;
pub mod interface_call_repo;
pub mod org_unit_repo;
pub mod raw_data_repo;
pub mod reference_repo;
pub mod user_repo;

// 重导出核心仓储
pub use contract_repo::ContractRepository;
pub use dataset_query::{DatasetQueryRepository, DatasetRecord};
pub use dpou_repo::{DataPerOrgUnitRepository, DpouDatasetType};
pub use error::{RepositoryError, RepositoryResult};
pub use interface_call_repo::InterfaceCallRepository;
pub use org_unit_repo::OrgUnitRepository;
pub use raw_data_repo::RawDataRepository;
pub use reference_repo::ReferenceRepository;
pub use user_repo::UserRepository;
