// ==========================================
// 合同数据登记系统 - 领域模型层
// ==========================================
// 职责: 定义实体、类型、计数值对象
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod contract;
pub mod interface_call;
pub mod messages;
pub mod reference;
pub mod types;
pub mod user;

// 重导出核心类型
pub use contract::{
    Contract, ContractField, ContractValues, FieldKind, StageContract, BUSINESS_CONTRACT_FIELDS,
};
pub use interface_call::{
    DataPerOrgUnit, InterfaceCall, InterfaceCallAggregate, RawData, RowCounters, UploadUser,
    RAW_DATA_FIELD_COUNT,
};
pub use reference::{
    DatasetKind, DatasetType, InterfaceDefinition, Mapping, OrganizationalUnit, System,
    CONTRACTEN, NEGOMETRIX,
};
pub use types::{Channel, InterfaceCallStatus, OrgUnitType, RowOutcome, RowStatus};
pub use user::User;
