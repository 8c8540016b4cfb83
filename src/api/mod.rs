// ==========================================
// 合同数据登记系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 CLI 与外部调用方使用
// ==========================================

pub mod dataset_api;
pub mod error;
pub mod registry_api;

// 重导出核心类型
pub use dataset_api::{DatasetApi, DatasetFilter};
pub use error::{ApiError, ApiResult};
pub use registry_api::{InterfaceCallDetail, RegistryApi};
