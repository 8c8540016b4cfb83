// ==========================================
// 合同数据登记系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 文本面向操作员（写入 InterfaceCall.message / API 返回）
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    // ===== 激活冲突（可恢复，状态未改变） =====
    #[error(
        "Dataset (id={id}) can not be activated: another dataset of type {dataset_type_name} \
         is still active for {org_unit_name}"
    )]
    OtherActiveDataPerOrgUnit {
        id: i64,
        dataset_type_name: String,
        org_unit_name: String,
    },

    // ===== 重复键（整个激活事务回滚） =====
    #[error(
        "Duplicate key in table: {table}, field: {field_name}, value: {value}, \
         source row {seq_nr}, description: {description}"
    )]
    DuplicateKey {
        table: String,
        seq_nr: i64,
        field_name: String,
        value: String,
        description: String,
    },

    // ===== 查找失败 =====
    #[error("{entity} not found: id={id}")]
    NotFound { entity: String, id: i64 },

    // ===== 静态数据缺失（配置错误） =====
    #[error("System '{0}' is not registered, add it to the static reference data")]
    SystemNotRegistered(String),

    #[error("Dataset type '{0}' is not registered, add it to the static reference data")]
    DatasetTypeNotRegistered(String),

    #[error(
        "No interface definition registered for system '{system}', dataset type '{dataset_type}' \
         and channel '{channel}'"
    )]
    InterfaceDefinitionNotRegistered {
        system: String,
        dataset_type: String,
        channel: String,
    },

    #[error("Dataset type '{0}' has no business table implementation")]
    UnsupportedDatasetType(String),

    // ===== 数据完整性错误（致命，不重试） =====
    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Org unit tree contains a cycle at org unit {0}")]
    OrgUnitCycle(i64),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    pub fn not_found(entity: &str, id: i64) -> Self {
        EngineError::NotFound {
            entity: entity.to_string(),
            id,
        }
    }

    /// 配置/完整性类错误（部署缺陷，需要人工处理）
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            EngineError::SystemNotRegistered(_)
                | EngineError::DatasetTypeNotRegistered(_)
                | EngineError::InterfaceDefinitionNotRegistered { .. }
                | EngineError::UnsupportedDatasetType(_)
                | EngineError::Integrity(_)
                | EngineError::OrgUnitCycle(_)
                | EngineError::Repository(RepositoryError::IntegrityError(_))
        )
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
