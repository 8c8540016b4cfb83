// ==========================================
// 合同数据登记系统 - API层错误类型
// ==========================================
// 职责: 将 Repository / Import / Engine 错误转换为面向操作员的错误
// 每个错误带稳定的机器码（ApiError::code），便于调用方分支处理
// ==========================================

use crate::engine::error::EngineError;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 文件级错误
    // ==========================================
    #[error("{0}")]
    FileFormat(String),

    #[error("{0}")]
    FileDefinition(String),

    #[error("{0}")]
    UnrecognizedFile(String),

    // ==========================================
    // 激活错误（状态未改变）
    // ==========================================
    #[error("{0}")]
    OtherActiveDataset(String),

    #[error("{0}")]
    DuplicateKey(String),

    // ==========================================
    // 业务/输入错误
    // ==========================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    // ==========================================
    // 配置/完整性错误（部署缺陷）
    // ==========================================
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Database transaction failed: {0}")]
    DatabaseTransactionError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定机器码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::FileFormat(_) => "FILE_FORMAT",
            ApiError::FileDefinition(_) => "FILE_DEFINITION",
            ApiError::UnrecognizedFile(_) => "UNRECOGNIZED_FILE",
            ApiError::OtherActiveDataset(_) => "OTHER_ACTIVE_DATASET",
            ApiError::DuplicateKey(_) => "DUPLICATE_KEY",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ConstraintViolation(_) => "CONSTRAINT_VIOLATION",
            ApiError::Configuration(_) => "CONFIGURATION",
            ApiError::Integrity(_) => "INTEGRITY",
            ApiError::DatabaseError(_) => "DATABASE",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION",
            ApiError::Other(_) => "INTERNAL",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("database lock failed: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg)
            | RepositoryError::ForeignKeyViolation(msg) => ApiError::ConstraintViolation(msg),
            RepositoryError::IntegrityError(msg) => ApiError::Integrity(msg),
            RepositoryError::ValidationError(msg) => ApiError::InvalidInput(msg),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            e @ EngineError::OtherActiveDataPerOrgUnit { .. } => {
                ApiError::OtherActiveDataset(e.to_string())
            }
            e @ EngineError::DuplicateKey { .. } => ApiError::DuplicateKey(e.to_string()),
            EngineError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            e @ (EngineError::SystemNotRegistered(_)
            | EngineError::DatasetTypeNotRegistered(_)
            | EngineError::InterfaceDefinitionNotRegistered { .. }
            | EngineError::UnsupportedDatasetType(_)) => ApiError::Configuration(e.to_string()),
            e @ (EngineError::Integrity(_) | EngineError::OrgUnitCycle(_)) => {
                ApiError::Integrity(e.to_string())
            }
            EngineError::Repository(e) => e.into(),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            e @ ImportError::FileFormat(_) => ApiError::FileFormat(e.to_string()),
            e @ ImportError::FileDefinition(_) => ApiError::FileDefinition(e.to_string()),
            ImportError::UnrecognizedFile(msg) => ApiError::UnrecognizedFile(msg),
            e @ ImportError::Config(_) => ApiError::Configuration(e.to_string()),
            ImportError::Repository(e) => e.into(),
            ImportError::Engine(e) => e.into(),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_errors_keep_operator_text() {
        let err: ApiError = EngineError::OtherActiveDataPerOrgUnit {
            id: 7,
            dataset_type_name: "Contracten".to_string(),
            org_unit_name: "IAAS".to_string(),
        }
        .into();
        assert_eq!(err.code(), "OTHER_ACTIVE_DATASET");
        assert!(err.to_string().contains("IAAS"));
        assert!(err.to_string().contains("Contracten"));
    }

    #[test]
    fn test_nested_repository_error_is_flattened() {
        let err: ApiError =
            ImportError::Engine(EngineError::Repository(RepositoryError::not_found("InterfaceCall", 3)))
                .into();
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.to_string(), "Not found: InterfaceCall(id=3)");
    }

    #[test]
    fn test_cycle_is_integrity() {
        let err: ApiError = EngineError::OrgUnitCycle(4).into();
        assert_eq!(err.code(), "INTEGRITY");
    }
}
