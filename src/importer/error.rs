// ==========================================
// 合同数据登记系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 只包含文件级（致命）错误；行级错误记录在 RawData/StageContract 上
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件级错误 =====
    #[error("File format error: {0}")]
    FileFormat(String),

    #[error("File definition error: {0}")]
    FileDefinition(String),

    #[error("{0}")]
    UnrecognizedFile(String),

    // ===== 配置错误 =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== 下层错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl ImportError {
    /// 是否为文件级错误（扩展名/内容/表头）
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            ImportError::FileFormat(_) | ImportError::FileDefinition(_) | ImportError::UnrecognizedFile(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileFormat(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Repository(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::FileFormat(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::FileFormat(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
