// ==========================================
// 合同数据登记系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// UNIQUE / FOREIGN KEY 失败单独分类，供激活引擎识别重复键
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据完整性错误 =====
    #[error("数据完整性错误: {0}")]
    IntegrityError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            // 列值无法还原为领域枚举 = 库中数据损坏
            rusqlite::Error::FromSqlConversionFailure(_, _, inner) => {
                RepositoryError::IntegrityError(inner.to_string())
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_conversion_failure_is_integrity_error() {
        let err: RepositoryError = rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            "未知的接口调用状态: BOGUS".into(),
        )
        .into();
        match err {
            RepositoryError::IntegrityError(msg) => assert!(msg.contains("BOGUS"), "{}", msg),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unique_failure_is_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (k TEXT UNIQUE); INSERT INTO t VALUES ('41');")
            .unwrap();
        let err: RepositoryError = conn
            .execute("INSERT INTO t VALUES ('41')", [])
            .unwrap_err()
            .into();
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => {
                assert!(msg.contains("t.k"), "{}", msg)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
