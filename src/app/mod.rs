// ==========================================
// 合同数据登记系统 - 应用层
// ==========================================
// 职责: 组装共享连接、配置与 API，供 CLI 使用
// ==========================================

pub mod seed;
pub mod state;

// 重导出
pub use seed::{seed_reference_data, SeededReference, NEGOMETRIX_UPLOAD_DEFINITION};
pub use state::{get_default_db_path, AppState};
