// ==========================================
// 合同数据登记系统 - 引擎层
// ==========================================
// 职责: 接口定义解析、组织单元授权、数据集激活状态机
// 红线: 每个激活/停用操作在单个事务内完成，失败整体回滚
// ==========================================

pub mod activation;
pub mod authorization;
pub mod error;
pub mod resolver;

// 重导出核心引擎
pub use activation::{
    plan_transition, ActivationCommand, ActivationEngine, TransitionPlan, TransitionReport,
};
pub use authorization::OrgUnitAuthorizer;
pub use error::{EngineError, EngineResult};
pub use resolver::InterfaceDefinitionResolver;
