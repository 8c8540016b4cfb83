// ==========================================
// 合同数据登记系统 - 用户
// ==========================================
// 用户直属组织单元 + 权限名（权限名与 InterfaceDefinition.name 匹配即“我负责的”）
// ==========================================

use crate::domain::interface_call::UploadUser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub is_superuser: bool,
    pub org_unit_ids: Vec<i64>,
    pub permissions: Vec<String>,
}

impl User {
    /// 上传时写入 InterfaceCall 的用户快照
    pub fn snapshot(&self) -> UploadUser {
        let name = if self.display_name.trim().is_empty() {
            self.username.clone()
        } else {
            self.display_name.clone()
        };
        UploadUser {
            user_id: Some(self.id),
            username: Some(name),
            user_email: Some(self.email.clone()),
        }
    }
}
