// ==========================================
// 合同数据登记系统 - 数据集查询 API
// ==========================================
// 职责: "用户可见的全部数据集" + 过滤谓词组合
// 可见范围: 用户直属组织单元及其全部下级（超级用户不限）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::user::User;
use crate::engine::authorization::OrgUnitAuthorizer;
use crate::repository::{DatasetQueryRepository, DatasetRecord};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

// ==========================================
// DatasetFilter - 过滤条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetFilter {
    /// None = 不按激活状态过滤
    pub active: Option<bool>,
    pub system: Option<String>,
    pub dataset_type: Option<String>,
    /// 只看接口定义名在用户权限内的数据集
    pub my_responsibility: bool,
}

impl DatasetFilter {
    /// 解析文本参数
    ///
    /// 支持: `active=true|false`, `system=<name>`, `dataset_type=<name>`, `responsibility=user`
    /// 未知键/值记录警告后忽略
    pub fn from_params(params: &[(&str, &str)]) -> Self {
        let mut filter = DatasetFilter::default();
        for (key, value) in params {
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "active" => match value.to_ascii_lowercase().as_str() {
                    "true" => filter.active = Some(true),
                    "false" => filter.active = Some(false),
                    _ => warn!(key = *key, value, "无法识别的过滤值，已忽略"),
                },
                "system" if !value.is_empty() => filter.system = Some(value.to_string()),
                "dataset_type" if !value.is_empty() => {
                    filter.dataset_type = Some(value.to_string())
                }
                "responsibility" => {
                    if value.eq_ignore_ascii_case("user") {
                        filter.my_responsibility = true;
                    } else {
                        warn!(key = *key, value, "无法识别的过滤值，已忽略");
                    }
                }
                _ => warn!(key = *key, value, "未知的过滤参数，已忽略"),
            }
        }
        filter
    }

    /// 单条数据集是否满足过滤条件
    pub fn matches(&self, record: &DatasetRecord, user: &User) -> bool {
        if let Some(active) = self.active {
            if record.active != active {
                return false;
            }
        }
        if let Some(system) = &self.system {
            if record.system_name.as_deref() != Some(system.as_str()) {
                return false;
            }
        }
        if let Some(dataset_type) = &self.dataset_type {
            if record.dataset_type_name.as_deref() != Some(dataset_type.as_str()) {
                return false;
            }
        }
        if self.my_responsibility {
            let responsible = record
                .interface_definition_name
                .as_ref()
                .map(|name| user.permissions.iter().any(|p| p == name))
                .unwrap_or(false);
            if !responsible {
                return false;
            }
        }
        true
    }
}

// ==========================================
// DatasetApi
// ==========================================
pub struct DatasetApi {
    conn: Arc<Mutex<Connection>>,
    query_repo: DatasetQueryRepository,
}

impl DatasetApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            query_repo: DatasetQueryRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// 用户可见且满足过滤条件的数据集
    pub fn datasets_for_user(
        &self,
        user: &User,
        filter: &DatasetFilter,
    ) -> ApiResult<Vec<DatasetRecord>> {
        let visible = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| ApiError::DatabaseError(format!("database lock failed: {}", e)))?;
            OrgUnitAuthorizer::org_units_of_user_tx(&conn, user)?
        };

        let datasets: Vec<DatasetRecord> = self
            .query_repo
            .list_all()?
            .into_iter()
            .filter(|record| {
                visible
                    .as_ref()
                    .map_or(true, |units| units.contains(&record.org_unit_id))
            })
            .filter(|record| filter.matches(record, user))
            .collect();

        debug!(user = %user.username, count = datasets.len(), ?filter, "数据集查询");
        Ok(datasets)
    }
}
