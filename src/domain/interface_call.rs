// ==========================================
// 合同数据登记系统 - 接口调用与组织数据
// ==========================================
// InterfaceCall → DataPerOrgUnit → 暂存/业务记录 三层结构
// ==========================================

use crate::domain::types::{InterfaceCallStatus, RowStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// RawData 的固定通用字段数
pub const RAW_DATA_FIELD_COUNT: usize = 50;

// ==========================================
// RowCounters - 单次导入的行计数
// ==========================================
// 每次导入新建，导入结束时写回 InterfaceCall
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounters {
    pub rows_received: i64,
    pub data_rows_received: i64,
    pub empty_rows: i64,
    pub header_rows: i64,
    pub data_rows_ok: i64,
    pub data_rows_warning: i64,
    pub data_rows_error: i64,
    pub data_rows_ignored: i64,
}

impl RowCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按行状态累加
    pub fn record(&mut self, status: RowStatus) {
        self.rows_received += 1;
        if status.is_data() {
            self.data_rows_received += 1;
        }
        match status {
            RowStatus::HeaderRow => self.header_rows += 1,
            RowStatus::EmptyRow => self.empty_rows += 1,
            RowStatus::DataOk => self.data_rows_ok += 1,
            RowStatus::DataWarning => self.data_rows_warning += 1,
            RowStatus::DataError => self.data_rows_error += 1,
            RowStatus::DataIgnored => self.data_rows_ignored += 1,
        }
    }
}

// ==========================================
// UploadUser - 上传用户快照
// ==========================================
// 冗余保存姓名/邮箱，账户删除后仍可追溯
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadUser {
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub user_email: Option<String>,
}

// ==========================================
// InterfaceCall - 一次上传/API 调用
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceCall {
    pub id: i64,
    pub date_time_creation: NaiveDateTime,
    pub filename: String,
    pub status: InterfaceCallStatus,
    pub message: String,
    pub counters: RowCounters,
    pub interface_definition_id: Option<i64>,
    pub user: UploadUser,
}

impl InterfaceCall {
    /// 只有 ACTIVE 才算激活（OK 等其他状态都不算）
    pub fn is_active(&self) -> bool {
        self.status == InterfaceCallStatus::Active
    }
}

// ==========================================
// DataPerOrgUnit - 激活单元（调用 × 组织单元）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPerOrgUnit {
    pub id: i64,
    pub interface_call_id: i64,
    pub org_unit_id: i64,
    pub number_of_data_rows_ok: i64,
    pub number_of_data_rows_warning: i64,
    pub active: bool,
}

// ==========================================
// RawData - 逐行审计记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawData {
    pub id: i64,
    pub interface_call_id: i64,
    pub seq_nr: i64,
    pub status: RowStatus,
    pub message: Option<String>,
    pub fields: Vec<String>,
}

impl RawData {
    /// 缺失单元格替换为空串，并补齐到 50 列
    pub fn pad_fields(row_values: &[Option<String>]) -> Vec<String> {
        let mut values: Vec<String> = row_values
            .iter()
            .take(RAW_DATA_FIELD_COUNT)
            .map(|v| v.clone().unwrap_or_default())
            .collect();
        values.resize(RAW_DATA_FIELD_COUNT, String::new());
        values
    }
}

// ==========================================
// InterfaceCallAggregate - 调用及其全部 DPOU
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceCallAggregate {
    pub call: InterfaceCall,
    pub units: Vec<DataPerOrgUnit>,
}

impl InterfaceCallAggregate {
    pub fn is_active(&self) -> bool {
        self.call.is_active()
    }

    pub fn active_unit_count(&self) -> usize {
        self.units.iter().filter(|u| u.active).count()
    }

    /// 调用为 ACTIVE 且所有 DPOU 都激活
    pub fn is_completely_active(&self) -> bool {
        self.is_active() && self.units.iter().all(|u| u.active)
    }

    /// 调用非 ACTIVE 且所有 DPOU 都未激活
    pub fn is_completely_inactive(&self) -> bool {
        !self.is_active() && self.units.iter().all(|u| !u.active)
    }

    pub fn unit(&self, dpou_id: i64) -> Option<&DataPerOrgUnit> {
        self.units.iter().find(|u| u.id == dpou_id)
    }

    pub fn org_unit_ids(&self) -> Vec<i64> {
        self.units.iter().map(|u| u.org_unit_id).collect()
    }

    pub fn unit_for_org_unit(&self, org_unit_id: i64) -> Option<&DataPerOrgUnit> {
        self.units.iter().find(|u| u.org_unit_id == org_unit_id)
    }
}
