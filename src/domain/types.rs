// ==========================================
// 合同数据登记系统 - 领域类型定义
// ==========================================
// 职责: 状态枚举、接口通道、组织类型、行处理结果
// 存储格式: SCREAMING_SNAKE_CASE 字符串（与数据库一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 接口调用状态 (InterfaceCall Status)
// ==========================================
// 激活引擎只关心 ACTIVE / INACTIVE / READY_LOADING
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterfaceCallStatus {
    New,
    Loading,
    Error,
    Ok,
    ReadyLoading,
    Active,
    Inactive,
}

impl fmt::Display for InterfaceCallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl InterfaceCallStatus {
    /// 从数据库字符串解析；未知值返回 None，由仓储层报完整性错误
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Some(InterfaceCallStatus::New),
            "LOADING" => Some(InterfaceCallStatus::Loading),
            "ERROR" => Some(InterfaceCallStatus::Error),
            "OK" => Some(InterfaceCallStatus::Ok),
            "READY_LOADING" => Some(InterfaceCallStatus::ReadyLoading),
            "ACTIVE" => Some(InterfaceCallStatus::Active),
            "INACTIVE" => Some(InterfaceCallStatus::Inactive),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            InterfaceCallStatus::New => "NEW",
            InterfaceCallStatus::Loading => "LOADING",
            InterfaceCallStatus::Error => "ERROR",
            InterfaceCallStatus::Ok => "OK",
            InterfaceCallStatus::ReadyLoading => "READY_LOADING",
            InterfaceCallStatus::Active => "ACTIVE",
            InterfaceCallStatus::Inactive => "INACTIVE",
        }
    }
}

// ==========================================
// 接口通道 (Channel)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Api,
    Upload,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Api => write!(f, "API"),
            Channel::Upload => write!(f, "Upload"),
        }
    }
}

impl Channel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "API" => Some(Channel::Api),
            "UPL" | "UPLOAD" => Some(Channel::Upload),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            Channel::Api => "API",
            Channel::Upload => "UPL",
        }
    }
}

// ==========================================
// 组织单元类型 (OrgUnit Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrgUnitType {
    Department,
    Cluster,
    Team,
}

impl fmt::Display for OrgUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl OrgUnitType {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "DEPARTMENT" => OrgUnitType::Department,
            "CLUSTER" => OrgUnitType::Cluster,
            _ => OrgUnitType::Team,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrgUnitType::Department => "DEPARTMENT",
            OrgUnitType::Cluster => "CLUSTER",
            OrgUnitType::Team => "TEAM",
        }
    }
}

// ==========================================
// 行状态 (Row Status)
// ==========================================
// RawData / StageContract 上记录的逐行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    HeaderRow,
    EmptyRow,
    DataOk,
    DataWarning,
    DataError,
    DataIgnored,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl RowStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "HEADER_ROW" => Some(RowStatus::HeaderRow),
            "EMPTY_ROW" => Some(RowStatus::EmptyRow),
            "DATA_OK" => Some(RowStatus::DataOk),
            "DATA_WARNING" => Some(RowStatus::DataWarning),
            "DATA_ERROR" => Some(RowStatus::DataError),
            "DATA_IGNORED" => Some(RowStatus::DataIgnored),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            RowStatus::HeaderRow => "HEADER_ROW",
            RowStatus::EmptyRow => "EMPTY_ROW",
            RowStatus::DataOk => "DATA_OK",
            RowStatus::DataWarning => "DATA_WARNING",
            RowStatus::DataError => "DATA_ERROR",
            RowStatus::DataIgnored => "DATA_IGNORED",
        }
    }

    /// 是否计入数据行（表头、空行除外）
    pub fn is_data(&self) -> bool {
        !matches!(self, RowStatus::HeaderRow | RowStatus::EmptyRow)
    }
}

// ==========================================
// 行处理结果 (Row Outcome)
// ==========================================
// 状态 + 可选消息，替代松散的 (status, message) 元组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowOutcome {
    Header,
    Empty,
    Ok(Option<String>),
    Warning(String),
    Error(String),
    Ignored(String),
}

impl RowOutcome {
    pub fn status(&self) -> RowStatus {
        match self {
            RowOutcome::Header => RowStatus::HeaderRow,
            RowOutcome::Empty => RowStatus::EmptyRow,
            RowOutcome::Ok(_) => RowStatus::DataOk,
            RowOutcome::Warning(_) => RowStatus::DataWarning,
            RowOutcome::Error(_) => RowStatus::DataError,
            RowOutcome::Ignored(_) => RowStatus::DataIgnored,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RowOutcome::Header => Some(crate::domain::messages::VALID_HEADER),
            RowOutcome::Empty => Some(crate::domain::messages::SKIPPED_EMPTY_ROW),
            RowOutcome::Ok(msg) => msg.as_deref(),
            RowOutcome::Warning(msg) | RowOutcome::Error(msg) | RowOutcome::Ignored(msg) => {
                Some(msg.as_str())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_call_status_roundtrip_db_str() {
        for status in [
            InterfaceCallStatus::New,
            InterfaceCallStatus::Loading,
            InterfaceCallStatus::Error,
            InterfaceCallStatus::Ok,
            InterfaceCallStatus::ReadyLoading,
            InterfaceCallStatus::Active,
            InterfaceCallStatus::Inactive,
        ] {
            assert_eq!(InterfaceCallStatus::from_str(status.to_db_str()), Some(status));
        }
        assert_eq!(InterfaceCallStatus::from_str("garbage"), None);
    }

    #[test]
    fn test_channel_accepts_short_and_long_form() {
        assert_eq!(Channel::from_str("UPL"), Some(Channel::Upload));
        assert_eq!(Channel::from_str("upload"), Some(Channel::Upload));
        assert_eq!(Channel::from_str("api"), Some(Channel::Api));
        assert_eq!(Channel::from_str("ftp"), None);
    }

    #[test]
    fn test_row_outcome_status_and_message() {
        let outcome = RowOutcome::Error("boom".to_string());
        assert_eq!(outcome.status(), RowStatus::DataError);
        assert_eq!(outcome.message(), Some("boom"));
        assert!(outcome.status().is_data());
        assert!(!RowOutcome::Header.status().is_data());
        assert!(!RowOutcome::Empty.status().is_data());
    }
}
