// ==========================================
// 合同数据登记系统 - 合同实体（暂存 / 业务）
// ==========================================
// StageContract: 每个数据行一条，不论校验结果
// Contract: 仅在所属 DPOU 激活期间存在
// 两者共用 ContractField 字段表，暂存 → 业务按白名单逐字段拷贝
// ==========================================

use crate::domain::types::RowStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 字段值类型（用于 DATA_WARNING 校验）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Text,
    Date,
    Amount,
}

// ==========================================
// ContractField - 合同字段表
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ContractField {
    DatabaseNr,
    ContractNr,
    ContractStatus,
    Description,
    DescriptionContract,
    Category,
    ContractOwner,
    ContractOwnerEmail,
    ContractOwnerPhoneNr,
    EndDateContract,
    ContactPerson,
    ContactPersonEmail,
    ContactPersonPhoneNr,
    Manufacturer,
    ManufacturerKvkNr,
    ManufacturerAddress,
    ManufacturerWebsite,
    ContractedValue,
    ContactPersonName,
    ServiceLevelManager,
    ServiceLevelManagerEmail,
    ServiceLevelManagerPhoneNr,
    ServiceLevelManager2,
    ServiceLevelManager2Email,
    ServiceLevelManager2PhoneNr,
    ContractName,
    LastEndDate,
    OriginalEndDate,
    NoticePeriod,
    NoticePeriodAvailable,
    Type,
    StartDate,
}

impl ContractField {
    pub const ALL: [ContractField; 32] = [
        ContractField::DatabaseNr,
        ContractField::ContractNr,
        ContractField::ContractStatus,
        ContractField::Description,
        ContractField::DescriptionContract,
        ContractField::Category,
        ContractField::ContractOwner,
        ContractField::ContractOwnerEmail,
        ContractField::ContractOwnerPhoneNr,
        ContractField::EndDateContract,
        ContractField::ContactPerson,
        ContractField::ContactPersonEmail,
        ContractField::ContactPersonPhoneNr,
        ContractField::Manufacturer,
        ContractField::ManufacturerKvkNr,
        ContractField::ManufacturerAddress,
        ContractField::ManufacturerWebsite,
        ContractField::ContractedValue,
        ContractField::ContactPersonName,
        ContractField::ServiceLevelManager,
        ContractField::ServiceLevelManagerEmail,
        ContractField::ServiceLevelManagerPhoneNr,
        ContractField::ServiceLevelManager2,
        ContractField::ServiceLevelManager2Email,
        ContractField::ServiceLevelManager2PhoneNr,
        ContractField::ContractName,
        ContractField::LastEndDate,
        ContractField::OriginalEndDate,
        ContractField::NoticePeriod,
        ContractField::NoticePeriodAvailable,
        ContractField::Type,
        ContractField::StartDate,
    ];

    /// 在 ALL 中的下标
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// 数据库列名（与字段名一致）
    pub fn column(&self) -> &'static str {
        match self {
            ContractField::DatabaseNr => "database_nr",
            ContractField::ContractNr => "contract_nr",
            ContractField::ContractStatus => "contract_status",
            ContractField::Description => "description",
            ContractField::DescriptionContract => "description_contract",
            ContractField::Category => "category",
            ContractField::ContractOwner => "contract_owner",
            ContractField::ContractOwnerEmail => "contract_owner_email",
            ContractField::ContractOwnerPhoneNr => "contract_owner_phone_nr",
            ContractField::EndDateContract => "end_date_contract",
            ContractField::ContactPerson => "contact_person",
            ContractField::ContactPersonEmail => "contact_person_email",
            ContractField::ContactPersonPhoneNr => "contact_person_phone_nr",
            ContractField::Manufacturer => "manufacturer",
            ContractField::ManufacturerKvkNr => "manufacturer_kvk_nr",
            ContractField::ManufacturerAddress => "manufacturer_address",
            ContractField::ManufacturerWebsite => "manufacturer_website",
            ContractField::ContractedValue => "contracted_value",
            ContractField::ContactPersonName => "contact_person_name",
            ContractField::ServiceLevelManager => "service_level_manager",
            ContractField::ServiceLevelManagerEmail => "service_level_manager_email",
            ContractField::ServiceLevelManagerPhoneNr => "service_level_manager_phone_nr",
            ContractField::ServiceLevelManager2 => "service_level_manager_2",
            ContractField::ServiceLevelManager2Email => "service_level_manager_2_email",
            ContractField::ServiceLevelManager2PhoneNr => "service_level_manager_2_phone_nr",
            ContractField::ContractName => "contract_name",
            ContractField::LastEndDate => "last_end_date",
            ContractField::OriginalEndDate => "original_end_date",
            ContractField::NoticePeriod => "notice_period",
            ContractField::NoticePeriodAvailable => "notice_period_available",
            ContractField::Type => "type",
            ContractField::StartDate => "start_date",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.column() == name)
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            ContractField::EndDateContract
            | ContractField::LastEndDate
            | ContractField::OriginalEndDate
            | ContractField::StartDate => FieldKind::Date,
            ContractField::ContractedValue => FieldKind::Amount,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for ContractField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// 暂存 → 业务表拷贝白名单（业务表存在的字段）
pub const BUSINESS_CONTRACT_FIELDS: [ContractField; 32] = ContractField::ALL;

// ==========================================
// ContractValues - 按 ContractField 索引的字段值
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractValues(Vec<Option<String>>);

impl Default for ContractValues {
    fn default() -> Self {
        Self(vec![None; ContractField::ALL.len()])
    }
}

impl ContractValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ContractField) -> Option<&str> {
        self.0[field.index()].as_deref()
    }

    pub fn set(&mut self, field: ContractField, value: Option<String>) {
        self.0[field.index()] = value;
    }

    pub fn with(mut self, field: ContractField, value: &str) -> Self {
        self.set(field, Some(value.to_string()));
        self
    }
}

// ==========================================
// StageContract - 暂存合同
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageContract {
    pub id: i64,
    pub interface_call_id: i64,
    pub data_per_org_unit_id: Option<i64>,
    pub seq_nr: i64,
    pub row_status: Option<RowStatus>,
    pub row_message: Option<String>,
    pub values: ContractValues,
}

impl StageContract {
    /// 行描述（用于 DuplicateKey 报错）
    pub fn describe(&self) -> String {
        let nr = self.values.get(ContractField::ContractNr).unwrap_or("");
        if nr.is_empty() {
            return "Empty".to_string();
        }
        format!(
            "{}: {}",
            nr,
            self.values.get(ContractField::ContractName).unwrap_or("")
        )
    }
}

// ==========================================
// Contract - 业务合同
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub data_per_org_unit_id: i64,
    pub seq_nr: i64,
    pub values: ContractValues,
}

impl Contract {
    /// 按白名单从暂存记录构造业务记录
    pub fn from_stage(stage: &StageContract, data_per_org_unit_id: i64) -> Self {
        let mut values = ContractValues::new();
        for field in BUSINESS_CONTRACT_FIELDS {
            values.set(field, stage.values.get(field).map(str::to_string));
        }
        Self {
            id: 0,
            data_per_org_unit_id,
            seq_nr: stage.seq_nr,
            values,
        }
    }
}
