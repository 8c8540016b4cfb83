// ==========================================
// 合同数据登记系统 - 静态参考数据
// ==========================================
// System / DatasetType / InterfaceDefinition / Mapping / OrganizationalUnit
// 一次创建，很少变更
// ==========================================

use crate::domain::types::{Channel, OrgUnitType};
use serde::{Deserialize, Serialize};

/// 系统名称: Negometrix（合同管理系统）
pub const NEGOMETRIX: &str = "Negometrix";

/// 数据集类型名称: 合同
pub const CONTRACTEN: &str = "Contracten";

// ==========================================
// System - 数据来源系统
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct System {
    pub id: i64,
    pub name: String,
    pub description: String,
}

// ==========================================
// DatasetType - 数据集类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetType {
    pub id: i64,
    pub name: String,
    pub description: String,
}

// ==========================================
// DatasetKind - 已实现的数据集种类
// ==========================================
// 业务表拷贝/删除按此分派；新数据集类型在此扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Contracts,
}

impl DatasetKind {
    pub fn from_dataset_type_name(name: &str) -> Option<Self> {
        match name {
            CONTRACTEN => Some(DatasetKind::Contracts),
            _ => None,
        }
    }
}

// ==========================================
// InterfaceDefinition - (System, DatasetType, Channel) 三元组
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDefinition {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub channel: Channel,
    pub url: String,
    pub system_id: i64,
    pub dataset_type_id: i64,
}

// ==========================================
// Mapping - 系统内分类文本 → 组织单元
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub id: i64,
    pub name: String,
    pub system_id: i64,
    pub org_unit_id: i64,
}

// ==========================================
// OrganizationalUnit - 组织树节点
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: i64,
    pub name: String,
    pub unit_type: OrgUnitType,
    pub parent_org_unit_id: Option<i64>,
}
