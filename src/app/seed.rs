// ==========================================
// 合同数据登记系统 - 静态参考数据初始化
// ==========================================
// Negometrix 系统 + Contracten 数据集类型 + Upload 接口定义
// 重复执行不会产生重复数据
// ==========================================

use crate::domain::reference::{CONTRACTEN, NEGOMETRIX};
use crate::domain::types::Channel;
use crate::repository::error::RepositoryResult;
use crate::repository::ReferenceRepository;
use serde::Serialize;
use tracing::info;

/// Upload 接口定义名称（也用作用户权限名）
pub const NEGOMETRIX_UPLOAD_DEFINITION: &str = "Negometrix contracten upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeededReference {
    pub system_id: i64,
    pub dataset_type_id: i64,
    pub upload_definition_id: i64,
}

pub fn seed_reference_data(repo: &ReferenceRepository) -> RepositoryResult<SeededReference> {
    let system_id = match repo.find_system_by_name(NEGOMETRIX)? {
        Some(system) => system.id,
        None => repo.create_system(NEGOMETRIX, "Contractmanagement Negometrix")?,
    };
    let dataset_type_id = match repo.find_dataset_type_by_name(CONTRACTEN)? {
        Some(dataset_type) => dataset_type.id,
        None => repo.create_dataset_type(CONTRACTEN, "Contracten")?,
    };

    let existing = repo.list_interface_definitions()?.into_iter().find(|d| {
        d.system_id == system_id && d.dataset_type_id == dataset_type_id && d.channel == Channel::Upload
    });
    let upload_definition_id = match existing {
        Some(definition) => definition.id,
        None => repo.create_interface_definition(
            NEGOMETRIX_UPLOAD_DEFINITION,
            "Upload van de Negometrix contractenexport",
            Channel::Upload,
            system_id,
            dataset_type_id,
        )?,
    };

    info!(system_id, dataset_type_id, upload_definition_id, "静态参考数据就绪");
    Ok(SeededReference {
        system_id,
        dataset_type_id,
        upload_definition_id,
    })
}
