// ==========================================
// 合同数据登记系统 - 固定消息文本
// ==========================================
// 逐行结果与文件级错误使用的固定文本（界面与测试依赖这些文本）
// ==========================================

pub const VALID_HEADER: &str = "Valid header";
pub const SKIPPED_EMPTY_ROW: &str = "Skipped empty row";
pub const VALID_CONTRACT: &str = "Valid contract";
pub const CATEGORY_EMPTY: &str = "Category is empty, cannot link to an org unit";
pub const USER_NOT_AUTHORIZED: &str = "User is not authorized for the org unit of this row";

pub const FILE_DEFINITION_ERROR: &str =
    "File definition error, fields have been declared mandatory, but the corresponding header not!";
pub const FILE_CAN_NOT_BE_RECOGNISED: &str = "File can not be recognized";

/// 必填字段缺失
pub fn missing_mandatory_fields(fields: &[&str]) -> String {
    format!(
        "Missing one or more mandatory fields: [{}]",
        fields.join(", ")
    )
}

/// 分类无法映射到组织单元
pub fn no_org_unit_for_category(category: &str) -> String {
    format!("No org unit found for category '{}'", category)
}

/// 字段值无法识别（DATA_WARNING）
pub fn unrecognised_value(field: &str, value: &str) -> String {
    format!("Field '{}' has an unrecognised value '{}'", field, value)
}
