// ==========================================
// 合同数据登记系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入流水线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use std::error::Error;

// ==========================================
// IngestConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait IngestConfigReader: Send + Sync {
    /// 上传文件所属的系统名称
    ///
    /// # 默认值
    /// - Negometrix
    fn get_upload_system_name(&self) -> Result<String, Box<dyn Error>>;

    /// 上传文件所属的数据集类型名称
    ///
    /// # 默认值
    /// - Contracten
    fn get_upload_dataset_type_name(&self) -> Result<String, Box<dyn Error>>;

    /// 是否对日期/金额字段做取值校验（不通过记为 DATA_WARNING）
    ///
    /// # 默认值
    /// - true
    fn get_value_checks_enabled(&self) -> Result<bool, Box<dyn Error>>;
}
