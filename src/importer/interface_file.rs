// ==========================================
// 合同数据登记系统 - 接口文件布局与识别
// ==========================================
// 布局 = 字段/表头标签声明表 + 必填表头 + 必填字段 + 分类字段
// 识别 = 表头行包含某布局的全部必填表头
// ==========================================

use crate::domain::contract::ContractField;
use crate::domain::messages::FILE_CAN_NOT_BE_RECOGNISED;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{SheetRows, UniversalFileParser};
use std::path::Path;

#[derive(Debug)]
pub struct InterfaceFileLayout {
    pub name: &'static str,
    pub declared_fields: &'static [(ContractField, &'static str)],
    pub mandatory_headers: &'static [&'static str],
    pub mandatory_fields: &'static [ContractField],
    /// 用于映射组织单元的分类字段
    pub category_field: ContractField,
}

impl InterfaceFileLayout {
    pub fn matches_header(&self, header: &[Option<String>]) -> bool {
        FieldMapper::check_mandatory_headers(header, self.mandatory_headers).is_ok()
    }

    pub fn mandatory_field_names(&self) -> Vec<&'static str> {
        self.mandatory_fields.iter().map(|f| f.column()).collect()
    }
}

// ==========================================
// Negometrix 合同导出
// ==========================================
pub const NEGOMETRIX_CONTRACT_FIELDS: [(ContractField, &str); 32] = [
    (ContractField::DatabaseNr, "Database nr."),
    (ContractField::ContractNr, "Contract nr."),
    (ContractField::ContractStatus, "Contract status"),
    (ContractField::Description, "Beschrijving"),
    (ContractField::DescriptionContract, "Beschrijving contract"),
    (ContractField::Category, "Categorie"),
    (ContractField::ContractOwner, "Contracteigenaar"),
    (ContractField::ContractOwnerEmail, "Contracteigenaar-E-mailadres"),
    (ContractField::ContractOwnerPhoneNr, "Contracteigenaar-Telefoon"),
    (ContractField::EndDateContract, "Einddatum contract"),
    (ContractField::ContactPerson, "Contactpersoon"),
    (ContractField::ContactPersonEmail, "Contactpersoon-E-mailadres"),
    (ContractField::ContactPersonPhoneNr, "Contactpersoon-Telefoon"),
    (ContractField::Manufacturer, "Fabrikant"),
    (ContractField::ManufacturerKvkNr, "Fabrikant-KvK-nummer"),
    (ContractField::ManufacturerAddress, "Fabrikant-Adres"),
    (ContractField::ManufacturerWebsite, "Fabrikant-Website"),
    (ContractField::ContractedValue, "Gecontracteerde waarde"),
    (ContractField::ContactPersonName, "Naam contactpersoon"),
    (ContractField::ServiceLevelManager, "Service Level Manager"),
    (ContractField::ServiceLevelManagerEmail, "Service Level Manager-E-mailadres"),
    (ContractField::ServiceLevelManagerPhoneNr, "Service Level Manager-Telefoon"),
    (ContractField::ServiceLevelManager2, "Service Level Manager 2"),
    (ContractField::ServiceLevelManager2Email, "Service Level Manager 2-E-mailadres"),
    (ContractField::ServiceLevelManager2PhoneNr, "Service Level Manager 2-Telefoon"),
    (ContractField::ContractName, "Naam contract"),
    (ContractField::LastEndDate, "Uiterste einddatum"),
    (
        ContractField::OriginalEndDate,
        "Oorspronkelijke einddatum (bij toepassing verlenging)",
    ),
    (ContractField::NoticePeriod, "Opzegtermijn"),
    (ContractField::NoticePeriodAvailable, "Opzegtermijn aanwezig"),
    (ContractField::Type, "Soort contract"),
    (ContractField::StartDate, "Startdatum contract"),
];

pub const NEGOMETRIX_CONTRACTS: InterfaceFileLayout = InterfaceFileLayout {
    name: "Negometrix contract export",
    declared_fields: &NEGOMETRIX_CONTRACT_FIELDS,
    mandatory_headers: &["Contract nr.", "Contract status"],
    mandatory_fields: &[ContractField::ContractNr, ContractField::ContractStatus],
    category_field: ContractField::Category,
};

/// 已注册的上传文件布局（按顺序匹配）
pub const REGISTERED_LAYOUTS: [&InterfaceFileLayout; 1] = [&NEGOMETRIX_CONTRACTS];

/// 按表头行识别布局
pub fn recognize_header(header: &[Option<String>]) -> ImportResult<&'static InterfaceFileLayout> {
    REGISTERED_LAYOUTS
        .iter()
        .copied()
        .find(|layout| layout.matches_header(header))
        .ok_or_else(|| ImportError::UnrecognizedFile(FILE_CAN_NOT_BE_RECOGNISED.to_string()))
}

/// 打开文件并识别布局
///
/// # 返回
/// - Ok((layout, rows)): 识别成功，同时返回解析结果避免重复读取
/// - Err(FileFormat): 扩展名不支持或内容无法解析
/// - Err(UnrecognizedFile): 表头不匹配任何布局
pub fn recognize_interface_file(
    file_path: &Path,
) -> ImportResult<(&'static InterfaceFileLayout, SheetRows)> {
    let rows = UniversalFileParser.parse(file_path)?;
    let layout = recognize_header(rows.header_row())?;
    Ok((layout, rows))
}
