// ==========================================
// 合同数据登记系统 - 导入层
// ==========================================
// 职责: 上传文件 → InterfaceCall / RawData / 暂存记录 / DPOU
// 支持: Excel (xlsx/xls), CSV
// ==========================================

// 模块声明
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod ingestion;
pub mod interface_file;
pub mod row_classifier;
pub mod upload;
pub mod value_check;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, FileParser, SheetRows, UniversalFileParser};
pub use ingestion::IngestionPipeline;
pub use interface_file::{
    recognize_header, recognize_interface_file, InterfaceFileLayout, NEGOMETRIX_CONTRACTS,
};
pub use row_classifier::{RowClass, RowClassifier};
pub use upload::{ContractUploadService, UploadOutcome};
