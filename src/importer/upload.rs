// ==========================================
// 合同数据登记系统 - 上传入口
// ==========================================
// 1. 新建 InterfaceCall（LOADING，记录文件名/时间/用户快照）
// 2. 识别文件布局
// 3. 解析接口定义（配置的系统 + 数据集类型 + Upload 通道）
// 4. 调用导入流水线
// 任一步文件级/配置错误 → 调用记录 ERROR + "Reason: ..."
// ==========================================

use crate::config::IngestConfigReader;
use crate::domain::interface_call::{InterfaceCall, RowCounters};
use crate::domain::types::{Channel, InterfaceCallStatus};
use crate::domain::user::User;
use crate::engine::resolver::InterfaceDefinitionResolver;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::ingestion::IngestionPipeline;
use crate::importer::file_parser::SheetRows;
use crate::importer::interface_file::{recognize_interface_file, InterfaceFileLayout};
use crate::repository::InterfaceCallRepository;
use chrono::Local;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// 上传结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub interface_call_id: i64,
    pub status: InterfaceCallStatus,
    pub message: String,
}

pub struct ContractUploadService<C>
where
    C: IngestConfigReader,
{
    call_repo: InterfaceCallRepository,
    resolver: InterfaceDefinitionResolver,
    pipeline: IngestionPipeline<C>,
    config: Arc<C>,
}

impl<C> ContractUploadService<C>
where
    C: IngestConfigReader,
{
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self {
            call_repo: InterfaceCallRepository::from_connection(conn.clone()),
            resolver: InterfaceDefinitionResolver::new(conn.clone()),
            pipeline: IngestionPipeline::new(conn, config.clone()),
            config,
        }
    }

    /// 处理上传文件
    ///
    /// # 参数
    /// - `file_path`: 上传文件路径
    /// - `user`: 上传用户
    ///
    /// # 返回
    /// - Ok(UploadOutcome): 调用记录已落库（OK 或 ERROR）
    /// - Err: 调用记录本身无法写入
    pub fn process_file(&self, file_path: &Path, user: &User) -> ImportResult<UploadOutcome> {
        let filename = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let call = InterfaceCall {
            id: 0,
            date_time_creation: Local::now().naive_local(),
            filename: filename.clone(),
            status: InterfaceCallStatus::Loading,
            message: String::new(),
            counters: RowCounters::new(),
            interface_definition_id: None,
            user: user.snapshot(),
        };
        let call_id = self.call_repo.insert(&call)?;
        info!(interface_call_id = call_id, filename = %filename, user = %user.username, "开始处理上传文件");

        let prepared = self.prepare(file_path, call_id);
        let (status, message) = match prepared {
            Ok((layout, rows)) => self.pipeline.ingest_rows(&rows, layout, call_id, user)?,
            Err(e) => {
                let message = format!("Reason: {}", e);
                error!(interface_call_id = call_id, error = %e, "上传文件无法处理");
                self.call_repo
                    .update_status(call_id, InterfaceCallStatus::Error, &message)?;
                (InterfaceCallStatus::Error, message)
            }
        };

        Ok(UploadOutcome {
            interface_call_id: call_id,
            status,
            message,
        })
    }

    fn prepare(
        &self,
        file_path: &Path,
        call_id: i64,
    ) -> ImportResult<(&'static InterfaceFileLayout, SheetRows)> {
        let (layout, rows) = recognize_interface_file(file_path)?;

        let system_name = self
            .config
            .get_upload_system_name()
            .map_err(|e| ImportError::Config(e.to_string()))?;
        let dataset_type_name = self
            .config
            .get_upload_dataset_type_name()
            .map_err(|e| ImportError::Config(e.to_string()))?;

        let definition =
            self.resolver
                .resolve_interface_definition(&system_name, &dataset_type_name, Channel::Upload)?;
        self.call_repo
            .set_interface_definition(call_id, definition.id)?;
        Ok((layout, rows))
    }
}
