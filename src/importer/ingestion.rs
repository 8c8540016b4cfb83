// ==========================================
// 合同数据登记系统 - 导入流水线
// ==========================================
// 流程:
// 1. 解析文件（失败 → FileFormat）
// 2. 校验必填表头（失败 → FileDefinition）
// 3. 解析字段列位置 / 必填字段列位置（失败 → FileDefinition）
// 4. 逐行: 分类 → 暂存记录 + 组织单元解析 + 授权 → RawData 审计记录
// 5. 计数写回 InterfaceCall
// 6. 文件级错误 → ERROR + "Reason: ..."；行级错误不升级
// 所有行写入与计数在同一事务内提交
// ==========================================

use crate::config::IngestConfigReader;
use crate::domain::contract::{ContractField, ContractValues, StageContract};
use crate::domain::interface_call::{InterfaceCall, RowCounters};
use crate::domain::messages;
use crate::domain::reference::System;
use crate::domain::types::{InterfaceCallStatus, RowOutcome, RowStatus};
use crate::domain::user::User;
use crate::engine::authorization::OrgUnitAuthorizer;
use crate::engine::error::EngineError;
use crate::engine::resolver::InterfaceDefinitionResolver;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{SheetRows, UniversalFileParser};
use crate::importer::interface_file::InterfaceFileLayout;
use crate::importer::row_classifier::RowClassifier;
use crate::importer::value_check::first_unrecognised_value;
use crate::repository::error::RepositoryError;
use crate::repository::{
    ContractRepository, DataPerOrgUnitRepository, InterfaceCallRepository, RawDataRepository,
    ReferenceRepository,
};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// 单行处理所需的只读上下文
struct RowContext<'a> {
    interface_call_id: i64,
    system: &'a System,
    user: &'a User,
    layout: &'a InterfaceFileLayout,
    positions: &'a BTreeMap<ContractField, usize>,
    classifier: &'a RowClassifier<'a>,
    value_checks_enabled: bool,
}

// ==========================================
// IngestionPipeline
// ==========================================
pub struct IngestionPipeline<C>
where
    C: IngestConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    config: Arc<C>,
}

impl<C> IngestionPipeline<C>
where
    C: IngestConfigReader,
{
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self { conn, config }
    }

    /// 从文件导入（主入口）
    ///
    /// # 返回
    /// - Ok((status, message)): 文件级错误也返回 Ok，状态为 ERROR
    /// - Err: 调用记录不存在或状态无法落库
    pub fn ingest(
        &self,
        file_path: &Path,
        layout: &InterfaceFileLayout,
        interface_call_id: i64,
        user: &User,
    ) -> ImportResult<(InterfaceCallStatus, String)> {
        let parsed = UniversalFileParser.parse(file_path);
        self.finish(interface_call_id, parsed.and_then(|rows| {
            self.ingest_rows_inner(&rows, layout, interface_call_id, user)
        }))
    }

    /// 从已解析的行导入（上传入口已读过文件时使用）
    pub fn ingest_rows(
        &self,
        rows: &SheetRows,
        layout: &InterfaceFileLayout,
        interface_call_id: i64,
        user: &User,
    ) -> ImportResult<(InterfaceCallStatus, String)> {
        let result = self.ingest_rows_inner(rows, layout, interface_call_id, user);
        self.finish(interface_call_id, result)
    }

    /// 根据结果落库最终状态
    fn finish(
        &self,
        interface_call_id: i64,
        result: ImportResult<RowCounters>,
    ) -> ImportResult<(InterfaceCallStatus, String)> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        match result {
            Ok(_) => {
                let call = InterfaceCallRepository::find_by_id_tx(&conn, interface_call_id)?
                    .ok_or_else(|| EngineError::not_found("InterfaceCall", interface_call_id))?;
                InterfaceCallRepository::update_status_tx(&conn, interface_call_id, InterfaceCallStatus::Ok)?;
                Ok((InterfaceCallStatus::Ok, call.message))
            }
            // 调用记录本身不存在时 update 返回 NotFound 并向上传播
            Err(e) => {
                let message = format!("Reason: {}", e);
                error!(interface_call_id, error = %e, "导入失败");
                InterfaceCallRepository::update_status_with_message_tx(
                    &conn,
                    interface_call_id,
                    InterfaceCallStatus::Error,
                    &message,
                )?;
                Ok((InterfaceCallStatus::Error, message))
            }
        }
    }

    #[instrument(skip(self, rows, layout, user), fields(
        run_id = %Uuid::new_v4(),
        layout = layout.name,
        row_count = rows.len()
    ))]
    fn ingest_rows_inner(
        &self,
        rows: &SheetRows,
        layout: &InterfaceFileLayout,
        interface_call_id: i64,
        user: &User,
    ) -> ImportResult<RowCounters> {
        let value_checks_enabled = self
            .config
            .get_value_checks_enabled()
            .map_err(|e| ImportError::Config(e.to_string()))?;

        // 文件级校验（任何行写入之前）
        let header = rows.header_row();
        FieldMapper::check_mandatory_headers(header, layout.mandatory_headers)?;
        let positions = FieldMapper::resolve_positions(header, layout.declared_fields);
        let mandatory = FieldMapper::mandatory_field_positions(layout.mandatory_fields, &positions)?;
        let mandatory_positions: Vec<usize> = mandatory.iter().map(|(_, pos)| *pos).collect();
        let mandatory_names = layout.mandatory_field_names();
        let classifier = RowClassifier::new(&mandatory_positions, &mandatory_names);

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let call = InterfaceCallRepository::find_by_id_tx(&tx, interface_call_id)?
            .ok_or_else(|| EngineError::not_found("InterfaceCall", interface_call_id))?;
        let system = Self::system_of_call(&tx, &call)?;
        InterfaceCallRepository::update_status_tx(&tx, interface_call_id, InterfaceCallStatus::Loading)?;

        let ctx = RowContext {
            interface_call_id,
            system: &system,
            user,
            layout,
            positions: &positions,
            classifier: &classifier,
            value_checks_enabled,
        };

        // 每次导入新建计数器
        let mut counters = RowCounters::new();
        for (row_nr, cells) in rows.iter_rows() {
            let outcome = Self::process_row(&tx, &ctx, row_nr, cells)?;
            debug!(
                row_nr,
                status = outcome.status().to_db_str(),
                message = outcome.message().unwrap_or(""),
                "行处理完成"
            );
            counters.record(outcome.status());
        }

        InterfaceCallRepository::update_counters_tx(&tx, interface_call_id, &counters)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        info!(
            rows_received = counters.rows_received,
            data_rows_received = counters.data_rows_received,
            ok = counters.data_rows_ok,
            warning = counters.data_rows_warning,
            error = counters.data_rows_error,
            ignored = counters.data_rows_ignored,
            "导入完成"
        );
        Ok(counters)
    }

    /// 调用 → 接口定义 → 系统（映射表按系统隔离）
    fn system_of_call(conn: &Connection, call: &InterfaceCall) -> ImportResult<System> {
        let definition_id = call.interface_definition_id.ok_or_else(|| {
            EngineError::Integrity(format!("interface call {} has no interface definition", call.id))
        })?;
        let definition = ReferenceRepository::find_interface_definition_by_id_tx(conn, definition_id)?
            .ok_or_else(|| EngineError::not_found("InterfaceDefinition", definition_id))?;
        let system = ReferenceRepository::find_system_by_id_tx(conn, definition.system_id)?
            .ok_or_else(|| EngineError::not_found("System", definition.system_id))?;
        Ok(system)
    }

    /// 处理一行：写暂存记录（数据候选行）与 RawData
    fn process_row(
        conn: &Connection,
        ctx: &RowContext<'_>,
        row_nr: usize,
        cells: &[Option<String>],
    ) -> ImportResult<RowOutcome> {
        let seq_nr = row_nr as i64;
        let class = ctx.classifier.classify(row_nr, cells);

        let outcome = match ctx.classifier.outcome(&class) {
            Some(outcome) => outcome,
            None => Self::stage_candidate(conn, ctx, seq_nr, cells)?,
        };

        RawDataRepository::insert_tx(
            conn,
            ctx.interface_call_id,
            seq_nr,
            outcome.status(),
            outcome.message(),
            cells,
        )?;
        Ok(outcome)
    }

    /// 候选数据行: 组织单元解析 → 授权 → 取值校验 → 挂到 DPOU
    fn stage_candidate(
        conn: &Connection,
        ctx: &RowContext<'_>,
        seq_nr: i64,
        cells: &[Option<String>],
    ) -> ImportResult<RowOutcome> {
        let mut values = ContractValues::new();
        for (field, pos) in ctx.positions {
            values.set(*field, cells.get(*pos).cloned().flatten());
        }

        let category = values
            .get(ctx.layout.category_field)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let (outcome, dpou_id) = match category {
            None => (RowOutcome::Error(messages::CATEGORY_EMPTY.to_string()), None),
            Some(category) => {
                match InterfaceDefinitionResolver::resolve_org_unit_tx(conn, ctx.system, &category)? {
                    None => (
                        RowOutcome::Error(messages::no_org_unit_for_category(&category)),
                        None,
                    ),
                    Some(unit) => {
                        if !OrgUnitAuthorizer::is_authorized_for_tx(conn, ctx.user, unit.id)? {
                            (
                                RowOutcome::Ignored(messages::USER_NOT_AUTHORIZED.to_string()),
                                None,
                            )
                        } else {
                            let outcome = match ctx
                                .value_checks_enabled
                                .then(|| first_unrecognised_value(&values))
                                .flatten()
                            {
                                Some(warning) => RowOutcome::Warning(warning),
                                None => RowOutcome::Ok(Some(messages::VALID_CONTRACT.to_string())),
                            };
                            let dpou = DataPerOrgUnitRepository::find_or_create_tx(
                                conn,
                                ctx.interface_call_id,
                                unit.id,
                            )?;
                            let (ok, warning) = match outcome.status() {
                                RowStatus::DataWarning => (0, 1),
                                _ => (1, 0),
                            };
                            DataPerOrgUnitRepository::increment_counters_tx(conn, dpou.id, ok, warning)?;
                            (outcome, Some(dpou.id))
                        }
                    }
                }
            }
        };

        let stage = StageContract {
            id: 0,
            interface_call_id: ctx.interface_call_id,
            data_per_org_unit_id: dpou_id,
            seq_nr,
            row_status: Some(outcome.status()),
            row_message: outcome.message().map(str::to_string),
            values,
        };
        ContractRepository::insert_stage_tx(conn, &stage)?;
        Ok(outcome)
    }
}
