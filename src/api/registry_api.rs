// ==========================================
// 合同数据登记系统 - 登记 API
// ==========================================
// 职责: 按 id 操作的入口（上传、激活/停用、调用详情）
// 所有返回 ApiResult，错误带稳定机器码
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::IngestConfigReader;
use crate::domain::contract::{Contract, StageContract};
use crate::domain::interface_call::{InterfaceCall, InterfaceCallAggregate, RawData};
use crate::domain::user::User;
use crate::engine::activation::{ActivationEngine, TransitionReport};
use crate::importer::upload::{ContractUploadService, UploadOutcome};
use crate::repository::{ContractRepository, InterfaceCallRepository, RawDataRepository};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// 调用详情（聚合 + 暂存/业务合同）
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceCallDetail {
    pub aggregate: InterfaceCallAggregate,
    pub org_unit_ids: Vec<i64>,
    pub is_completely_active: bool,
    pub is_completely_inactive: bool,
    pub staged_contracts: Vec<StageContract>,
    pub contracts: Vec<Contract>,
}

// ==========================================
// RegistryApi
// ==========================================
pub struct RegistryApi<C>
where
    C: IngestConfigReader,
{
    conn: Arc<Mutex<Connection>>,
    upload_service: ContractUploadService<C>,
    activation_engine: ActivationEngine,
    call_repo: InterfaceCallRepository,
    contract_repo: ContractRepository,
    raw_data_repo: RawDataRepository,
}

impl<C> RegistryApi<C>
where
    C: IngestConfigReader,
{
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<C>) -> Self {
        Self {
            upload_service: ContractUploadService::new(conn.clone(), config),
            activation_engine: ActivationEngine::new(conn.clone()),
            call_repo: InterfaceCallRepository::from_connection(conn.clone()),
            contract_repo: ContractRepository::from_connection(conn.clone()),
            raw_data_repo: RawDataRepository::from_connection(conn.clone()),
            conn,
        }
    }

    /// 上传文件
    ///
    /// 文件级错误不作为 Err 返回: 调用记录状态为 ERROR，message 为原因
    pub fn upload_file(&self, file_path: &Path, user: &User) -> ApiResult<UploadOutcome> {
        let outcome = self.upload_service.process_file(file_path, user)?;
        info!(
            interface_call_id = outcome.interface_call_id,
            status = outcome.status.to_db_str(),
            "上传完成"
        );
        Ok(outcome)
    }

    pub fn activate_dpou(&self, dpou_id: i64, cascading: bool) -> ApiResult<TransitionReport> {
        Ok(self.activation_engine.activate_dpou(dpou_id, cascading)?)
    }

    pub fn deactivate_dpou(&self, dpou_id: i64) -> ApiResult<TransitionReport> {
        Ok(self.activation_engine.deactivate_dpou(dpou_id)?)
    }

    pub fn activate_interface_call(
        &self,
        interface_call_id: i64,
        cascading: bool,
    ) -> ApiResult<TransitionReport> {
        Ok(self
            .activation_engine
            .activate_interface_call(interface_call_id, cascading)?)
    }

    pub fn deactivate_interface_call(&self, interface_call_id: i64) -> ApiResult<TransitionReport> {
        Ok(self
            .activation_engine
            .deactivate_interface_call(interface_call_id)?)
    }

    /// 调用详情
    pub fn interface_call_detail(&self, interface_call_id: i64) -> ApiResult<InterfaceCallDetail> {
        let aggregate = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| ApiError::DatabaseError(format!("database lock failed: {}", e)))?;
            ActivationEngine::load_aggregate_tx(&conn, interface_call_id)?
        };

        Ok(InterfaceCallDetail {
            org_unit_ids: aggregate.org_unit_ids(),
            is_completely_active: aggregate.is_completely_active(),
            is_completely_inactive: aggregate.is_completely_inactive(),
            staged_contracts: self.contract_repo.list_stage_by_call(interface_call_id)?,
            contracts: self.contract_repo.list_by_call(interface_call_id)?,
            aggregate,
        })
    }

    pub fn list_interface_calls(&self) -> ApiResult<Vec<InterfaceCall>> {
        Ok(self.call_repo.list_all()?)
    }

    /// 行级审计记录
    pub fn raw_data(&self, interface_call_id: i64) -> ApiResult<Vec<RawData>> {
        Ok(self.raw_data_repo.list_by_call(interface_call_id)?)
    }
}
