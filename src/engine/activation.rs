// ==========================================
// 合同数据登记系统 - 激活引擎
// ==========================================
// 核心不变量: 任一 (组织单元, 数据集类型) 至多一个激活的 DPOU
//
// 结构:
// - plan_transition: 纯函数，输入 (InterfaceCall + 全部 DPOU) 聚合与命令，
//   一次性算出要激活/停用的 DPOU 与调用的新状态
// - ActivationEngine: 在单个事务内执行计划（兄弟冲突检查、业务表拷贝/删除、状态落库）
//   级联模式下对冲突兄弟所属调用执行 DeactivateCall 计划
// 任一步失败（兄弟冲突 / 重复键 / 完整性）整个事务回滚
// ==========================================

use crate::domain::contract::{Contract, ContractField};
use crate::domain::interface_call::{DataPerOrgUnit, InterfaceCallAggregate};
use crate::domain::reference::DatasetKind;
use crate::domain::types::InterfaceCallStatus;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::error::RepositoryError;
use crate::repository::{
    ContractRepository, DataPerOrgUnitRepository, DpouDatasetType, InterfaceCallRepository,
    OrgUnitRepository,
};
use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info, instrument};

// ==========================================
// 命令与计划
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationCommand {
    ActivateUnit { dpou_id: i64, cascading: bool },
    DeactivateUnit { dpou_id: i64 },
    ActivateCall { cascading: bool },
    DeactivateCall,
}

impl ActivationCommand {
    /// 激活时是否先停用冲突兄弟所属调用
    pub fn cascading(&self) -> bool {
        match self {
            ActivationCommand::ActivateUnit { cascading, .. }
            | ActivationCommand::ActivateCall { cascading } => *cascading,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPlan {
    pub to_activate: Vec<i64>,
    pub to_deactivate: Vec<i64>,
    /// 调用的新状态（None = 不变）
    pub call_status: Option<InterfaceCallStatus>,
}

impl TransitionPlan {
    pub fn is_noop(&self) -> bool {
        self.to_activate.is_empty() && self.to_deactivate.is_empty() && self.call_status.is_none()
    }
}

/// 计算聚合在命令下的目标状态
///
/// # 规则
/// - ActivateUnit: 已激活 → 空计划；否则激活该 DPOU，调用非 ACTIVE 时置 ACTIVE
/// - DeactivateUnit: 未激活 → 空计划；否则停用该 DPOU，若为最后一个激活的 DPOU 则调用置 INACTIVE
/// - ActivateCall: 已完全激活 → 空计划；否则激活全部未激活 DPOU，调用置 ACTIVE
/// - DeactivateCall: 调用非 ACTIVE 且无激活 DPOU → 空计划；否则停用全部激活 DPOU，调用置 INACTIVE
pub fn plan_transition(
    aggregate: &InterfaceCallAggregate,
    command: &ActivationCommand,
) -> EngineResult<TransitionPlan> {
    let mut plan = TransitionPlan::default();
    let status = aggregate.call.status;

    match command {
        ActivationCommand::ActivateUnit { dpou_id, .. } => {
            let unit = find_unit(aggregate, *dpou_id)?;
            if unit.active {
                return Ok(plan);
            }
            plan.to_activate.push(unit.id);
            if status != InterfaceCallStatus::Active {
                plan.call_status = Some(InterfaceCallStatus::Active);
            }
        }
        ActivationCommand::DeactivateUnit { dpou_id } => {
            let unit = find_unit(aggregate, *dpou_id)?;
            if !unit.active {
                return Ok(plan);
            }
            plan.to_deactivate.push(unit.id);
            if aggregate.active_unit_count() == 1 && status != InterfaceCallStatus::Inactive {
                plan.call_status = Some(InterfaceCallStatus::Inactive);
            }
        }
        ActivationCommand::ActivateCall { .. } => {
            if aggregate.is_completely_active() {
                return Ok(plan);
            }
            plan.to_activate = aggregate
                .units
                .iter()
                .filter(|u| !u.active)
                .map(|u| u.id)
                .collect();
            if status != InterfaceCallStatus::Active {
                plan.call_status = Some(InterfaceCallStatus::Active);
            }
        }
        ActivationCommand::DeactivateCall => {
            if !aggregate.is_active() && aggregate.active_unit_count() == 0 {
                return Ok(plan);
            }
            plan.to_deactivate = aggregate
                .units
                .iter()
                .filter(|u| u.active)
                .map(|u| u.id)
                .collect();
            if status != InterfaceCallStatus::Inactive {
                plan.call_status = Some(InterfaceCallStatus::Inactive);
            }
        }
    }
    Ok(plan)
}

fn find_unit(aggregate: &InterfaceCallAggregate, dpou_id: i64) -> EngineResult<&DataPerOrgUnit> {
    aggregate
        .unit(dpou_id)
        .ok_or_else(|| EngineError::not_found("DataPerOrgUnit", dpou_id))
}

// ==========================================
// 执行结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub activated_units: Vec<i64>,
    pub deactivated_units: Vec<i64>,
    pub call_status_changes: Vec<(i64, InterfaceCallStatus)>,
    pub business_rows_inserted: usize,
    pub business_rows_deleted: usize,
}

impl TransitionReport {
    fn merge(&mut self, other: TransitionReport) {
        self.activated_units.extend(other.activated_units);
        self.deactivated_units.extend(other.deactivated_units);
        self.call_status_changes.extend(other.call_status_changes);
        self.business_rows_inserted += other.business_rows_inserted;
        self.business_rows_deleted += other.business_rows_deleted;
    }
}

// ==========================================
// ActivationEngine
// ==========================================
pub struct ActivationEngine {
    conn: Arc<Mutex<Connection>>,
}

impl ActivationEngine {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn activate_dpou(&self, dpou_id: i64, cascading: bool) -> EngineResult<TransitionReport> {
        self.run_for_dpou(dpou_id, |id| ActivationCommand::ActivateUnit {
            dpou_id: id,
            cascading,
        })
    }

    pub fn deactivate_dpou(&self, dpou_id: i64) -> EngineResult<TransitionReport> {
        self.run_for_dpou(dpou_id, |id| ActivationCommand::DeactivateUnit { dpou_id: id })
    }

    pub fn activate_interface_call(
        &self,
        interface_call_id: i64,
        cascading: bool,
    ) -> EngineResult<TransitionReport> {
        self.run(interface_call_id, ActivationCommand::ActivateCall { cascading })
    }

    pub fn deactivate_interface_call(&self, interface_call_id: i64) -> EngineResult<TransitionReport> {
        self.run(interface_call_id, ActivationCommand::DeactivateCall)
    }

    fn run_for_dpou(
        &self,
        dpou_id: i64,
        command: impl Fn(i64) -> ActivationCommand,
    ) -> EngineResult<TransitionReport> {
        let interface_call_id = {
            let conn = self.lock()?;
            DataPerOrgUnitRepository::find_by_id_tx(&conn, dpou_id)?
                .ok_or_else(|| EngineError::not_found("DataPerOrgUnit", dpou_id))?
                .interface_call_id
        };
        self.run(interface_call_id, command(dpou_id))
    }

    fn lock(&self) -> EngineResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EngineError::Repository(RepositoryError::LockError(e.to_string())))
    }

    /// 单事务执行命令
    #[instrument(skip(self))]
    fn run(
        &self,
        interface_call_id: i64,
        command: ActivationCommand,
    ) -> EngineResult<TransitionReport> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let report = match Self::execute_tx(&tx, interface_call_id, &command) {
            Ok(report) => report,
            Err(e) => {
                if e.is_integrity() {
                    error!(error = %e, "激活失败（完整性/配置错误），事务回滚");
                } else {
                    info!(error = %e, "激活被拒绝，事务回滚");
                }
                return Err(e);
            }
        };

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(report)
    }

    /// 加载聚合（始终从存储重新读取）
    pub fn load_aggregate_tx(
        conn: &Connection,
        interface_call_id: i64,
    ) -> EngineResult<InterfaceCallAggregate> {
        let call = InterfaceCallRepository::find_by_id_tx(conn, interface_call_id)?
            .ok_or_else(|| EngineError::not_found("InterfaceCall", interface_call_id))?;
        let units = DataPerOrgUnitRepository::list_by_call_tx(conn, interface_call_id)?;
        Ok(InterfaceCallAggregate { call, units })
    }

    /// 在给定事务内执行命令（级联时递归处理兄弟调用）
    pub fn execute_tx(
        conn: &Connection,
        interface_call_id: i64,
        command: &ActivationCommand,
    ) -> EngineResult<TransitionReport> {
        let aggregate = Self::load_aggregate_tx(conn, interface_call_id)?;
        let plan = plan_transition(&aggregate, command)?;
        let mut report = TransitionReport::default();
        if plan.is_noop() {
            return Ok(report);
        }

        for dpou_id in &plan.to_deactivate {
            let (kind, _) = Self::dataset_kind_tx(conn, *dpou_id)?;
            let deleted = delete_business_rows_tx(conn, kind, *dpou_id)?;
            DataPerOrgUnitRepository::set_active_tx(conn, *dpou_id, false)?;
            info!(dpou_id, interface_call_id, deleted, "DPOU 已停用");
            report.deactivated_units.push(*dpou_id);
            report.business_rows_deleted += deleted;
        }

        for dpou_id in &plan.to_activate {
            let sub = Self::activate_unit_tx(conn, &aggregate, *dpou_id, command.cascading())?;
            report.merge(sub);
        }

        if let Some(status) = plan.call_status {
            InterfaceCallRepository::update_status_tx(conn, interface_call_id, status)?;
            info!(interface_call_id, status = status.to_db_str(), "接口调用状态变更");
            report.call_status_changes.push((interface_call_id, status));
        }

        Ok(report)
    }

    /// DPOU 的数据集种类（决定业务表）与数据集类型
    fn dataset_kind_tx(conn: &Connection, dpou_id: i64) -> EngineResult<(DatasetKind, DpouDatasetType)> {
        let dataset_type = DataPerOrgUnitRepository::dataset_type_tx(conn, dpou_id).map_err(|e| match e {
            RepositoryError::IntegrityError(msg) => EngineError::Integrity(msg),
            other => EngineError::Repository(other),
        })?;
        let kind = DatasetKind::from_dataset_type_name(&dataset_type.dataset_type_name)
            .ok_or_else(|| EngineError::UnsupportedDatasetType(dataset_type.dataset_type_name.clone()))?;
        Ok((kind, dataset_type))
    }

    /// 激活单个 DPOU：兄弟检查 → 业务表拷贝 → active = true
    fn activate_unit_tx(
        conn: &Connection,
        aggregate: &InterfaceCallAggregate,
        dpou_id: i64,
        cascading: bool,
    ) -> EngineResult<TransitionReport> {
        let mut report = TransitionReport::default();
        let unit = find_unit(aggregate, dpou_id)?;
        let (kind, dataset_type) = Self::dataset_kind_tx(conn, dpou_id)?;

        let siblings = DataPerOrgUnitRepository::active_siblings_tx(conn, unit, dataset_type.dataset_type_id)
            .map_err(|e| match e {
                RepositoryError::IntegrityError(msg) => EngineError::Integrity(msg),
                other => EngineError::Repository(other),
            })?;

        if !siblings.is_empty() {
            if !cascading {
                let org_unit_name = OrgUnitRepository::find_by_id_tx(conn, unit.org_unit_id)?
                    .map(|u| u.name)
                    .unwrap_or_else(|| unit.org_unit_id.to_string());
                return Err(EngineError::OtherActiveDataPerOrgUnit {
                    id: dpou_id,
                    dataset_type_name: dataset_type.dataset_type_name,
                    org_unit_name,
                });
            }
            for sibling in siblings {
                // 兄弟可能已随前一个兄弟的调用一起被停用
                let still_active = DataPerOrgUnitRepository::find_by_id_tx(conn, sibling.id)?
                    .map(|s| s.active)
                    .unwrap_or(false);
                if !still_active {
                    continue;
                }
                info!(
                    dpou_id,
                    sibling_dpou_id = sibling.id,
                    sibling_interface_call_id = sibling.interface_call_id,
                    "级联停用兄弟所属接口调用"
                );
                let sub = Self::execute_tx(conn, sibling.interface_call_id, &ActivationCommand::DeactivateCall)?;
                report.merge(sub);
            }
        }

        let inserted = copy_to_business_tx(conn, kind, dpou_id)?;
        DataPerOrgUnitRepository::set_active_tx(conn, dpou_id, true)?;
        info!(dpou_id, interface_call_id = unit.interface_call_id, inserted, "DPOU 已激活");
        report.activated_units.push(dpou_id);
        report.business_rows_inserted += inserted;
        Ok(report)
    }
}

// ==========================================
// 业务表读写（按数据集种类分派）
// ==========================================

/// 暂存 → 业务：逐条拷贝，唯一约束冲突 → DuplicateKey
fn copy_to_business_tx(conn: &Connection, kind: DatasetKind, dpou_id: i64) -> EngineResult<usize> {
    match kind {
        DatasetKind::Contracts => {
            let staged = ContractRepository::list_stage_by_dpou_tx(conn, dpou_id)?;
            for stage in &staged {
                let contract = Contract::from_stage(stage, dpou_id);
                match ContractRepository::insert_contract_tx(conn, &contract) {
                    Ok(_) => {}
                    Err(RepositoryError::UniqueConstraintViolation(msg)) => {
                        let (table, field_name) = parse_unique_violation(&msg);
                        let value = ContractField::from_column(&field_name)
                            .and_then(|f| stage.values.get(f))
                            .unwrap_or("")
                            .to_string();
                        return Err(EngineError::DuplicateKey {
                            table,
                            seq_nr: stage.seq_nr,
                            field_name,
                            value,
                            description: stage.describe(),
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Ok(staged.len())
        }
    }
}

fn delete_business_rows_tx(conn: &Connection, kind: DatasetKind, dpou_id: i64) -> EngineResult<usize> {
    match kind {
        DatasetKind::Contracts => Ok(ContractRepository::delete_by_dpou_tx(conn, dpou_id)?),
    }
}

/// "UNIQUE constraint failed: contract.contract_nr" → ("contract", "contract_nr")
fn parse_unique_violation(msg: &str) -> (String, String) {
    let target = msg
        .rsplit(": ")
        .next()
        .and_then(|cols| cols.split(", ").next())
        .unwrap_or("");
    match target.split_once('.') {
        Some((table, column)) => (table.trim().to_string(), column.trim().to_string()),
        None => ("unknown".to_string(), target.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::interface_call::{InterfaceCall, RowCounters, UploadUser};
    use chrono::NaiveDate;

    fn aggregate(status: InterfaceCallStatus, units: &[(i64, bool)]) -> InterfaceCallAggregate {
        InterfaceCallAggregate {
            call: InterfaceCall {
                id: 1,
                date_time_creation: NaiveDate::from_ymd_opt(2024, 1, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                filename: "f.xlsx".into(),
                status,
                message: String::new(),
                counters: RowCounters::new(),
                interface_definition_id: Some(1),
                user: UploadUser { user_id: None, username: None, user_email: None },
            },
            units: units
                .iter()
                .map(|(id, active)| DataPerOrgUnit {
                    id: *id,
                    interface_call_id: 1,
                    org_unit_id: *id * 100,
                    number_of_data_rows_ok: 0,
                    number_of_data_rows_warning: 0,
                    active: *active,
                })
                .collect(),
        }
    }

    #[test]
    fn test_activate_unit_is_idempotent() {
        let agg = aggregate(InterfaceCallStatus::Active, &[(1, true), (2, false)]);
        let plan = plan_transition(&agg, &ActivationCommand::ActivateUnit { dpou_id: 1, cascading: false }).unwrap();
        assert!(plan.is_noop());

        let plan = plan_transition(&agg, &ActivationCommand::ActivateUnit { dpou_id: 2, cascading: false }).unwrap();
        assert_eq!(plan.to_activate, vec![2]);
        assert_eq!(plan.call_status, None);
    }

    #[test]
    fn test_first_unit_activation_sets_call_active() {
        let agg = aggregate(InterfaceCallStatus::Ok, &[(1, false), (2, false)]);
        let plan = plan_transition(&agg, &ActivationCommand::ActivateUnit { dpou_id: 1, cascading: true }).unwrap();
        assert_eq!(plan.to_activate, vec![1]);
        assert_eq!(plan.call_status, Some(InterfaceCallStatus::Active));
    }

    #[test]
    fn test_last_unit_deactivation_sets_call_inactive() {
        let agg = aggregate(InterfaceCallStatus::Active, &[(1, true), (2, true)]);
        let plan = plan_transition(&agg, &ActivationCommand::DeactivateUnit { dpou_id: 1 }).unwrap();
        assert_eq!(plan.call_status, None);

        let agg = aggregate(InterfaceCallStatus::Active, &[(1, false), (2, true)]);
        let plan = plan_transition(&agg, &ActivationCommand::DeactivateUnit { dpou_id: 2 }).unwrap();
        assert_eq!(plan.to_deactivate, vec![2]);
        assert_eq!(plan.call_status, Some(InterfaceCallStatus::Inactive));

        let plan = plan_transition(&agg, &ActivationCommand::DeactivateUnit { dpou_id: 1 }).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_call_level_plans() {
        let agg = aggregate(InterfaceCallStatus::ReadyLoading, &[(1, false), (2, true)]);
        let plan = plan_transition(&agg, &ActivationCommand::ActivateCall { cascading: true }).unwrap();
        assert_eq!(plan.to_activate, vec![1]);
        assert_eq!(plan.call_status, Some(InterfaceCallStatus::Active));

        let plan = plan_transition(&agg, &ActivationCommand::DeactivateCall).unwrap();
        assert_eq!(plan.to_deactivate, vec![2]);
        assert_eq!(plan.call_status, Some(InterfaceCallStatus::Inactive));

        let done = aggregate(InterfaceCallStatus::Active, &[(1, true)]);
        assert!(plan_transition(&done, &ActivationCommand::ActivateCall { cascading: false })
            .unwrap()
            .is_noop());

        let idle = aggregate(InterfaceCallStatus::Ok, &[(1, false)]);
        assert!(plan_transition(&idle, &ActivationCommand::DeactivateCall).unwrap().is_noop());
    }

    #[test]
    fn test_unknown_unit_is_not_found() {
        let agg = aggregate(InterfaceCallStatus::Ok, &[(1, false)]);
        let err = plan_transition(&agg, &ActivationCommand::DeactivateUnit { dpou_id: 9 }).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[test]
    fn test_parse_unique_violation() {
        assert_eq!(
            parse_unique_violation("UNIQUE constraint failed: contract.contract_nr"),
            ("contract".to_string(), "contract_nr".to_string())
        );
    }
}
