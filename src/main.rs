// ==========================================
// 合同数据登记系统 - 命令行入口
// ==========================================
// 查询类命令输出 JSON（stdout），日志写 stderr
// 数据库路径: --db 或 CONTRACT_REGISTRY_DB_PATH，缺省为用户数据目录
// ==========================================

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use contract_registry::api::DatasetFilter;
use contract_registry::app::{get_default_db_path, seed_reference_data, AppState};
use contract_registry::domain::types::OrgUnitType;
use contract_registry::domain::user::User;
use contract_registry::logging;

#[derive(Parser)]
#[command(name = "contract-registry")]
#[command(about = "合同数据登记系统: upload, stage and activate contract datasets per org unit")]
#[command(version)]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "CONTRACT_REGISTRY_DB_PATH")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database schema
    Init,

    /// Register the Negometrix system, Contracten dataset type and upload definition
    Seed,

    /// Add an organizational unit
    AddOrgUnit {
        name: String,
        /// DEPARTMENT, CLUSTER or TEAM
        #[arg(long = "type", default_value = "TEAM")]
        unit_type: String,
        /// Name of the parent org unit
        #[arg(long)]
        parent: Option<String>,
    },

    /// Map a category text of a system to an org unit
    AddMapping {
        category: String,
        #[arg(long)]
        org_unit: String,
        #[arg(long, default_value = "Negometrix")]
        system: String,
    },

    /// Add a user
    AddUser {
        username: String,
        #[arg(long, default_value = "")]
        display_name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long)]
        superuser: bool,
        /// Org unit names the user belongs to
        #[arg(long = "org-unit")]
        org_units: Vec<String>,
        /// Permission names (interface definition names)
        #[arg(long = "permission")]
        permissions: Vec<String>,
    },

    /// Upload a spreadsheet as the given user
    Upload {
        file: PathBuf,
        #[arg(long)]
        user: String,
    },

    /// Activate an interface call
    ActivateCall {
        id: i64,
        /// Deactivate conflicting interface calls first
        #[arg(long)]
        cascading: bool,
    },

    /// Deactivate an interface call
    DeactivateCall { id: i64 },

    /// Activate a dataset (data per org unit)
    ActivateDpou {
        id: i64,
        #[arg(long)]
        cascading: bool,
    },

    /// Deactivate a dataset (data per org unit)
    DeactivateDpou { id: i64 },

    /// List datasets visible to a user
    Datasets {
        #[arg(long)]
        user: String,
        /// Filter as key=value (active, system, dataset_type, responsibility)
        #[arg(long = "filter")]
        filters: Vec<String>,
    },

    /// Show an interface call with its datasets and contracts
    ShowCall { id: i64 },

    /// List all interface calls, newest first
    Calls,

    /// Show the row-level audit records of an interface call
    RawData { id: i64 },
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let db_path = cli
        .db
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    tracing::debug!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    match cli.command {
        Command::Init => {
            print_json(&serde_json::json!({ "db_path": state.db_path, "schema": "ready" }))?;
        }
        Command::Seed => {
            let seeded = seed_reference_data(&state.reference_repo)?;
            print_json(&seeded)?;
        }
        Command::AddOrgUnit {
            name,
            unit_type,
            parent,
        } => {
            let parent_id = match parent {
                Some(parent) => Some(find_org_unit_id(&state, &parent)?),
                None => None,
            };
            let id = state
                .org_unit_repo
                .create(&name, OrgUnitType::from_str(&unit_type), parent_id)?;
            print_json(&serde_json::json!({ "org_unit_id": id }))?;
        }
        Command::AddMapping {
            category,
            org_unit,
            system,
        } => {
            let system = state
                .reference_repo
                .find_system_by_name(&system)?
                .ok_or_else(|| anyhow!("system '{}' is not registered", system))?;
            let org_unit_id = find_org_unit_id(&state, &org_unit)?;
            let id = state
                .reference_repo
                .create_mapping(&category, system.id, org_unit_id)?;
            print_json(&serde_json::json!({ "mapping_id": id }))?;
        }
        Command::AddUser {
            username,
            display_name,
            email,
            superuser,
            org_units,
            permissions,
        } => {
            let id = state
                .user_repo
                .create(&username, &display_name, &email, superuser)?;
            for org_unit in &org_units {
                let org_unit_id = find_org_unit_id(&state, org_unit)?;
                state.user_repo.add_org_unit(id, org_unit_id)?;
            }
            for permission in &permissions {
                state.user_repo.add_permission(id, permission)?;
            }
            print_json(&serde_json::json!({ "user_id": id }))?;
        }
        Command::Upload { file, user } => {
            let user = find_user(&state, &user)?;
            let outcome = state.registry_api.upload_file(&file, &user)?;
            print_json(&outcome)?;
        }
        Command::ActivateCall { id, cascading } => {
            print_json(&state.registry_api.activate_interface_call(id, cascading)?)?;
        }
        Command::DeactivateCall { id } => {
            print_json(&state.registry_api.deactivate_interface_call(id)?)?;
        }
        Command::ActivateDpou { id, cascading } => {
            print_json(&state.registry_api.activate_dpou(id, cascading)?)?;
        }
        Command::DeactivateDpou { id } => {
            print_json(&state.registry_api.deactivate_dpou(id)?)?;
        }
        Command::Datasets { user, filters } => {
            let user = find_user(&state, &user)?;
            let params: Vec<(&str, &str)> = filters
                .iter()
                .map(|f| f.split_once('=').unwrap_or((f.as_str(), "")))
                .collect();
            let filter = DatasetFilter::from_params(&params);
            print_json(&state.dataset_api.datasets_for_user(&user, &filter)?)?;
        }
        Command::ShowCall { id } => {
            print_json(&state.registry_api.interface_call_detail(id)?)?;
        }
        Command::Calls => {
            print_json(&state.registry_api.list_interface_calls()?)?;
        }
        Command::RawData { id } => {
            print_json(&state.registry_api.raw_data(id)?)?;
        }
    }

    Ok(())
}

fn find_org_unit_id(state: &AppState, name: &str) -> Result<i64> {
    state
        .org_unit_repo
        .find_by_name(name)?
        .map(|unit| unit.id)
        .ok_or_else(|| anyhow!("org unit '{}' not found", name))
}

fn find_user(state: &AppState, username: &str) -> Result<User> {
    state
        .user_repo
        .find_by_username(username)?
        .ok_or_else(|| anyhow!("user '{}' not found", username))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", text);
    Ok(())
}
