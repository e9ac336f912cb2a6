// ==========================================
// 材料采集子系统 - 命令行入口
// ==========================================
// 用法:
//   material-harvest [db_path] <command> [args...]
//
// 命令:
//   create-project <project_id> <name>
//   harvest <project_id> <user>
//   sync-prices <user>
//   status <project_id>
//   import-parts <project_id> <csv_path> <user>
//
// db_path 缺省时使用 MATERIAL_HARVEST_DB_PATH 或用户数据目录
// ==========================================

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use material_harvest::app::{get_default_db_path, AppState};
use material_harvest::{logging, ProjectDocument};

const COMMANDS: [&str; 5] = ["create-project", "harvest", "sync-prices", "status", "import-parts"];

fn usage() -> String {
    format!(
        "用法: material-harvest [db_path] <{}> [args...]",
        COMMANDS.join("|")
    )
}

fn arg<'a>(args: &'a [String], idx: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(idx)
        .map(|s| s.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow!("缺少参数 <{}>\n{}", name, usage()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = match args.first() {
        Some(first) if !COMMANDS.contains(&first.as_str()) => args.remove(0),
        _ => get_default_db_path(),
    };
    let command = args.first().cloned().ok_or_else(|| anyhow!(usage()))?;

    tracing::info!("材料采集子系统 v{}，数据库: {}", material_harvest::VERSION, db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let api = state.palette_api.clone();

    match command.as_str() {
        "create-project" => {
            let project_id = arg(&args, 1, "project_id")?;
            let name = arg(&args, 2, "name")?;
            let now = chrono::Utc::now().naive_utc();
            state
                .project_repo
                .create(&ProjectDocument::new(project_id, name, now))
                .with_context(|| format!("创建项目{}失败", project_id))?;
            println!("project_id={}", project_id);
        }
        "harvest" => {
            let project_id = arg(&args, 1, "project_id")?;
            let user = arg(&args, 2, "user")?;
            let result = api.harvest_materials(project_id, user).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "sync-prices" => {
            let user = arg(&args, 1, "user")?;
            let result = api.sync_all_project_prices(user).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        "status" => {
            let project_id = arg(&args, 1, "project_id")?;
            let snapshot = api.get_optimization_snapshot(project_id)?;
            let palette = api.get_palette(project_id)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "optimization": snapshot,
                    "palette": palette,
                }))?
            );
        }
        "import-parts" => {
            let project_id = arg(&args, 1, "project_id")?;
            let csv_path = arg(&args, 2, "csv_path")?;
            let user = arg(&args, 3, "user")?;
            let report = api.import_parts_csv(project_id, Path::new(csv_path), user)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        other => bail!("未知命令: {}\n{}", other, usage()),
    }

    Ok(())
}
