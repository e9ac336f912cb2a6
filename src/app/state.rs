// ==========================================
// 材料采集子系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储与API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::PaletteApi;
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::events::InvalidationEventPublisher;
use crate::engine::repositories::HarvestRepositories;
use crate::repository::{
    ActionLogRepository, InventoryRepository, PartsRepository, ProjectRepository,
};

/// 应用状态
///
/// 包含API实例和共享资源,所有仓储共用同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 调色板API
    pub palette_api: Arc<PaletteApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 项目文档仓储（用于项目创建）
    pub project_repo: Arc<ProjectRepository>,

    /// 零件仓储（用于零件维护）
    pub parts_repo: Arc<PartsRepository>,

    /// 库存仓储（用于库存维护）
    pub inventory_repo: Arc<InventoryRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例 (不发布失效事件)
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::with_publisher(db_path, None)
    }

    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 创建API实例
    pub fn with_publisher(
        db_path: String,
        event_publisher: Option<Arc<dyn InvalidationEventPublisher>>,
    ) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let project_repo = Arc::new(ProjectRepository::new(conn.clone()));
        let parts_repo = Arc::new(PartsRepository::new(conn.clone()));
        let inventory_repo = Arc::new(InventoryRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let repos = HarvestRepositories::new(
            project_repo.clone(),
            parts_repo.clone(),
            inventory_repo.clone(),
            action_log_repo.clone(),
        );
        let palette_api = Arc::new(PaletteApi::new(
            repos,
            parts_repo.clone(),
            config_manager.clone(),
            event_publisher,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            palette_api,
            config_manager,
            project_repo,
            parts_repo,
            inventory_repo,
            action_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先使用环境变量 MATERIAL_HARVEST_DB_PATH,否则放在用户数据目录下
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("MATERIAL_HARVEST_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./material_harvest.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("material-harvest");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("material_harvest.db");
        }
    }

    path.to_string_lossy().to_string()
}
