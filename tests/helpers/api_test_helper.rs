// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供 PaletteApi 集成测试的通用环境与种子数据
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::error::Error;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tempfile::NamedTempFile;

use material_harvest::api::PaletteApi;
use material_harvest::config::ConfigManager;
use material_harvest::db::open_sqlite_connection;
use material_harvest::domain::inventory::InventoryItem;
use material_harvest::domain::palette::MaterialPaletteEntry;
use material_harvest::domain::part::DesignItemParts;
use material_harvest::domain::project::ProjectDocument;
use material_harvest::engine::events::{InvalidationEvent, InvalidationEventPublisher};
use material_harvest::engine::repositories::HarvestRepositories;
use material_harvest::repository::{
    ActionLogRepository, InventoryRepository, InventorySource, PartsRepository, ProjectRepository,
    RepositoryError, RepositoryResult,
};

// ==========================================
// 事件记录器
// ==========================================

/// 记录已发布的失效事件
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<InvalidationEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<InvalidationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl InvalidationEventPublisher for RecordingPublisher {
    fn publish(&self, event: InvalidationEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        let mut events = self.events.lock().unwrap();
        events.push(event);
        Ok(format!("evt-{}", events.len()))
    }
}

// ==========================================
// 故障库存数据源
// ==========================================

/// 所有查询都返回数据库错误的库存源
pub struct FailingInventory;

impl InventorySource for FailingInventory {
    fn find_by_id(&self, _inventory_id: &str) -> RepositoryResult<Option<InventoryItem>> {
        Err(RepositoryError::DatabaseQueryError("inventory service unavailable".to_string()))
    }

    fn find_by_sku(&self, _sku: &str) -> RepositoryResult<Option<InventoryItem>> {
        Err(RepositoryError::DatabaseQueryError("inventory service unavailable".to_string()))
    }
}

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 包含 PaletteApi 与直接访问数据的仓储
pub struct ApiTestEnv {
    pub _temp_file: NamedTempFile,
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub palette_api: PaletteApi,
    pub project_repo: Arc<ProjectRepository>,
    pub parts_repo: Arc<PartsRepository>,
    pub inventory_repo: Arc<InventoryRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
    pub config_manager: Arc<ConfigManager>,
    pub publisher: Arc<RecordingPublisher>,
}

impl ApiTestEnv {
    /// 创建使用真实库存仓储的测试环境
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::build(None)
    }

    /// 创建使用指定库存数据源的测试环境
    pub fn with_inventory_source(source: Arc<dyn InventorySource>) -> Result<Self, Box<dyn Error>> {
        Self::build(Some(source))
    }

    fn build(inventory_source: Option<Arc<dyn InventorySource>>) -> Result<Self, Box<dyn Error>> {
        let (temp_file, db_path) = test_helpers::create_test_db()?;
        let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path)?));

        let project_repo = Arc::new(ProjectRepository::new(conn.clone()));
        let parts_repo = Arc::new(PartsRepository::new(conn.clone()));
        let inventory_repo = Arc::new(InventoryRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()).map_err(|e| e as Box<dyn Error>)?);
        let publisher = Arc::new(RecordingPublisher::default());

        let inventory_source: Arc<dyn InventorySource> =
            inventory_source.unwrap_or_else(|| inventory_repo.clone() as Arc<dyn InventorySource>);
        let repos = HarvestRepositories::new(
            project_repo.clone(),
            parts_repo.clone(),
            inventory_source,
            action_log_repo.clone(),
        );
        let palette_api = PaletteApi::new(
            repos,
            parts_repo.clone(),
            config_manager.clone(),
            Some(publisher.clone()),
        );

        Ok(Self {
            _temp_file: temp_file,
            db_path,
            conn,
            palette_api,
            project_repo,
            parts_repo,
            inventory_repo,
            action_log_repo,
            config_manager,
            publisher,
        })
    }

    /// 创建空项目
    pub fn create_project(&self, project_id: &str) {
        self.project_repo
            .create(&ProjectDocument::new(project_id, format!("Project {}", project_id), Utc::now().naive_utc()))
            .unwrap();
    }

    /// 写入设计项与零件
    pub fn seed_parts(&self, items: &[DesignItemParts]) {
        self.parts_repo.batch_upsert(items).unwrap();
    }

    /// 写入库存记录
    pub fn seed_inventory(&self, item: &InventoryItem) {
        self.inventory_repo.upsert(item).unwrap();
    }

    /// 按 (规范化名称, 厚度) 查找调色板条目
    pub fn entry(&self, project_id: &str, normalized_name: &str, thickness_mm: u32) -> MaterialPaletteEntry {
        self.palette_api
            .get_palette(project_id)
            .unwrap()
            .expect("项目尚未采集")
            .find_by_key(normalized_name, thickness_mm)
            .cloned()
            .unwrap_or_else(|| panic!("条目 {}|{} 不存在", normalized_name, thickness_mm))
    }

    /// 当前状态版本号
    pub fn version(&self, project_id: &str) -> u64 {
        self.palette_api
            .get_optimization_snapshot(project_id)
            .unwrap()
            .status
            .version
    }
}
