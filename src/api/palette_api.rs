// ==========================================
// 材料采集子系统 - 调色板 API
// ==========================================
// 职责: 材料采集、库存映射、价格同步、失效通知、阶段重算回写
// 红线: 每次写入都是条件写入 (revision),写入成功后记录 ActionLog
// 事件: 失效成功持久化后才发布 InvalidationEvent
// ==========================================

mod core;
mod harvest;
mod invalidation;
mod mapping;
mod parts;
mod pricing;


use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ConfigManager;
use crate::domain::palette::MaterialPaletteEntry;
use crate::engine::events::{InvalidationEventPublisher, OptionalEventPublisher};
use crate::engine::invalidation::InvalidationPropagator;
use crate::engine::repositories::HarvestRepositories;
use crate::importer::PartsCsvImporter;
use crate::repository::parts_repo::PartsRepository;

// ==========================================
// 返回结构
// ==========================================

/// 映射/解除映射结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingResult {
    pub entry: MaterialPaletteEntry,
    pub mapped_count: usize,
    pub unmapped_count: usize,
    /// 本次触发失效后的项目状态版本号 (未触发为 None)
    pub invalidation_version: Option<u64>,
    pub invalidation_reasons: Vec<String>,
}

/// 单项目价格同步结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceSyncResult {
    pub project_id: String,
    /// 单价发生变化的条目数
    pub updated: usize,
    pub updated_materials: Vec<String>,
    /// 单条目同步失败原因 (不中断其余条目)
    pub errors: Vec<String>,
    pub invalidation_version: Option<u64>,
}

/// 批量同步中失败的项目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSyncFailure {
    pub project_id: String,
    pub error: String,
}

/// 全部项目价格同步结果
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchPriceSyncResult {
    pub projects: Vec<PriceSyncResult>,
    pub failures: Vec<ProjectSyncFailure>,
    pub total_updated: usize,
}

// ==========================================
// PaletteApi - 调色板 API
// ==========================================

/// 调色板API
///
/// 职责：
/// 1. 从零件采集材料调色板并检测新材料
/// 2. 调色板条目与库存的映射/解除映射
/// 3. 从库存同步单价 (单项目 / 全部项目)
/// 4. 失效传播与下游阶段新鲜度回写
/// 5. 零件导入与维护 (触发 PartsChanged)
pub struct PaletteApi {
    repos: HarvestRepositories,
    // 零件写入 (导入/维护),采集流程只经 repos.parts_source 读取
    parts_repo: Arc<PartsRepository>,
    parts_importer: PartsCsvImporter,
    config_manager: Arc<ConfigManager>,
    propagator: InvalidationPropagator,
    // 事件发布器（依赖倒置：下游重算调度不在本子系统内）
    event_publisher: OptionalEventPublisher,
}

impl PaletteApi {
    /// 创建新的PaletteApi实例
    pub fn new(
        repos: HarvestRepositories,
        parts_repo: Arc<PartsRepository>,
        config_manager: Arc<ConfigManager>,
        event_publisher: Option<Arc<dyn InvalidationEventPublisher>>,
    ) -> Self {
        let event_publisher = match event_publisher {
            Some(p) => OptionalEventPublisher::with_publisher(p),
            None => OptionalEventPublisher::none(),
        };

        Self {
            repos,
            parts_importer: PartsCsvImporter::new(parts_repo.clone()),
            parts_repo,
            config_manager,
            propagator: InvalidationPropagator::new(),
            event_publisher,
        }
    }
}
