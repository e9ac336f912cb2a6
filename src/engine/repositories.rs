// ==========================================
// 材料采集子系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合采集流程所需的 Repository 与外部数据源
// ==========================================

use std::sync::Arc;

use crate::repository::{
    ActionLogRepository, InventorySource, PartsSource, ProjectRepository,
};

/// 采集流程仓储集合
///
/// # 包含的仓储
/// - `project_repo`: 项目文档 (调色板 + 下游状态)
/// - `parts_source`: 零件数据源 (只读)
/// - `inventory_source`: 库存数据源 (只读)
/// - `action_log_repo`: 操作日志
#[derive(Clone)]
pub struct HarvestRepositories {
    pub project_repo: Arc<ProjectRepository>,
    pub parts_source: Arc<dyn PartsSource>,
    pub inventory_source: Arc<dyn InventorySource>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl HarvestRepositories {
    /// 创建新的仓储集合
    pub fn new(
        project_repo: Arc<ProjectRepository>,
        parts_source: Arc<dyn PartsSource>,
        inventory_source: Arc<dyn InventorySource>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            project_repo,
            parts_source,
            inventory_source,
            action_log_repo,
        }
    }
}
