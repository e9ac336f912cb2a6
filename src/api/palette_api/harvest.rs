use super::*;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::HarvestConfigReader;
use crate::domain::action_log::ActionType;
use crate::domain::harvest::HarvestResult;
use crate::engine::palette_builder::build_palette;
use crate::engine::palette_differ::diff_palette;
use crate::engine::usage_aggregator::aggregate_usage;

impl PaletteApi {
    // ==========================================
    // 材料采集
    // ==========================================

    /// 从项目零件采集材料调色板
    ///
    /// # 流程
    /// 1. 读取零件并按 (规范化名称, 厚度) 聚合
    /// 2. 与上一版调色板对比 (新增 / 既有 / 移除)
    /// 3. 构建新调色板 (保留既有映射与备料板)
    /// 4. 出现新材料时传播失效 (Estimation 及下游)
    /// 5. 条件写入 + ActionLog + 事件发布
    ///
    /// # 返回
    /// - Ok(HarvestResult): 采集报告
    /// - Err(ApiError::NotFound): 项目不存在
    /// - Err(ApiError::OptimisticLockFailure): 采集期间项目被其他写入修改
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn harvest_materials(&self, project_id: &str, user_id: &str) -> ApiResult<HarvestResult> {
        Self::require_non_blank(project_id, "项目ID")?;
        Self::require_non_blank(user_id, "操作人")?;

        let default_thickness = self
            .config_manager
            .get_default_thickness_mm()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let config_snapshot = self
            .config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let mut doc = self.load_project(project_id)?;
        let items = self.repos.parts_source.list_design_items_with_parts(project_id)?;
        let buckets = aggregate_usage(&items, default_thickness);

        let now = Utc::now().naive_utc();
        let previous = doc.material_palette.as_ref();
        let diff = diff_palette(
            &buckets,
            previous.map(|p| p.entries.as_slice()).unwrap_or(&[]),
        );
        let output = build_palette(&buckets, previous, &diff, now);

        let mapped_count = output.palette.mapped_count;
        let unmapped_count = output.palette.unmapped_count;
        let total_materials = output.palette.entries.len();
        doc.material_palette = Some(output.palette);

        let triggers: Vec<_> = output.invalidation.into_iter().collect();
        let committed = self.commit(&mut doc, &triggers, now)?;

        let result = HarvestResult {
            project_id: project_id.to_string(),
            new_materials: diff.new_materials,
            existing_materials: diff.existing_materials,
            removed_materials: diff.removed_materials,
            total_materials,
            mapped_count,
            unmapped_count,
            invalidation_version: committed.invalidation_version(),
        };

        let config_snapshot: serde_json::Value =
            serde_json::from_str(&config_snapshot).unwrap_or(serde_json::Value::Null);
        self.record_action(
            Some(project_id),
            ActionType::Harvest,
            user_id,
            json!({
                "design_items": items.len(),
                "default_thickness_mm": default_thickness,
                "new_materials": result.new_materials,
                "removed_materials": result.removed_materials,
                "total_materials": result.total_materials,
                "invalidation_version": result.invalidation_version,
                "revision": committed.revision,
                "config_snapshot": config_snapshot,
            }),
            Some(format!(
                "采集材料: 共{}种, 新增{}种, 移除{}种",
                result.total_materials,
                result.new_materials.len(),
                result.removed_materials.len()
            )),
        );

        tracing::info!(
            total = result.total_materials,
            new = result.new_materials.len(),
            existing = result.existing_materials.len(),
            removed = result.removed_materials.len(),
            mapped = result.mapped_count,
            "材料采集完成"
        );

        Ok(result)
    }
}
