use super::*;

use std::path::Path;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::api::error::ApiResult;
use crate::domain::action_log::ActionType;
use crate::domain::optimization::OptimizationSnapshot;
use crate::domain::palette::MaterialPalette;
use crate::domain::types::PipelineStage;
use crate::engine::invalidation::InvalidationTrigger;
use crate::importer::PartsImportReport;

impl PaletteApi {
    // ==========================================
    // 失效通知与阶段回写
    // ==========================================

    /// 零件变更通知
    ///
    /// # 返回
    /// - Ok(version): 传播后的项目状态版本号
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub fn notify_parts_changed(&self, project_id: &str, reason: &str, user_id: &str) -> ApiResult<u64> {
        Self::require_non_blank(reason, "变更原因")?;
        Self::require_non_blank(user_id, "操作人")?;

        let mut doc = self.load_project(project_id)?;
        let trigger = InvalidationTrigger::PartsChanged {
            reason: reason.trim().to_string(),
        };
        let now = Utc::now().naive_utc();
        let committed = self.commit(&mut doc, std::slice::from_ref(&trigger), now)?;
        let version = doc.optimization_status.version;
        let newly_stale: Vec<&str> = committed
            .outcomes
            .iter()
            .flat_map(|o| o.newly_stale.iter())
            .map(|s| s.as_str())
            .collect();

        self.record_action(
            Some(project_id),
            ActionType::PartsChanged,
            user_id,
            json!({
                "reason": trigger.reason(),
                "version": version,
                "newly_stale": newly_stale,
            }),
            None,
        );

        tracing::info!(version, "零件变更失效完成");
        Ok(version)
    }

    /// 外部重算完成后回写阶段新鲜度
    ///
    /// 不修改版本号;Production 回写同时清除切割清单过期标记
    #[instrument(skip(self), fields(project_id = %project_id, stage = stage.as_str()))]
    pub fn mark_stage_recomputed(&self, project_id: &str, stage: PipelineStage, user_id: &str) -> ApiResult<()> {
        Self::require_non_blank(user_id, "操作人")?;

        let mut doc = self.load_project(project_id)?;
        let was_stale = self.propagator.mark_stage_fresh(&mut doc, stage);
        let now = Utc::now().naive_utc();
        self.commit(&mut doc, &[], now)?;

        self.record_action(
            Some(project_id),
            ActionType::StageRecomputed,
            user_id,
            json!({
                "stage": stage.as_str(),
                "was_stale": was_stale,
                "version": doc.optimization_status.version,
            }),
            None,
        );

        tracing::info!(was_stale, "阶段重算回写完成");
        Ok(())
    }

    // ==========================================
    // 零件导入
    // ==========================================

    /// 从 CSV 导入零件,有零件写入时触发 PartsChanged
    ///
    /// 其他项目已拥有的 part_id 记为行级错误,不会被改挂
    #[instrument(skip(self, path), fields(project_id = %project_id))]
    pub fn import_parts_csv(&self, project_id: &str, path: &Path, user_id: &str) -> ApiResult<PartsImportReport> {
        Self::require_non_blank(user_id, "操作人")?;
        // 先确认项目存在
        self.load_project(project_id)?;

        let report = self.parts_importer.import_file(project_id, path)?;

        // 零件已落库,失效提交遇到写入冲突时重试
        let invalidation_version = if report.imported_parts > 0 {
            let trigger = InvalidationTrigger::PartsChanged {
                reason: format!("Parts imported: {} parts", report.imported_parts),
            };
            let (_, committed) = self.commit_triggers(project_id, &[trigger])?;
            committed.invalidation_version()
        } else {
            None
        };

        self.record_action(
            Some(project_id),
            ActionType::ImportParts,
            user_id,
            json!({
                "import_id": report.import_id,
                "file": path.display().to_string(),
                "total_rows": report.total_rows,
                "imported_parts": report.imported_parts,
                "design_items": report.design_items,
                "row_errors": report.errors.len(),
                "invalidation_version": invalidation_version,
            }),
            None,
        );

        tracing::info!(
            imported = report.imported_parts,
            row_errors = report.errors.len(),
            "零件导入完成"
        );
        Ok(report)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询项目调色板 (未采集为 None)
    pub fn get_palette(&self, project_id: &str) -> ApiResult<Option<MaterialPalette>> {
        Ok(self.load_project(project_id)?.material_palette)
    }

    /// 查询项目下游优化状态
    pub fn get_optimization_snapshot(&self, project_id: &str) -> ApiResult<OptimizationSnapshot> {
        Ok(self.load_project(project_id)?.snapshot())
    }
}
