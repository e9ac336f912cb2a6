use super::*;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::config::HarvestConfigReader;
use crate::domain::action_log::ActionType;
use crate::engine::error::EngineError;
use crate::engine::mapping_manager::refresh_unit_costs;

impl PaletteApi {
    // ==========================================
    // 价格同步
    // ==========================================

    /// 用库存当前单价刷新项目调色板
    ///
    /// # 说明
    /// - 单条目失败记录到 errors,不中断其余条目
    /// - 有单价变化时触发 PricesChanged (Estimation 及下游)
    /// - 无变化时不写项目文档
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn sync_palette_prices_from_inventory(
        &self,
        project_id: &str,
        user_id: &str,
    ) -> ApiResult<PriceSyncResult> {
        Self::require_non_blank(user_id, "操作人")?;
        let epsilon = self
            .config_manager
            .get_price_sync_epsilon()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        self.sync_project_prices(project_id, user_id, epsilon)
    }

    /// 同步全部已采集项目的单价
    ///
    /// 单个项目失败只记录,继续处理后续项目
    #[instrument(skip(self))]
    pub async fn sync_all_project_prices(&self, user_id: &str) -> ApiResult<BatchPriceSyncResult> {
        Self::require_non_blank(user_id, "操作人")?;
        let epsilon = self
            .config_manager
            .get_price_sync_epsilon()
            .await
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let project_ids = self.repos.project_repo.list_project_ids_with_palette()?;
        let mut batch = BatchPriceSyncResult::default();

        for project_id in project_ids {
            match self.sync_project_prices(&project_id, user_id, epsilon) {
                Ok(result) => {
                    batch.total_updated += result.updated;
                    batch.projects.push(result);
                }
                Err(e) => {
                    tracing::error!(project_id = %project_id, error = %e, "项目价格同步失败");
                    batch.failures.push(ProjectSyncFailure {
                        project_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            projects = batch.projects.len(),
            failures = batch.failures.len(),
            total_updated = batch.total_updated,
            "批量价格同步完成"
        );
        Ok(batch)
    }

    fn sync_project_prices(&self, project_id: &str, user_id: &str, epsilon: f64) -> ApiResult<PriceSyncResult> {
        let mut doc = self.load_project(project_id)?;
        let palette = doc
            .material_palette
            .as_mut()
            .ok_or_else(|| EngineError::PaletteNotFound {
                project_id: project_id.to_string(),
            })?;

        let now = Utc::now().naive_utc();
        let refresh = refresh_unit_costs(palette, self.repos.inventory_source.as_ref(), epsilon, now);

        let invalidation_version = match refresh.trigger() {
            Some(trigger) => self.commit(&mut doc, &[trigger], now)?.invalidation_version(),
            None => None,
        };

        let result = PriceSyncResult {
            project_id: project_id.to_string(),
            updated: refresh.updated.len(),
            updated_materials: refresh.updated,
            errors: refresh.errors,
            invalidation_version,
        };

        self.record_action(
            Some(project_id),
            ActionType::SyncPrices,
            user_id,
            json!({
                "updated_materials": result.updated_materials,
                "errors": result.errors,
                "epsilon": epsilon,
                "invalidation_version": result.invalidation_version,
            }),
            Some(format!(
                "价格同步: 更新{}条, 失败{}条",
                result.updated,
                result.errors.len()
            )),
        );

        if !result.errors.is_empty() {
            tracing::warn!(
                project_id = %project_id,
                errors = result.errors.len(),
                "部分条目价格同步失败"
            );
        }
        tracing::info!(project_id = %project_id, updated = result.updated, "项目价格同步完成");
        Ok(result)
    }
}
