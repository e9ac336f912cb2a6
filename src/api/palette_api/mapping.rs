use super::*;

use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionType;
use crate::engine::error::EngineError;
use crate::engine::mapping_manager::{
    apply_mapping, clear_mapping, resolve_unit_cost, MappingChange, MappingRequest,
};

impl PaletteApi {
    // ==========================================
    // 库存映射
    // ==========================================

    /// 将调色板条目映射到库存
    ///
    /// # 失效规则
    /// - 更换库存ID: MappingChanged (Production)
    /// - 备料板集合变化: StockSheetsChanged (Estimation 及下游)
    /// - 首次映射且未带备料板: 不触发失效
    ///
    /// # 单价
    /// 请求单价缺省或为 0 时读取库存单价;库存不可用时按 0 继续
    #[instrument(skip(self, request), fields(project_id = %project_id, entry_id = %entry_id))]
    pub fn map_material_to_inventory(
        &self,
        project_id: &str,
        entry_id: &str,
        request: MappingRequest,
        user_id: &str,
    ) -> ApiResult<MappingResult> {
        Self::require_non_blank(entry_id, "条目ID")?;
        Self::require_non_blank(user_id, "操作人")?;
        Self::require_non_blank(&request.inventory_id, "库存ID")?;
        if let Some(cost) = request.unit_cost {
            if !cost.is_finite() || cost < 0.0 {
                return Err(ApiError::InvalidInput(format!("单价无效: {}", cost)));
            }
        }

        let mut doc = self.load_project(project_id)?;
        let palette = doc
            .material_palette
            .as_mut()
            .ok_or_else(|| EngineError::PaletteNotFound {
                project_id: project_id.to_string(),
            })?;
        if palette.find_entry(entry_id).is_none() {
            return Err(EngineError::EntryNotFound {
                entry_id: entry_id.to_string(),
            }
            .into());
        }

        let resolved_cost = resolve_unit_cost(
            request.unit_cost,
            &request.inventory_id,
            &request.inventory_sku,
            self.repos.inventory_source.as_ref(),
        );
        let now = Utc::now().naive_utc();
        let change = apply_mapping(palette, entry_id, &request, resolved_cost, user_id, now)?;

        let result = self.persist_mapping_change(&mut doc, change, now)?;

        self.record_action(
            Some(project_id),
            ActionType::MapMaterial,
            user_id,
            json!({
                "entry_id": entry_id,
                "inventory_id": request.inventory_id,
                "inventory_sku": request.inventory_sku,
                "unit_cost": resolved_cost,
                "stock_sheets": request.stock_sheets.len(),
                "invalidation_reasons": result.invalidation_reasons,
            }),
            Some(format!(
                "映射材料 {} -> {}",
                result.entry.design_name, request.inventory_name
            )),
        );

        tracing::info!(
            inventory_id = %request.inventory_id,
            unit_cost = resolved_cost,
            invalidated = result.invalidation_version.is_some(),
            "材料映射完成"
        );
        Ok(result)
    }

    /// 解除调色板条目的库存映射
    ///
    /// 映射块与备料板一并清除,总是触发 MappingRemoved (Production)
    #[instrument(skip(self), fields(project_id = %project_id, entry_id = %entry_id))]
    pub fn unmap_material(&self, project_id: &str, entry_id: &str, user_id: &str) -> ApiResult<MappingResult> {
        Self::require_non_blank(entry_id, "条目ID")?;
        Self::require_non_blank(user_id, "操作人")?;

        let mut doc = self.load_project(project_id)?;
        let palette = doc
            .material_palette
            .as_mut()
            .ok_or_else(|| EngineError::PaletteNotFound {
                project_id: project_id.to_string(),
            })?;

        let now = Utc::now().naive_utc();
        let previous_inventory = palette
            .find_entry(entry_id)
            .and_then(|e| e.inventory_id().map(|s| s.to_string()));
        let change = clear_mapping(palette, entry_id, now)?;

        let result = self.persist_mapping_change(&mut doc, change, now)?;

        self.record_action(
            Some(project_id),
            ActionType::UnmapMaterial,
            user_id,
            json!({
                "entry_id": entry_id,
                "previous_inventory_id": previous_inventory,
                "invalidation_version": result.invalidation_version,
            }),
            Some(format!("解除映射 {}", result.entry.design_name)),
        );

        tracing::info!(
            previous_inventory = ?previous_inventory,
            "解除映射完成"
        );
        Ok(result)
    }

    fn persist_mapping_change(
        &self,
        doc: &mut crate::domain::project::ProjectDocument,
        change: MappingChange,
        now: chrono::NaiveDateTime,
    ) -> ApiResult<MappingResult> {
        let committed = self.commit(doc, &change.triggers, now)?;
        let (mapped_count, unmapped_count) = doc
            .material_palette
            .as_ref()
            .map(|p| (p.mapped_count, p.unmapped_count))
            .unwrap_or((0, 0));

        Ok(MappingResult {
            entry: change.entry,
            mapped_count,
            unmapped_count,
            invalidation_version: committed.invalidation_version(),
            invalidation_reasons: committed.reasons(),
        })
    }
}
