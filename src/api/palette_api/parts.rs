use super::*;

use serde_json::json;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::ActionType;
use crate::engine::invalidation::InvalidationTrigger;

impl PaletteApi {
    // ==========================================
    // 零件维护 (均触发 PartsChanged)
    // ==========================================

    /// 修改零件材料名称
    ///
    /// # 返回
    /// - Ok(version): 传播后的项目状态版本号
    #[instrument(skip(self), fields(project_id = %project_id, part_id = %part_id))]
    pub fn update_part_material(
        &self,
        project_id: &str,
        part_id: &str,
        material_name: Option<&str>,
        user_id: &str,
    ) -> ApiResult<u64> {
        Self::require_non_blank(user_id, "操作人")?;
        self.require_part_of_project(project_id, part_id)?;

        let material_name = material_name.map(str::trim).filter(|s| !s.is_empty());
        self.parts_repo
            .update_part_material(part_id, material_name)?;

        let trigger = InvalidationTrigger::PartsChanged {
            reason: format!("Part material changed: {}", part_id),
        };
        let version = self.commit_part_change(project_id, trigger, user_id, material_name)?;
        tracing::info!(version, "零件材料修改完成");
        Ok(version)
    }

    /// 删除零件
    #[instrument(skip(self), fields(project_id = %project_id, part_id = %part_id))]
    pub fn delete_part(&self, project_id: &str, part_id: &str, user_id: &str) -> ApiResult<u64> {
        Self::require_non_blank(user_id, "操作人")?;
        self.require_part_of_project(project_id, part_id)?;

        self.parts_repo.delete_part(part_id)?;

        let trigger = InvalidationTrigger::PartsChanged {
            reason: format!("Part removed: {}", part_id),
        };
        let version = self.commit_part_change(project_id, trigger, user_id, None)?;
        tracing::info!(version, "零件删除完成");
        Ok(version)
    }

    fn require_part_of_project(&self, project_id: &str, part_id: &str) -> ApiResult<()> {
        Self::require_non_blank(part_id, "零件ID")?;
        self.load_project(project_id)?;

        match self.parts_repo.find_part_owner(part_id)? {
            Some(owner) if owner.project_id == project_id => Ok(()),
            _ => Err(ApiError::NotFound(format!(
                "零件{}不属于项目{}",
                part_id, project_id
            ))),
        }
    }

    fn commit_part_change(
        &self,
        project_id: &str,
        trigger: InvalidationTrigger,
        user_id: &str,
        material_name: Option<&str>,
    ) -> ApiResult<u64> {
        let reason = trigger.reason();
        let (doc, _) = self.commit_triggers(project_id, std::slice::from_ref(&trigger))?;
        let version = doc.optimization_status.version;

        self.record_action(
            Some(project_id),
            ActionType::PartsChanged,
            user_id,
            json!({
                "reason": reason,
                "material_name": material_name,
                "version": version,
            }),
            None,
        );
        Ok(version)
    }
}
