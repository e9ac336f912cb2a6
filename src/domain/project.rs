// ==========================================
// 材料采集子系统 - 项目文档
// ==========================================
// 职责: 单个项目范围内的持久化文档 (调色板 + 下游状态)
// 并发: revision 字段用于条件写入 (乐观锁)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::optimization::{
    ConsolidatedCutlistState, OptimizationSnapshot, OptimizationState, OptimizationStatus,
};
use crate::domain::palette::MaterialPalette;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub project_id: String,
    pub name: String,
    pub material_palette: Option<MaterialPalette>, // 首次采集前为 None
    pub optimization_state: OptimizationState,
    pub optimization_status: OptimizationStatus,
    pub consolidated_cutlist: ConsolidatedCutlistState,
    pub revision: i64, // 乐观锁修订号
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProjectDocument {
    /// 创建空项目文档
    pub fn new(project_id: impl Into<String>, name: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            project_id: project_id.into(),
            name: name.into(),
            material_palette: None,
            optimization_state: OptimizationState::default(),
            optimization_status: OptimizationStatus::default(),
            consolidated_cutlist: ConsolidatedCutlistState::default(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn snapshot(&self) -> OptimizationSnapshot {
        OptimizationSnapshot {
            project_id: self.project_id.clone(),
            state: self.optimization_state.clone(),
            status: self.optimization_status.clone(),
            consolidated_cutlist: self.consolidated_cutlist.clone(),
        }
    }
}
