// ==========================================
// 材料采集子系统 - 下游优化状态模型
// ==========================================
// 职责: 估算/生产阶段的新鲜度、切割清单粗粒度标记、项目级失效日志
// 状态机: fresh (无 invalidated_at) -> stale (有 invalidated_at)
// 红线: stale 只能由外部重算清除,失效路径从不清除原因
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::PipelineStage;

// ==========================================
// StageState - 单阶段状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub invalidation_reasons: Vec<String>,
}

impl StageState {
    pub fn is_stale(&self) -> bool {
        self.invalidated_at.is_some()
    }
}

// ==========================================
// OptimizationState - 每项目阶段状态
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizationState {
    #[serde(default)]
    pub estimation: StageState,
    #[serde(default)]
    pub production: StageState,
}

impl OptimizationState {
    pub fn stage(&self, stage: PipelineStage) -> &StageState {
        match stage {
            PipelineStage::Estimation => &self.estimation,
            PipelineStage::Production => &self.production,
        }
    }

    pub fn stage_mut(&mut self, stage: PipelineStage) -> &mut StageState {
        match stage {
            PipelineStage::Estimation => &mut self.estimation,
            PipelineStage::Production => &mut self.production,
        }
    }
}

// ==========================================
// OptimizationStatus - 项目级失效日志
// ==========================================
// version 单调递增,是外部消费者轮询 "是否有变化" 的权威信号
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizationStatus {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub reasons: Vec<String>, // 去重后的累计原因
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_invalidated_at: Option<NaiveDateTime>,
}

// ==========================================
// ConsolidatedCutlistState - 合并切割清单标记
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsolidatedCutlistState {
    #[serde(default)]
    pub is_stale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stale_since: Option<NaiveDateTime>,
}

// ==========================================
// OptimizationSnapshot - 对外查询视图
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationSnapshot {
    pub project_id: String,
    pub state: OptimizationState,
    pub status: OptimizationStatus,
    pub consolidated_cutlist: ConsolidatedCutlistState,
}
