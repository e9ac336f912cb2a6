// ==========================================
// 材料采集子系统 - 采集过程临时对象
// ==========================================
// 职责: 用量桶、调色板差异、采集报告
// 说明: 每次采集从零重算,均不直接持久化
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 用量桶键 `<normalized_name>|<thickness_mm>`
pub fn bucket_key(normalized_name: &str, thickness_mm: u32) -> String {
    format!("{}|{}", normalized_name, thickness_mm)
}

// ==========================================
// MaterialUsageBucket - 材料用量桶
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialUsageBucket {
    pub normalized_name: String,
    pub thickness_mm: u32,
    pub design_name: String, // 最近一次看到的原始名称
    pub usage_count: i64,    // 零件数量之和
    pub design_item_ids: BTreeSet<String>,
}

impl MaterialUsageBucket {
    pub fn key(&self) -> String {
        bucket_key(&self.normalized_name, self.thickness_mm)
    }
}

// ==========================================
// PaletteDiff - 调色板差异
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaletteDiff {
    pub new_materials: Vec<String>,
    pub existing_materials: Vec<String>,
    pub removed_materials: Vec<String>,
}

impl PaletteDiff {
    pub fn has_new_materials(&self) -> bool {
        !self.new_materials.is_empty()
    }
}

// ==========================================
// HarvestResult - 单次采集报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    pub project_id: String,
    pub new_materials: Vec<String>,
    pub existing_materials: Vec<String>,
    pub removed_materials: Vec<String>,
    pub total_materials: usize,
    pub mapped_count: usize,
    pub unmapped_count: usize,
    /// 本次采集触发失效后的项目状态版本号 (未触发为 None)
    pub invalidation_version: Option<u64>,
}
