// ==========================================
// 材料采集子系统 - 领域类型定义
// ==========================================
// 职责: 材料类型、下游流水线阶段等闭合枚举
// 序列化格式: SCREAMING_SNAKE_CASE (与持久化文档一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 材料类型 (Material Type)
// ==========================================
// 由材料名称关键字推断,推断顺序见 engine::name_normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaterialType {
    Panel,     // 板材 (默认)
    Solid,     // 实体面材
    Veneer,    // 木皮
    Edge,      // 封边条
    Glass,     // 玻璃
    Timber,    // 原木/实木
    MetalBar,  // 金属型材
    Aluminium, // 铝材
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Panel => "PANEL",
            MaterialType::Solid => "SOLID",
            MaterialType::Veneer => "VENEER",
            MaterialType::Edge => "EDGE",
            MaterialType::Glass => "GLASS",
            MaterialType::Timber => "TIMBER",
            MaterialType::MetalBar => "METAL_BAR",
            MaterialType::Aluminium => "ALUMINIUM",
        }
    }
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 下游流水线阶段 (Pipeline Stage)
// ==========================================
// 顺序: Estimation -> Production (BOM 导出)
// 上游阶段失效时,所有下游阶段随之失效
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Estimation, // 估算
    Production, // 生产 / BOM 导出
}

impl PipelineStage {
    /// 全部阶段 (按流水线顺序)
    pub const ALL: [PipelineStage; 2] = [PipelineStage::Estimation, PipelineStage::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Estimation => "ESTIMATION",
            PipelineStage::Production => "PRODUCTION",
        }
    }

    /// 本阶段及其全部下游阶段
    pub fn with_downstream(&self) -> Vec<PipelineStage> {
        PipelineStage::ALL
            .iter()
            .copied()
            .filter(|stage| stage >= self)
            .collect()
    }

    pub fn parse(s: &str) -> Option<PipelineStage> {
        match s.trim().to_uppercase().as_str() {
            "ESTIMATION" => Some(PipelineStage::Estimation),
            "PRODUCTION" | "BOM" => Some(PipelineStage::Production),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
