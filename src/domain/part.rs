// ==========================================
// 材料采集子系统 - 零件领域模型
// ==========================================
// 职责: 设计项与零件 (外部零件数据源的只读视图)
// 红线: 采集过程从不修改零件
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// DesignItem - 设计项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignItem {
    pub design_item_id: String,
    pub project_id: String,
    pub name: String,
}

// ==========================================
// Part - 零件 (切割件)
// ==========================================
// 尺寸单位: 毫米
// 归属: 恰好属于一个设计项,不跨设计项共享
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub part_id: String,
    pub design_item_id: String,
    pub length_mm: f64,
    pub width_mm: f64,
    pub thickness_mm: Option<f64>, // 缺失时从材料名称推断
    pub quantity: i64,
    pub material_name: Option<String>, // 自由文本
    pub material_id: Option<String>,
}

impl Part {
    /// 零件自带的有效厚度 (毫米,取整)
    ///
    /// 未填写或非正数时返回 None,由调用方按名称推断
    pub fn explicit_thickness_mm(&self) -> Option<u32> {
        self.thickness_mm
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(|t| t.round().max(1.0) as u32)
    }
}

// ==========================================
// DesignItemParts - 设计项及其零件列表
// ==========================================
// 用途: 零件数据源一次返回的聚合单元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignItemParts {
    pub design_item: DesignItem,
    pub parts: Vec<Part>,
}

impl DesignItemParts {
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}
