// ==========================================
// 材料采集子系统 - 材料调色板领域模型
// ==========================================
// 职责: 调色板条目、库存映射块、备料板配置
// 不变式:
// - 映射块要么完整存在,要么完全缺失 (Option<InventoryMapping>)
// - mapped_count + unmapped_count == entries.len()
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::harvest::bucket_key;
use crate::domain::types::MaterialType;

// ==========================================
// StockSheet - 备料板配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSheet {
    pub id: String,
    pub length_mm: f64,
    pub width_mm: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl StockSheet {
    pub fn new(id: impl Into<String>, length_mm: f64, width_mm: f64) -> Self {
        Self {
            id: id.into(),
            length_mm,
            width_mm,
            thickness_mm: None,
            unit_cost: None,
            label: None,
        }
    }
}

// ==========================================
// InventoryMapping - 库存映射块
// ==========================================
// 整体写入、整体清除,不允许部分字段存在
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryMapping {
    pub inventory_id: String,
    pub inventory_name: String,
    pub inventory_sku: String,
    pub unit_cost: f64,
    pub mapped_at: NaiveDateTime,
    pub mapped_by: String,
}

// ==========================================
// MaterialPaletteEntry - 调色板条目
// ==========================================
// 身份: (normalized_name, thickness_mm) 不变则 id 不变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialPaletteEntry {
    pub id: String,
    pub design_name: String,     // 最近一次采集看到的原始名称
    pub normalized_name: String, // 规范化名称
    pub thickness_mm: u32,
    pub material_type: MaterialType,
    pub usage_count: i64,
    pub design_item_ids: Vec<String>,
    #[serde(default)]
    pub stock_sheets: Vec<StockSheet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<InventoryMapping>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl MaterialPaletteEntry {
    /// 条目身份键 `<normalized_name>|<thickness_mm>`
    pub fn key(&self) -> String {
        bucket_key(&self.normalized_name, self.thickness_mm)
    }

    pub fn is_mapped(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn inventory_id(&self) -> Option<&str> {
        self.mapping.as_ref().map(|m| m.inventory_id.as_str())
    }

    pub fn unit_cost(&self) -> Option<f64> {
        self.mapping.as_ref().map(|m| m.unit_cost)
    }

    /// 备料板 id 集合 (顺序无关比较用)
    pub fn stock_sheet_ids(&self) -> std::collections::BTreeSet<String> {
        self.stock_sheets.iter().map(|s| s.id.clone()).collect()
    }
}

// ==========================================
// MaterialPalette - 项目材料调色板
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialPalette {
    pub entries: Vec<MaterialPaletteEntry>,
    pub last_harvested_at: Option<NaiveDateTime>,
    pub mapped_count: usize,
    pub unmapped_count: usize,
}

impl MaterialPalette {
    /// 从条目列表全量重算映射计数
    ///
    /// 不做增量加减,避免多次运行后的计数漂移
    pub fn recount(&mut self) {
        let mapped = self.entries.iter().filter(|e| e.is_mapped()).count();
        self.mapped_count = mapped;
        self.unmapped_count = self.entries.len() - mapped;
    }

    pub fn counters_consistent(&self) -> bool {
        self.mapped_count + self.unmapped_count == self.entries.len()
    }

    pub fn find_entry(&self, entry_id: &str) -> Option<&MaterialPaletteEntry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    pub fn find_entry_mut(&mut self, entry_id: &str) -> Option<&mut MaterialPaletteEntry> {
        self.entries.iter_mut().find(|e| e.id == entry_id)
    }

    pub fn find_by_key(&self, normalized_name: &str, thickness_mm: u32) -> Option<&MaterialPaletteEntry> {
        self.entries
            .iter()
            .find(|e| e.normalized_name == normalized_name && e.thickness_mm == thickness_mm)
    }
}
