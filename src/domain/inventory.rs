// ==========================================
// 材料采集子系统 - 库存记录
// ==========================================
// 外部库存数据源的只读视图: 单价 + 库存量
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub inventory_id: String,
    pub sku: String,
    pub name: String,
    pub unit_cost: f64,
    pub stock_level: f64,
    pub updated_at: NaiveDateTime,
}

impl InventoryItem {
    /// 是否存在可用价格 (正数)
    pub fn has_price(&self) -> bool {
        self.unit_cost.is_finite() && self.unit_cost > 0.0
    }
}
