// ==========================================
// 材料采集子系统 - 库存映射管理
// ==========================================
// 职责: 条目映射/解除映射、单价解析、库存价格刷新
// 不变式: 映射块整体写入/整体清除;每次修改后全量重算计数
// 失效规则:
// - 已映射条目改映射到不同库存 -> 生产阶段失效
// - 备料板 id 集合变化 (顺序无关) -> 估算阶段失效
// - 解除映射 -> 生产阶段失效 (无条件)
// ==========================================

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::InventoryItem;
use crate::domain::palette::{InventoryMapping, MaterialPalette, MaterialPaletteEntry, StockSheet};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::invalidation::InvalidationTrigger;
use crate::repository::error::RepositoryResult;
use crate::repository::inventory_repo::InventorySource;

// ==========================================
// MappingRequest - 映射请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRequest {
    pub inventory_id: String,
    pub inventory_name: String,
    pub inventory_sku: String,
    /// 缺省或为 0 时从库存读取当前单价
    #[serde(default)]
    pub unit_cost: Option<f64>,
    #[serde(default)]
    pub stock_sheets: Vec<StockSheet>,
}

// ==========================================
// MappingChange - 单次映射修改结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MappingChange {
    pub entry: MaterialPaletteEntry,
    pub triggers: Vec<InvalidationTrigger>,
}

/// 价格刷新结果
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceRefresh {
    pub updated: Vec<String>, // 单价发生变化的条目 design_name
    pub errors: Vec<String>,
}

impl PriceRefresh {
    pub fn trigger(&self) -> Option<InvalidationTrigger> {
        (!self.updated.is_empty()).then(|| InvalidationTrigger::PricesChanged {
            count: self.updated.len(),
        })
    }
}

/// 写入映射块与备料板
pub fn apply_mapping(
    palette: &mut MaterialPalette,
    entry_id: &str,
    request: &MappingRequest,
    resolved_cost: f64,
    user_id: &str,
    now: NaiveDateTime,
) -> EngineResult<MappingChange> {
    let entry = palette
        .find_entry_mut(entry_id)
        .ok_or_else(|| EngineError::EntryNotFound {
            entry_id: entry_id.to_string(),
        })?;

    let remapped = entry
        .inventory_id()
        .map(|prev| prev != request.inventory_id)
        .unwrap_or(false);
    let new_sheet_ids: BTreeSet<String> = request.stock_sheets.iter().map(|s| s.id.clone()).collect();
    let sheets_changed = entry.stock_sheet_ids() != new_sheet_ids;

    entry.mapping = Some(InventoryMapping {
        inventory_id: request.inventory_id.clone(),
        inventory_name: request.inventory_name.clone(),
        inventory_sku: request.inventory_sku.clone(),
        unit_cost: resolved_cost,
        mapped_at: now,
        mapped_by: user_id.to_string(),
    });
    entry.stock_sheets = request.stock_sheets.clone();
    entry.updated_at = now;

    let mut triggers = Vec::new();
    if remapped {
        triggers.push(InvalidationTrigger::MappingChanged {
            design_name: entry.design_name.clone(),
        });
    }
    if sheets_changed {
        triggers.push(InvalidationTrigger::StockSheetsChanged {
            design_name: entry.design_name.clone(),
        });
    }

    let entry = entry.clone();
    palette.recount();
    Ok(MappingChange { entry, triggers })
}

/// 清除映射块与备料板 (原子)
pub fn clear_mapping(
    palette: &mut MaterialPalette,
    entry_id: &str,
    now: NaiveDateTime,
) -> EngineResult<MappingChange> {
    let entry = palette
        .find_entry_mut(entry_id)
        .ok_or_else(|| EngineError::EntryNotFound {
            entry_id: entry_id.to_string(),
        })?;

    entry.mapping = None;
    entry.stock_sheets.clear();
    entry.updated_at = now;

    let change = MappingChange {
        triggers: vec![InvalidationTrigger::MappingRemoved {
            design_name: entry.design_name.clone(),
        }],
        entry: entry.clone(),
    };
    palette.recount();
    Ok(change)
}

/// 按 id 查库存,查不到再按 sku
fn lookup_inventory(
    inventory: &dyn InventorySource,
    inventory_id: &str,
    sku: &str,
) -> RepositoryResult<Option<InventoryItem>> {
    if let Some(item) = inventory.find_by_id(inventory_id)? {
        return Ok(Some(item));
    }
    if sku.trim().is_empty() {
        return Ok(None);
    }
    inventory.find_by_sku(sku)
}

/// 解析映射单价
///
/// 请求单价为正数时直接使用;否则读取库存当前单价。
/// 库存查询失败或记录不存在时按 0 继续,不让映射整体失败
pub fn resolve_unit_cost(
    requested: Option<f64>,
    inventory_id: &str,
    sku: &str,
    inventory: &dyn InventorySource,
) -> f64 {
    if let Some(cost) = requested.filter(|c| c.is_finite() && *c > 0.0) {
        return cost;
    }

    match lookup_inventory(inventory, inventory_id, sku) {
        Ok(Some(item)) => item.unit_cost,
        Ok(None) => {
            tracing::warn!(inventory_id, sku, "库存记录不存在,映射单价按 0 处理");
            0.0
        }
        Err(e) => {
            tracing::warn!(inventory_id, sku, error = %e, "库存单价查询失败,映射单价按 0 处理");
            0.0
        }
    }
}

/// 用库存当前单价刷新全部已映射条目
///
/// 差值不超过 epsilon 视为未变化;单条失败只记录错误,不中断其余条目
pub fn refresh_unit_costs(
    palette: &mut MaterialPalette,
    inventory: &dyn InventorySource,
    epsilon: f64,
    now: NaiveDateTime,
) -> PriceRefresh {
    let mut result = PriceRefresh::default();

    for entry in palette.entries.iter_mut() {
        let Some(mapping) = entry.mapping.as_mut() else {
            continue;
        };

        match lookup_inventory(inventory, &mapping.inventory_id, &mapping.inventory_sku) {
            Ok(Some(item)) => {
                if !item.has_price() {
                    continue;
                }
                if (item.unit_cost - mapping.unit_cost).abs() > epsilon {
                    tracing::debug!(
                        entry_id = %entry.id,
                        old_cost = mapping.unit_cost,
                        new_cost = item.unit_cost,
                        "条目单价更新"
                    );
                    mapping.unit_cost = item.unit_cost;
                    entry.updated_at = now;
                    result.updated.push(entry.design_name.clone());
                }
            }
            Ok(None) => result.errors.push(format!(
                "{}: inventory item {} not found",
                entry.design_name, mapping.inventory_id
            )),
            Err(e) => result
                .errors
                .push(format!("{}: {}", entry.design_name, e)),
        }
    }

    palette.recount();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MaterialType;
    use crate::repository::error::RepositoryError;
    use chrono::Utc;
    use std::collections::HashMap;

    struct FakeInventory {
        items: HashMap<String, InventoryItem>,
        fail: bool,
    }

    impl FakeInventory {
        fn with(items: Vec<(&str, &str, f64)>) -> Self {
            Self {
                items: items
                    .into_iter()
                    .map(|(id, sku, cost)| {
                        (
                            id.to_string(),
                            InventoryItem {
                                inventory_id: id.to_string(),
                                sku: sku.to_string(),
                                name: id.to_string(),
                                unit_cost: cost,
                                stock_level: 1.0,
                                updated_at: Utc::now().naive_utc(),
                            },
                        )
                    })
                    .collect(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                items: HashMap::new(),
                fail: true,
            }
        }
    }

    impl InventorySource for FakeInventory {
        fn find_by_id(&self, inventory_id: &str) -> RepositoryResult<Option<InventoryItem>> {
            if self.fail {
                return Err(RepositoryError::DatabaseConnectionError("offline".to_string()));
            }
            Ok(self.items.get(inventory_id).cloned())
        }

        fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<InventoryItem>> {
            if self.fail {
                return Err(RepositoryError::DatabaseConnectionError("offline".to_string()));
            }
            Ok(self.items.values().find(|i| i.sku == sku).cloned())
        }
    }

    fn palette() -> MaterialPalette {
        let now = Utc::now().naive_utc();
        let mut p = MaterialPalette {
            entries: vec![MaterialPaletteEntry {
                id: "e1".to_string(),
                design_name: "18mm Melamine MFC".to_string(),
                normalized_name: "melamine mfc".to_string(),
                thickness_mm: 18,
                material_type: MaterialType::Panel,
                usage_count: 2,
                design_item_ids: vec!["D1".to_string()],
                stock_sheets: vec![],
                mapping: None,
                created_at: now,
                updated_at: now,
            }],
            last_harvested_at: Some(now),
            mapped_count: 0,
            unmapped_count: 0,
        };
        p.recount();
        p
    }

    fn request(inventory_id: &str, sheets: &[&str]) -> MappingRequest {
        MappingRequest {
            inventory_id: inventory_id.to_string(),
            inventory_name: format!("Item {}", inventory_id),
            inventory_sku: format!("SKU-{}", inventory_id),
            unit_cost: None,
            stock_sheets: sheets.iter().map(|id| StockSheet::new(*id, 2440.0, 1220.0)).collect(),
        }
    }

    #[test]
    fn test_first_mapping_updates_counters_without_remap_trigger() {
        let mut p = palette();
        let now = Utc::now().naive_utc();
        let change = apply_mapping(&mut p, "e1", &request("inv1", &[]), 25000.0, "u1", now).unwrap();

        assert!(change.triggers.is_empty());
        assert_eq!(change.entry.unit_cost(), Some(25000.0));
        assert_eq!(p.mapped_count, 1);
        assert_eq!(p.unmapped_count, 0);
        assert_eq!(p.entries[0].mapping.as_ref().unwrap().mapped_by, "u1");
    }

    #[test]
    fn test_remap_to_different_inventory_invalidates_production() {
        let mut p = palette();
        let now = Utc::now().naive_utc();
        apply_mapping(&mut p, "e1", &request("inv1", &[]), 10.0, "u1", now).unwrap();

        let same = apply_mapping(&mut p, "e1", &request("inv1", &[]), 12.0, "u1", now).unwrap();
        assert!(same.triggers.is_empty());

        let change = apply_mapping(&mut p, "e1", &request("inv2", &[]), 10.0, "u1", now).unwrap();
        assert_eq!(
            change.triggers,
            vec![InvalidationTrigger::MappingChanged {
                design_name: "18mm Melamine MFC".to_string()
            }]
        );
        assert_eq!(change.triggers[0].reason(), "Material mapping changed: 18mm Melamine MFC");
        assert_eq!(p.mapped_count, 1);
    }

    #[test]
    fn test_stock_sheet_set_comparison_ignores_order() {
        let mut p = palette();
        let now = Utc::now().naive_utc();

        let first = apply_mapping(&mut p, "e1", &request("inv1", &["s1", "s2"]), 1.0, "u", now).unwrap();
        assert_eq!(
            first.triggers,
            vec![InvalidationTrigger::StockSheetsChanged {
                design_name: "18mm Melamine MFC".to_string()
            }]
        );

        let reordered = apply_mapping(&mut p, "e1", &request("inv1", &["s2", "s1"]), 1.0, "u", now).unwrap();
        assert!(reordered.triggers.is_empty());

        let both = apply_mapping(&mut p, "e1", &request("inv9", &["s3"]), 1.0, "u", now).unwrap();
        assert_eq!(both.triggers.len(), 2);
    }

    #[test]
    fn test_clear_mapping_is_atomic() {
        let mut p = palette();
        let now = Utc::now().naive_utc();
        apply_mapping(&mut p, "e1", &request("inv1", &["s1"]), 5.0, "u", now).unwrap();

        let change = clear_mapping(&mut p, "e1", now).unwrap();
        assert!(change.entry.mapping.is_none());
        assert!(change.entry.stock_sheets.is_empty());
        assert_eq!(p.mapped_count, 0);
        assert_eq!(p.unmapped_count, 1);
        assert_eq!(
            change.triggers,
            vec![InvalidationTrigger::MappingRemoved {
                design_name: "18mm Melamine MFC".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_entry_is_error() {
        let mut p = palette();
        let now = Utc::now().naive_utc();
        assert_eq!(
            apply_mapping(&mut p, "nope", &request("inv1", &[]), 1.0, "u", now).unwrap_err(),
            EngineError::EntryNotFound { entry_id: "nope".to_string() }
        );
        assert!(clear_mapping(&mut p, "nope", now).is_err());
        assert!(p.counters_consistent());
    }

    #[test]
    fn test_resolve_unit_cost() {
        let inv = FakeInventory::with(vec![("inv1", "MFC-W", 25000.0)]);
        assert_eq!(resolve_unit_cost(Some(12.5), "inv1", "MFC-W", &inv), 12.5);
        assert_eq!(resolve_unit_cost(None, "inv1", "MFC-W", &inv), 25000.0);
        assert_eq!(resolve_unit_cost(Some(0.0), "inv1", "MFC-W", &inv), 25000.0);
        // id 不存在时按 sku 回退
        assert_eq!(resolve_unit_cost(None, "legacy-id", "MFC-W", &inv), 25000.0);
        assert_eq!(resolve_unit_cost(None, "ghost", "", &inv), 0.0);
        assert_eq!(resolve_unit_cost(None, "inv1", "MFC-W", &FakeInventory::failing()), 0.0);
    }

    #[test]
    fn test_refresh_unit_costs() {
        let mut p = palette();
        let now = Utc::now().naive_utc();
        apply_mapping(&mut p, "e1", &request("inv1", &[]), 100.0, "u", now).unwrap();

        let unchanged = refresh_unit_costs(&mut p, &FakeInventory::with(vec![("inv1", "x", 100.001)]), 0.005, now);
        assert!(unchanged.updated.is_empty());
        assert!(unchanged.trigger().is_none());

        let changed = refresh_unit_costs(&mut p, &FakeInventory::with(vec![("inv1", "x", 120.0)]), 0.005, now);
        assert_eq!(changed.updated, vec!["18mm Melamine MFC".to_string()]);
        assert_eq!(p.entries[0].unit_cost(), Some(120.0));
        assert_eq!(
            changed.trigger(),
            Some(InvalidationTrigger::PricesChanged { count: 1 })
        );

        let failed = refresh_unit_costs(&mut p, &FakeInventory::failing(), 0.005, now);
        assert_eq!(failed.errors.len(), 1);
        assert_eq!(p.entries[0].unit_cost(), Some(120.0));
    }
}
