// ==========================================
// 材料采集子系统 - 调色板差异计算
// ==========================================
// new/existing: 仅按规范化名称判断,厚度变化不算新材料
// removed: 旧条目的 (名称, 厚度) 键不再有对应用量桶,按名称报告
// 三个列表均排序去重
// ==========================================

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::harvest::{MaterialUsageBucket, PaletteDiff};
use crate::domain::palette::MaterialPaletteEntry;

/// 计算本次用量桶与上一版调色板的差异
pub fn diff_palette(
    buckets: &BTreeMap<String, MaterialUsageBucket>,
    previous_entries: &[MaterialPaletteEntry],
) -> PaletteDiff {
    let previous_names: BTreeSet<&str> = previous_entries
        .iter()
        .map(|e| e.normalized_name.as_str())
        .collect();

    let mut new_materials = BTreeSet::new();
    let mut existing_materials = BTreeSet::new();
    for bucket in buckets.values() {
        if previous_names.contains(bucket.normalized_name.as_str()) {
            existing_materials.insert(bucket.normalized_name.clone());
        } else {
            new_materials.insert(bucket.normalized_name.clone());
        }
    }

    let removed_materials: BTreeSet<String> = previous_entries
        .iter()
        .filter(|e| !buckets.contains_key(&e.key()))
        .map(|e| e.normalized_name.clone())
        .collect();

    PaletteDiff {
        new_materials: new_materials.into_iter().collect(),
        existing_materials: existing_materials.into_iter().collect(),
        removed_materials: removed_materials.into_iter().collect(),
    }
}
