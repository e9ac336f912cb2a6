// ==========================================
// 材料采集子系统 - 材料用量聚合
// ==========================================
// 输入: 项目全部设计项的零件
// 输出: 用量桶 (键 = 规范化名称|厚度)
// 红线: 不丢弃任何零件,缺失/无效名称计入 "unknown"
// ==========================================

use std::collections::{BTreeMap, BTreeSet};

use tracing::instrument;

use crate::domain::harvest::{bucket_key, MaterialUsageBucket};
use crate::domain::part::{DesignItemParts, Part};
use crate::engine::name_normalizer::{extract_thickness_mm, normalize_material_name};

/// 单个零件的分桶结果 (规范化名称, 厚度)
pub fn classify_part(part: &Part, default_thickness_mm: u32) -> (String, u32) {
    let raw = part.material_name.as_deref();
    let normalized = normalize_material_name(raw);
    let thickness = part
        .explicit_thickness_mm()
        .unwrap_or_else(|| extract_thickness_mm(raw, default_thickness_mm));
    (normalized, thickness)
}

/// 聚合项目零件用量
///
/// 结果与零件顺序无关 (按键聚合);同一桶的 design_name 取迭代顺序中最后一个原始名称
#[instrument(skip(items), fields(design_items = items.len()))]
pub fn aggregate_usage(
    items: &[DesignItemParts],
    default_thickness_mm: u32,
) -> BTreeMap<String, MaterialUsageBucket> {
    let mut buckets: BTreeMap<String, MaterialUsageBucket> = BTreeMap::new();
    let mut part_count = 0usize;

    for item in items {
        for part in &item.parts {
            part_count += 1;
            let (normalized, thickness) = classify_part(part, default_thickness_mm);
            let design_name = part
                .material_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| normalized.clone());

            let bucket = buckets
                .entry(bucket_key(&normalized, thickness))
                .or_insert_with(|| MaterialUsageBucket {
                    normalized_name: normalized.clone(),
                    thickness_mm: thickness,
                    design_name: design_name.clone(),
                    usage_count: 0,
                    design_item_ids: BTreeSet::new(),
                });

            bucket.design_name = design_name;
            bucket.usage_count = bucket.usage_count.saturating_add(part.quantity.max(0));
            bucket
                .design_item_ids
                .insert(item.design_item.design_item_id.clone());
        }
    }

    tracing::debug!(parts = part_count, buckets = buckets.len(), "零件用量聚合完成");
    buckets
}
