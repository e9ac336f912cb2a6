// ==========================================
// 材料采集子系统 - 调色板构建
// ==========================================
// 规则:
// - (名称, 厚度) 命中旧条目: 保留 id / 备料板 / 映射块,刷新用量、引用、类型
// - 未命中: 新建条目 (新 id,无备料板,无映射)
// - 计数从最终条目列表全量重算
// - 有新材料时请求估算阶段失效
// ==========================================

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::domain::harvest::{MaterialUsageBucket, PaletteDiff};
use crate::domain::palette::{MaterialPalette, MaterialPaletteEntry};
use crate::engine::invalidation::InvalidationTrigger;
use crate::engine::name_normalizer::detect_material_type;

/// 构建结果: 新调色板 + 可选的失效请求
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteBuildOutput {
    pub palette: MaterialPalette,
    pub invalidation: Option<InvalidationTrigger>,
}

/// 由用量桶构建新调色板
pub fn build_palette(
    buckets: &BTreeMap<String, MaterialUsageBucket>,
    previous: Option<&MaterialPalette>,
    diff: &PaletteDiff,
    now: NaiveDateTime,
) -> PaletteBuildOutput {
    let previous_by_key: BTreeMap<String, &MaterialPaletteEntry> = previous
        .map(|p| p.entries.iter().map(|e| (e.key(), e)).collect())
        .unwrap_or_default();

    let mut entries: Vec<MaterialPaletteEntry> = buckets
        .iter()
        .map(|(key, bucket)| match previous_by_key.get(key) {
            Some(prev) => refresh_entry(prev, bucket, now),
            None => mint_entry(bucket, now),
        })
        .collect();

    entries.sort_by(|a, b| {
        a.normalized_name
            .cmp(&b.normalized_name)
            .then(a.thickness_mm.cmp(&b.thickness_mm))
    });

    let mut palette = MaterialPalette {
        entries,
        last_harvested_at: Some(now),
        mapped_count: 0,
        unmapped_count: 0,
    };
    palette.recount();

    let invalidation = diff.has_new_materials().then(|| InvalidationTrigger::NewMaterials {
        names: diff.new_materials.clone(),
    });

    PaletteBuildOutput {
        palette,
        invalidation,
    }
}

fn refresh_entry(
    prev: &MaterialPaletteEntry,
    bucket: &MaterialUsageBucket,
    now: NaiveDateTime,
) -> MaterialPaletteEntry {
    let design_item_ids: Vec<String> = bucket.design_item_ids.iter().cloned().collect();
    let material_type = detect_material_type(Some(&bucket.design_name));

    let changed = prev.design_name != bucket.design_name
        || prev.usage_count != bucket.usage_count
        || prev.design_item_ids != design_item_ids
        || prev.material_type != material_type;

    MaterialPaletteEntry {
        design_name: bucket.design_name.clone(),
        material_type,
        usage_count: bucket.usage_count,
        design_item_ids,
        updated_at: if changed { now } else { prev.updated_at },
        ..prev.clone()
    }
}

fn mint_entry(bucket: &MaterialUsageBucket, now: NaiveDateTime) -> MaterialPaletteEntry {
    MaterialPaletteEntry {
        id: Uuid::new_v4().to_string(),
        design_name: bucket.design_name.clone(),
        normalized_name: bucket.normalized_name.clone(),
        thickness_mm: bucket.thickness_mm,
        material_type: detect_material_type(Some(&bucket.design_name)),
        usage_count: bucket.usage_count,
        design_item_ids: bucket.design_item_ids.iter().cloned().collect(),
        stock_sheets: Vec::new(),
        mapping: None,
        created_at: now,
        updated_at: now,
    }
}
