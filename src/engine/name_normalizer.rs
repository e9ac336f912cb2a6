// ==========================================
// 材料采集子系统 - 材料名称规范化
// ==========================================
// 职责: 名称规范化 / 厚度提取 / 材料类型推断
// 红线: 任何输入都必须可分桶,空名称落入 "unknown"
// ==========================================
// 厚度默认值 18mm 是策略选择: 名称中没有 <数字>mm 时使用,
// 真正未知厚度的零件必须在零件记录上显式填写厚度
// ==========================================

use crate::domain::types::MaterialType;
use once_cell::sync::Lazy;
use regex::Regex;

/// 名称中缺少厚度标记时的默认厚度 (毫米)
pub const DEFAULT_THICKNESS_MM: u32 = 18;

/// 空名称的分桶名
pub const UNKNOWN_MATERIAL: &str = "unknown";

static THICKNESS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*mm\b").expect("thickness token pattern"));

static BARE_UNIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bmm\b").expect("bare unit pattern"));

// ==========================================
// 材料类型推断规则表 (按优先级排列,首个命中即返回)
// ==========================================
const MATERIAL_TYPE_RULES: &[(&[&str], MaterialType)] = &[
    (
        &["edge", "edging", "edgeband", "edgebanding", "banding", "lipping"],
        MaterialType::Edge,
    ),
    (&["veneer", "veneered"], MaterialType::Veneer),
    (&["glass", "mirror", "glazing", "toughened"], MaterialType::Glass),
    (
        &["aluminium", "aluminum", "alu", "anodised", "anodized"],
        MaterialType::Aluminium,
    ),
    (
        &["steel", "metal", "brass", "bronze", "bar", "rod", "tube", "stainless"],
        MaterialType::MetalBar,
    ),
    (
        &["timber", "oak", "walnut", "ash", "beech", "maple", "hardwood", "lumber", "pine"],
        MaterialType::Timber,
    ),
    (
        &["solid", "corian", "surface", "quartz", "granite", "marble", "compact"],
        MaterialType::Solid,
    ),
];

fn lower_and_unify_separators(raw: &str) -> String {
    raw.to_lowercase().replace(['_', '-'], " ")
}

/// 规范化材料名称
///
/// 小写 → `_`/`-` 替换为空格 → 去除厚度标记 (如 `18mm`) 与单独的 `mm` → 合并空白
pub fn normalize_material_name(raw: Option<&str>) -> String {
    let text = match raw {
        Some(s) if !s.trim().is_empty() => lower_and_unify_separators(s),
        _ => return UNKNOWN_MATERIAL.to_string(),
    };

    let without_thickness = THICKNESS_TOKEN.replace_all(&text, " ");
    let without_unit = BARE_UNIT.replace_all(&without_thickness, " ");

    let collapsed = without_unit.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        UNKNOWN_MATERIAL.to_string()
    } else {
        collapsed
    }
}

/// 从名称中提取厚度 (毫米,四舍五入)
///
/// 取第一个 `<数字>mm` 标记;缺失、无法解析或取整为 0 时返回 `default_mm`
pub fn extract_thickness_mm(raw: Option<&str>, default_mm: u32) -> u32 {
    let Some(text) = raw else {
        return default_mm;
    };
    let text = text.to_lowercase();

    THICKNESS_TOKEN
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.round())
        .filter(|v| *v >= 1.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
        .unwrap_or(default_mm)
}

/// 按规则表推断材料类型 (整词匹配)
pub fn detect_material_type(raw: Option<&str>) -> MaterialType {
    let Some(text) = raw else {
        return MaterialType::Panel;
    };
    let text = lower_and_unify_separators(text);
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    MATERIAL_TYPE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| words.contains(k)))
        .map(|(_, tag)| *tag)
        .unwrap_or(MaterialType::Panel)
}
