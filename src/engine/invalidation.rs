// ==========================================
// 材料采集子系统 - 失效传播引擎
// ==========================================
// 状态机 (每阶段): fresh -> stale
// - fresh -> stale: 记录 invalidated_at 与本次原因
// - stale -> stale: 不改时间戳,不追加原因 (保留本轮首个原因)
// - stale -> fresh: 只能由外部重算调用 mark_stage_fresh
// 项目级: 每次事件 version + 1,原因去重累计,切割清单标记为过期
// 流水线: Estimation -> Production,上游失效时下游一并失效
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::project::ProjectDocument;
use crate::domain::types::PipelineStage;

// ==========================================
// InvalidationTrigger - 失效触发事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidationTrigger {
    /// 采集发现新材料
    NewMaterials { names: Vec<String> },
    /// 条目备料板集合变化
    StockSheetsChanged { design_name: String },
    /// 已映射条目改映射到另一库存
    MappingChanged { design_name: String },
    /// 解除映射
    MappingRemoved { design_name: String },
    /// 库存价格同步改变了单价
    PricesChanged { count: usize },
    /// 零件变更 (外部零件编辑/导入)
    PartsChanged { reason: String },
}

impl InvalidationTrigger {
    /// 失效原因文本
    pub fn reason(&self) -> String {
        match self {
            InvalidationTrigger::NewMaterials { names } => {
                format!("New materials discovered: {}", names.join(", "))
            }
            InvalidationTrigger::StockSheetsChanged { design_name } => {
                format!("Stock sheets changed: {}", design_name)
            }
            InvalidationTrigger::MappingChanged { design_name } => {
                format!("Material mapping changed: {}", design_name)
            }
            InvalidationTrigger::MappingRemoved { design_name } => {
                format!("Material mapping removed: {}", design_name)
            }
            InvalidationTrigger::PricesChanged { count } => {
                format!("Inventory prices updated: {} materials", count)
            }
            InvalidationTrigger::PartsChanged { reason } => reason.clone(),
        }
    }

    /// 受影响的最上游阶段
    pub fn stage(&self) -> PipelineStage {
        match self {
            InvalidationTrigger::MappingChanged { .. } | InvalidationTrigger::MappingRemoved { .. } => {
                PipelineStage::Production
            }
            _ => PipelineStage::Estimation,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InvalidationTrigger::NewMaterials { .. } => "NEW_MATERIALS",
            InvalidationTrigger::StockSheetsChanged { .. } => "STOCK_SHEETS_CHANGED",
            InvalidationTrigger::MappingChanged { .. } => "MAPPING_CHANGED",
            InvalidationTrigger::MappingRemoved { .. } => "MAPPING_REMOVED",
            InvalidationTrigger::PricesChanged { .. } => "PRICES_CHANGED",
            InvalidationTrigger::PartsChanged { .. } => "PARTS_CHANGED",
        }
    }
}

// ==========================================
// InvalidationOutcome - 单次传播结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationOutcome {
    pub version: u64,
    pub newly_stale: Vec<PipelineStage>, // 本次由 fresh 转为 stale 的阶段
    pub reason: String,
}

// ==========================================
// InvalidationPropagator - 失效传播器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct InvalidationPropagator;

impl InvalidationPropagator {
    pub fn new() -> Self {
        Self
    }

    /// 将一个触发事件传播到项目文档 (仅修改内存中的文档)
    pub fn apply(
        &self,
        doc: &mut ProjectDocument,
        trigger: &InvalidationTrigger,
        now: NaiveDateTime,
    ) -> InvalidationOutcome {
        let reason = trigger.reason();
        let mut newly_stale = Vec::new();

        for stage in trigger.stage().with_downstream() {
            let state = doc.optimization_state.stage_mut(stage);
            if state.is_stale() {
                continue;
            }
            state.invalidated_at = Some(now);
            state.invalidation_reasons = vec![reason.clone()];
            newly_stale.push(stage);
        }

        if !doc.consolidated_cutlist.is_stale {
            doc.consolidated_cutlist.is_stale = true;
            doc.consolidated_cutlist.stale_since = Some(now);
        }

        let status = &mut doc.optimization_status;
        status.version += 1;
        if !status.reasons.contains(&reason) {
            status.reasons.push(reason.clone());
        }
        status.last_invalidated_at = Some(now);

        tracing::debug!(
            project_id = %doc.project_id,
            trigger = trigger.kind(),
            version = status.version,
            newly_stale = newly_stale.len(),
            "失效传播完成"
        );

        InvalidationOutcome {
            version: status.version,
            newly_stale,
            reason,
        }
    }

    /// 按顺序传播多个触发事件
    pub fn apply_all(
        &self,
        doc: &mut ProjectDocument,
        triggers: &[InvalidationTrigger],
        now: NaiveDateTime,
    ) -> Vec<InvalidationOutcome> {
        triggers.iter().map(|t| self.apply(doc, t, now)).collect()
    }

    /// 外部重算完成后将阶段恢复为 fresh
    ///
    /// 不修改 version;Production 恢复时同时清除切割清单过期标记
    ///
    /// # 返回
    /// - `true`: 阶段此前为 stale
    pub fn mark_stage_fresh(&self, doc: &mut ProjectDocument, stage: PipelineStage) -> bool {
        let state = doc.optimization_state.stage_mut(stage);
        let was_stale = state.is_stale();
        state.invalidated_at = None;
        state.invalidation_reasons.clear();

        if stage == PipelineStage::Production {
            doc.consolidated_cutlist.is_stale = false;
            doc.consolidated_cutlist.stale_since = None;
        }
        was_stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn doc() -> ProjectDocument {
        ProjectDocument::new("P1", "Kitchen", Utc::now().naive_utc())
    }

    #[test]
    fn test_reason_strings() {
        let t = InvalidationTrigger::NewMaterials {
            names: vec!["mfc".to_string(), "oak".to_string()],
        };
        assert_eq!(t.reason(), "New materials discovered: mfc, oak");
        assert_eq!(
            InvalidationTrigger::MappingChanged { design_name: "18mm MFC".to_string() }.reason(),
            "Material mapping changed: 18mm MFC"
        );
        assert_eq!(
            InvalidationTrigger::PricesChanged { count: 3 }.reason(),
            "Inventory prices updated: 3 materials"
        );
    }

    #[test]
    fn test_estimation_cascades_to_production() {
        let mut d = doc();
        let now = Utc::now().naive_utc();
        let out = InvalidationPropagator::new().apply(
            &mut d,
            &InvalidationTrigger::PricesChanged { count: 1 },
            now,
        );

        assert_eq!(out.version, 1);
        assert_eq!(out.newly_stale, vec![PipelineStage::Estimation, PipelineStage::Production]);
        assert!(d.optimization_state.estimation.is_stale());
        assert!(d.optimization_state.production.is_stale());
        assert!(d.consolidated_cutlist.is_stale);
        assert_eq!(d.consolidated_cutlist.stale_since, Some(now));
    }

    #[test]
    fn test_production_trigger_leaves_estimation_fresh() {
        let mut d = doc();
        InvalidationPropagator::new().apply(
            &mut d,
            &InvalidationTrigger::MappingRemoved { design_name: "Oak".to_string() },
            Utc::now().naive_utc(),
        );
        assert!(!d.optimization_state.estimation.is_stale());
        assert_eq!(
            d.optimization_state.production.invalidation_reasons,
            vec!["Material mapping removed: Oak".to_string()]
        );
    }

    #[test]
    fn test_stale_stage_keeps_first_reason() {
        let mut d = doc();
        let p = InvalidationPropagator::new();
        let t0 = Utc::now().naive_utc();
        let t1 = t0 + Duration::minutes(5);

        p.apply(&mut d, &InvalidationTrigger::PartsChanged { reason: "Parts edited".to_string() }, t0);
        let out = p.apply(&mut d, &InvalidationTrigger::PricesChanged { count: 2 }, t1);

        assert!(out.newly_stale.is_empty());
        assert_eq!(d.optimization_state.estimation.invalidated_at, Some(t0));
        assert_eq!(
            d.optimization_state.estimation.invalidation_reasons,
            vec!["Parts edited".to_string()]
        );
        assert_eq!(d.consolidated_cutlist.stale_since, Some(t0));
        // 项目级原因累计
        assert_eq!(d.optimization_status.reasons.len(), 2);
        assert_eq!(d.optimization_status.last_invalidated_at, Some(t1));
    }

    #[test]
    fn test_version_strictly_increases_and_reasons_deduplicated() {
        let mut d = doc();
        let p = InvalidationPropagator::new();
        let now = Utc::now().naive_utc();
        let trigger = InvalidationTrigger::PartsChanged { reason: "Parts edited".to_string() };

        let outcomes = p.apply_all(&mut d, &[trigger.clone(), trigger.clone(), trigger], now);
        let versions: Vec<u64> = outcomes.iter().map(|o| o.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
        assert_eq!(d.optimization_status.reasons, vec!["Parts edited".to_string()]);
    }

    #[test]
    fn test_mark_stage_fresh_keeps_version() {
        let mut d = doc();
        let p = InvalidationPropagator::new();
        let now = Utc::now().naive_utc();
        p.apply(&mut d, &InvalidationTrigger::PricesChanged { count: 1 }, now);

        assert!(p.mark_stage_fresh(&mut d, PipelineStage::Estimation));
        assert!(!d.optimization_state.estimation.is_stale());
        assert!(d.optimization_state.production.is_stale());
        assert!(d.consolidated_cutlist.is_stale);

        assert!(p.mark_stage_fresh(&mut d, PipelineStage::Production));
        assert!(!d.consolidated_cutlist.is_stale);
        assert!(!p.mark_stage_fresh(&mut d, PipelineStage::Production));
        assert_eq!(d.optimization_status.version, 1);

        // 重算后的下一次失效重新开始一轮
        let later = now + Duration::hours(1);
        let out = p.apply(&mut d, &InvalidationTrigger::PricesChanged { count: 4 }, later);
        assert_eq!(out.version, 2);
        assert_eq!(d.optimization_state.estimation.invalidated_at, Some(later));
    }
}
