// ==========================================
// 材料采集子系统 - 引擎层
// ==========================================
// 职责: 名称规范化、用量聚合、调色板差异与构建、映射管理、失效传播
// 红线: Engine 不拼 SQL, 所有失效必须输出 reason
// ==========================================

pub mod error;
pub mod events;
pub mod invalidation;
pub mod mapping_manager;
pub mod name_normalizer;
pub mod palette_builder;
pub mod palette_differ;
pub mod repositories;
pub mod usage_aggregator;

// 重导出核心引擎
pub use error::{EngineError, EngineResult};
pub use events::{
    InvalidationEvent, InvalidationEventPublisher, NoOpEventPublisher, OptionalEventPublisher,
};
pub use invalidation::{InvalidationOutcome, InvalidationPropagator, InvalidationTrigger};
pub use mapping_manager::{
    apply_mapping, clear_mapping, refresh_unit_costs, resolve_unit_cost, MappingChange,
    MappingRequest, PriceRefresh,
};
pub use name_normalizer::{
    detect_material_type, extract_thickness_mm, normalize_material_name, DEFAULT_THICKNESS_MM,
    UNKNOWN_MATERIAL,
};
pub use palette_builder::{build_palette, PaletteBuildOutput};
pub use palette_differ::diff_palette;
pub use repositories::HarvestRepositories;
pub use usage_aggregator::{aggregate_usage, classify_part};
