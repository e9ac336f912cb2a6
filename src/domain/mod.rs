// ==========================================
// 材料采集子系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod harvest;
pub mod inventory;
pub mod optimization;
pub mod palette;
pub mod part;
pub mod project;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use harvest::{bucket_key, HarvestResult, MaterialUsageBucket, PaletteDiff};
pub use inventory::InventoryItem;
pub use optimization::{
    ConsolidatedCutlistState, OptimizationSnapshot, OptimizationState, OptimizationStatus,
    StageState,
};
pub use palette::{InventoryMapping, MaterialPalette, MaterialPaletteEntry, StockSheet};
pub use part::{DesignItem, DesignItemParts, Part};
pub use project::ProjectDocument;
pub use types::{MaterialType, PipelineStage};
