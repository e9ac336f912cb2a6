// ==========================================
// 材料采集子系统 - 核心库
// ==========================================
// 职责: 从项目零件采集材料调色板,维护库存映射,
//       并向下游估算/生产阶段传播失效标记
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 采集与失效规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{MaterialType, PipelineStage};

// 领域实体
pub use domain::{
    ActionLog, ActionType, HarvestResult, InventoryItem, MaterialPalette, MaterialPaletteEntry,
    OptimizationSnapshot, Part, ProjectDocument,
};

// 引擎
pub use engine::{InvalidationPropagator, InvalidationTrigger, MappingRequest};

// API
pub use api::{ApiError, ApiResult, PaletteApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "材料采集子系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
