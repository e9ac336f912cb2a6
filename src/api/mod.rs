// ==========================================
// 材料采集子系统 - API 层
// ==========================================
// 职责: 对外业务接口,参数校验,错误转换,操作审计
// 红线: 所有写入记录 ActionLog
// ==========================================

pub mod error;
pub mod palette_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use palette_api::{
    BatchPriceSyncResult, MappingResult, PaletteApi, PriceSyncResult, ProjectSyncFailure,
};
