// ==========================================
// 材料采集子系统 - 应用层
// ==========================================
// 职责: 组装连接、仓储与API,供 CLI 入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
