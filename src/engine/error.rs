// ==========================================
// 材料采集子系统 - 引擎层错误类型
// ==========================================
// 红线: 对不存在的调色板/条目操作是前置条件失败,不允许静默 no-op
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("调色板条目不存在: entry_id={entry_id}")]
    EntryNotFound { entry_id: String },

    #[error("项目尚未采集材料调色板: project_id={project_id}")]
    PaletteNotFound { project_id: String },
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
