// ==========================================
// 材料采集子系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪 (采集、映射、价格同步、失效)
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub project_id: Option<String>, // 批量操作可为 None
    pub action_type: String,        // 存储为字符串 (ActionType::as_str)
    pub action_ts: NaiveDateTime,
    pub actor: String,

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>,

    pub detail: Option<String>,
}

impl ActionLog {
    /// 创建一条当前时间的操作日志
    pub fn new(
        project_id: Option<&str>,
        action_type: ActionType,
        actor: &str,
        payload_json: Option<JsonValue>,
        detail: Option<String>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.map(|s| s.to_string()),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.to_string(),
            payload_json,
            detail,
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Harvest,         // 材料采集
    MapMaterial,     // 映射到库存
    UnmapMaterial,   // 解除映射
    SyncPrices,      // 库存价格同步
    PartsChanged,    // 零件变更失效
    StageRecomputed, // 外部重算完成
    ImportParts,     // 批量导入零件
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Harvest => "HARVEST_MATERIALS",
            ActionType::MapMaterial => "MAP_MATERIAL",
            ActionType::UnmapMaterial => "UNMAP_MATERIAL",
            ActionType::SyncPrices => "SYNC_PRICES",
            ActionType::PartsChanged => "PARTS_CHANGED",
            ActionType::StageRecomputed => "STAGE_RECOMPUTED",
            ActionType::ImportParts => "IMPORT_PARTS",
        }
    }
}
