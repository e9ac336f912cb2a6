// ==========================================
// 材料采集子系统 - 采集配置读取 Trait
// ==========================================
// 职责: 定义采集/价格同步所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

// ==========================================
// HarvestConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait HarvestConfigReader: Send + Sync {
    /// 名称中缺少厚度标记时的默认厚度（毫米）
    ///
    /// # 默认值
    /// - 18
    async fn get_default_thickness_mm(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// 价格同步判定“单价变化”的最小差值
    ///
    /// # 默认值
    /// - 0.005
    async fn get_price_sync_epsilon(&self) -> Result<f64, Box<dyn Error + Send + Sync>>;
}
