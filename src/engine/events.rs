// ==========================================
// 材料采集子系统 - 失效事件发布
// ==========================================
// 职责: 定义失效事件发布 trait,实现依赖倒置
// 说明: Engine 层定义 trait,外部下游 (估算/BOM 重算) 实现适配器
// ==========================================

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

use crate::domain::types::PipelineStage;
use crate::engine::invalidation::{InvalidationOutcome, InvalidationTrigger};

// ==========================================
// 失效事件
// ==========================================

/// 项目失效事件
///
/// 在项目文档条件写入成功后发布,version 与持久化的 optimization_status 一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub project_id: String,
    /// 传播后的项目状态版本号
    pub version: u64,
    /// 触发类型 (InvalidationTrigger::kind)
    pub trigger_kind: String,
    pub reason: String,
    /// 本次新转为 stale 的阶段
    pub newly_stale: Vec<PipelineStage>,
}

impl InvalidationEvent {
    pub fn from_outcome(project_id: &str, trigger: &InvalidationTrigger, outcome: &InvalidationOutcome) -> Self {
        Self {
            project_id: project_id.to_string(),
            version: outcome.version,
            trigger_kind: trigger.kind().to_string(),
            reason: outcome.reason.clone(),
            newly_stale: outcome.newly_stale.clone(),
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 失效事件发布者 Trait
pub trait InvalidationEventPublisher: Send + Sync {
    /// 发布失效事件
    ///
    /// # 返回
    /// - `Ok(delivery_id)`: 投递 ID（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: InvalidationEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl InvalidationEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: InvalidationEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - project_id={}, version={}, trigger={}",
            event.project_id,
            event.version,
            event.trigger_kind
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn InvalidationEventPublisher>> 的使用
#[derive(Clone)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn InvalidationEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn InvalidationEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: InvalidationEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - project_id={}, version={}",
                    event.project_id,
                    event.version
                );
                Ok(String::new())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<InvalidationEvent>>);

    impl InvalidationEventPublisher for Recorder {
        fn publish(&self, event: InvalidationEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.0.lock().unwrap().push(event);
            Ok("ok".to_string())
        }
    }

    fn event() -> InvalidationEvent {
        let trigger = InvalidationTrigger::PricesChanged { count: 2 };
        let outcome = InvalidationOutcome {
            version: 7,
            newly_stale: vec![PipelineStage::Estimation],
            reason: trigger.reason(),
        };
        InvalidationEvent::from_outcome("P1", &trigger, &outcome)
    }

    #[test]
    fn test_event_from_outcome() {
        let e = event();
        assert_eq!(e.version, 7);
        assert_eq!(e.trigger_kind, "PRICES_CHANGED");
        assert_eq!(e.reason, "Inventory prices updated: 2 materials");
    }

    #[test]
    fn test_noop_publisher() {
        let result = NoOpEventPublisher.publish(event());
        assert!(result.unwrap().is_empty());
    }

    #[test]
    fn test_optional_publisher_none() {
        let publisher = OptionalEventPublisher::none();
        assert!(!publisher.is_configured());
        assert!(publisher.publish(event()).is_ok());
    }

    #[test]
    fn test_optional_publisher_forwards() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let publisher = OptionalEventPublisher::with_publisher(recorder.clone());
        assert!(publisher.is_configured());

        assert_eq!(publisher.publish(event()).unwrap(), "ok");
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }
}
