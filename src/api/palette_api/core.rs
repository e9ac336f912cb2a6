use super::*;

use chrono::{NaiveDateTime, Utc};
use serde_json::Value;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::project::ProjectDocument;
use crate::engine::events::InvalidationEvent;
use crate::engine::invalidation::{InvalidationOutcome, InvalidationTrigger};

/// 失效提交的最大尝试次数
pub(super) const MAX_COMMIT_ATTEMPTS: usize = 3;

/// 一次条件写入的结果
pub(super) struct CommitOutcome {
    pub revision: i64,
    pub outcomes: Vec<InvalidationOutcome>,
}

impl CommitOutcome {
    /// 最后一次传播后的版本号
    pub fn invalidation_version(&self) -> Option<u64> {
        self.outcomes.last().map(|o| o.version)
    }

    pub fn reasons(&self) -> Vec<String> {
        self.outcomes.iter().map(|o| o.reason.clone()).collect()
    }
}

impl PaletteApi {
    // ==========================================
    // 内部辅助
    // ==========================================

    pub(super) fn require_non_blank(value: &str, label: &str) -> ApiResult<()> {
        if value.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!("{}不能为空", label)));
        }
        Ok(())
    }

    /// 加载项目文档 (不存在返回 NotFound)
    pub(super) fn load_project(&self, project_id: &str) -> ApiResult<ProjectDocument> {
        Self::require_non_blank(project_id, "项目ID")?;
        self.repos
            .project_repo
            .find_by_id(project_id)?
            .ok_or_else(|| ApiError::NotFound(format!("项目{}不存在", project_id)))
    }

    /// 传播失效并条件写入项目文档
    ///
    /// 失效只作用于内存中的文档,写入失败时不发布任何事件
    pub(super) fn commit(
        &self,
        doc: &mut ProjectDocument,
        triggers: &[InvalidationTrigger],
        now: NaiveDateTime,
    ) -> ApiResult<CommitOutcome> {
        let outcomes = self.propagator.apply_all(doc, triggers, now);
        doc.updated_at = now;

        let revision = self.repos.project_repo.update_document(doc)?;
        doc.revision = revision;

        for (trigger, outcome) in triggers.iter().zip(outcomes.iter()) {
            let event = InvalidationEvent::from_outcome(&doc.project_id, trigger, outcome);
            if let Err(e) = self.event_publisher.publish(event) {
                tracing::warn!(
                    project_id = %doc.project_id,
                    trigger = trigger.kind(),
                    error = %e,
                    "失效事件发布失败"
                );
            }
        }

        Ok(CommitOutcome { revision, outcomes })
    }

    /// 乐观锁冲突时重新执行 op,最多 attempts 次
    ///
    /// op 必须自行重新加载项目文档
    pub(super) fn retry_on_conflict<T>(
        attempts: usize,
        mut op: impl FnMut() -> ApiResult<T>,
    ) -> ApiResult<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Err(ApiError::OptimisticLockFailure(message)) if attempt < attempts => {
                    tracing::warn!(attempt, error = %message, "项目文档写入冲突,重新加载后重试");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// 重新加载项目并提交失效 (冲突自动重试)
    ///
    /// 用于已先行写入外部数据 (零件) 的操作,保证过期标记最终落盘
    pub(super) fn commit_triggers(
        &self,
        project_id: &str,
        triggers: &[InvalidationTrigger],
    ) -> ApiResult<(ProjectDocument, CommitOutcome)> {
        Self::retry_on_conflict(MAX_COMMIT_ATTEMPTS, || {
            let mut doc = self.load_project(project_id)?;
            let committed = self.commit(&mut doc, triggers, Utc::now().naive_utc())?;
            Ok((doc, committed))
        })
    }

    /// 写入操作日志
    ///
    /// 业务写入已提交,审计失败只记录告警,不影响返回结果
    pub(super) fn record_action(
        &self,
        project_id: Option<&str>,
        action_type: ActionType,
        user_id: &str,
        payload: Value,
        detail: Option<String>,
    ) {
        let log = ActionLog::new(project_id, action_type, user_id, Some(payload), detail);
        if let Err(e) = self.repos.action_log_repo.insert(&log) {
            tracing::warn!(
                project_id = ?project_id,
                action_type = action_type.as_str(),
                error = %e,
                "操作日志写入失败"
            );
        }
    }
}
