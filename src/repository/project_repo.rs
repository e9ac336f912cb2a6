// ==========================================
// 材料采集子系统 - 项目文档仓储
// ==========================================
// 红线: Repository 不含业务逻辑,只做文档映射
// 并发: update_document 为条件写入 (WHERE revision = ?)
// ==========================================

use crate::domain::project::ProjectDocument;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 项目行原始数据 (JSON 列尚未解析)
struct ProjectRow {
    project_id: String,
    name: String,
    material_palette_json: Option<String>,
    optimization_state_json: String,
    optimization_status_json: String,
    consolidated_cutlist_json: String,
    revision: i64,
    created_at: String,
    updated_at: String,
}

impl ProjectRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            project_id: row.get(0)?,
            name: row.get(1)?,
            material_palette_json: row.get(2)?,
            optimization_state_json: row.get(3)?,
            optimization_status_json: row.get(4)?,
            consolidated_cutlist_json: row.get(5)?,
            revision: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_document(self) -> RepositoryResult<ProjectDocument> {
        let material_palette = match self.material_palette_json.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(parse_json(raw, "material_palette_json")?),
            _ => None,
        };

        Ok(ProjectDocument {
            material_palette,
            optimization_state: parse_json(&self.optimization_state_json, "optimization_state_json")?,
            optimization_status: parse_json(&self.optimization_status_json, "optimization_status_json")?,
            consolidated_cutlist: parse_json(&self.consolidated_cutlist_json, "consolidated_cutlist_json")?,
            revision: self.revision,
            created_at: parse_ts(&self.created_at, "created_at")?,
            updated_at: parse_ts(&self.updated_at, "updated_at")?,
            project_id: self.project_id,
            name: self.name,
        })
    }
}

fn parse_json<T: DeserializeOwned>(raw: &str, column: &str) -> RepositoryResult<T> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::SerializationError {
        column: column.to_string(),
        message: e.to_string(),
    })
}

fn to_json<T: Serialize>(value: &T, column: &str) -> RepositoryResult<String> {
    serde_json::to_string(value).map_err(|e| RepositoryError::SerializationError {
        column: column.to_string(),
        message: e.to_string(),
    })
}

fn parse_ts(raw: &str, field: &str) -> RepositoryResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).map_err(|e| RepositoryError::SerializationError {
        column: field.to_string(),
        message: e.to_string(),
    })
}

// ==========================================
// ProjectRepository - 项目文档仓储
// ==========================================
pub struct ProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepository {
    /// 创建新的ProjectRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建项目文档
    pub fn create(&self, doc: &ProjectDocument) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let palette_json = match &doc.material_palette {
            Some(p) => Some(to_json(p, "material_palette_json")?),
            None => None,
        };

        conn.execute(
            r#"INSERT INTO project (
                project_id, name, material_palette_json,
                optimization_state_json, optimization_status_json, consolidated_cutlist_json,
                revision, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &doc.project_id,
                &doc.name,
                palette_json,
                to_json(&doc.optimization_state, "optimization_state_json")?,
                to_json(&doc.optimization_status, "optimization_status_json")?,
                to_json(&doc.consolidated_cutlist, "consolidated_cutlist_json")?,
                doc.revision,
                doc.created_at.format(TS_FORMAT).to_string(),
                doc.updated_at.format(TS_FORMAT).to_string(),
            ],
        )?;

        Ok(())
    }

    /// 按project_id查询项目文档
    pub fn find_by_id(&self, project_id: &str) -> RepositoryResult<Option<ProjectDocument>> {
        let conn = self.get_conn()?;

        let row = conn
            .query_row(
                r#"SELECT project_id, name, material_palette_json,
                          optimization_state_json, optimization_status_json, consolidated_cutlist_json,
                          revision, created_at, updated_at
                   FROM project
                   WHERE project_id = ?"#,
                params![project_id],
                ProjectRow::from_row,
            )
            .optional()?;

        row.map(ProjectRow::into_document).transpose()
    }

    /// 更新项目文档 (带乐观锁检查)
    ///
    /// # 并发控制
    /// 以 doc.revision 作为期望修订号,成功后修订号 +1
    ///
    /// # 返回
    /// - `Ok(new_revision)`
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: revision不匹配 (其他写入者已更新)
    /// - `RepositoryError::NotFound`: project_id不存在
    pub fn update_document(&self, doc: &ProjectDocument) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let palette_json = match &doc.material_palette {
            Some(p) => Some(to_json(p, "material_palette_json")?),
            None => None,
        };

        let rows_affected = conn.execute(
            r#"UPDATE project
               SET name = ?, material_palette_json = ?,
                   optimization_state_json = ?, optimization_status_json = ?,
                   consolidated_cutlist_json = ?, updated_at = ?,
                   revision = revision + 1
               WHERE project_id = ? AND revision = ?"#,
            params![
                &doc.name,
                palette_json,
                to_json(&doc.optimization_state, "optimization_state_json")?,
                to_json(&doc.optimization_status, "optimization_status_json")?,
                to_json(&doc.consolidated_cutlist, "consolidated_cutlist_json")?,
                doc.updated_at.format(TS_FORMAT).to_string(),
                &doc.project_id,
                doc.revision,
            ],
        )?;

        if rows_affected == 0 {
            // 判断是记录不存在还是revision冲突
            let actual: Option<i64> = conn
                .query_row(
                    "SELECT revision FROM project WHERE project_id = ?",
                    params![&doc.project_id],
                    |row| row.get(0),
                )
                .optional()?;

            return match actual {
                Some(actual_revision) => Err(RepositoryError::OptimisticLockFailure {
                    project_id: doc.project_id.clone(),
                    expected: doc.revision,
                    actual: actual_revision,
                }),
                None => Err(RepositoryError::NotFound {
                    entity: "Project".to_string(),
                    id: doc.project_id.clone(),
                }),
            };
        }

        Ok(doc.revision + 1)
    }

    /// 查询全部项目ID
    pub fn list_project_ids(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT project_id FROM project ORDER BY project_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// 查询已有调色板的项目ID (价格批量同步用)
    pub fn list_project_ids_with_palette(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT project_id FROM project WHERE material_palette_json IS NOT NULL ORDER BY project_id",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }
}
