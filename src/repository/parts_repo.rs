// ==========================================
// 材料采集子系统 - 设计项/零件数据仓储
// ==========================================
// 职责: 零件数据源 (采集只读) + 零件维护写入 (导入/编辑)
// 红线: 采集路径只通过 PartsSource 读取,从不修改零件
// ==========================================

use crate::domain::part::{DesignItem, DesignItemParts, Part};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// 零件归属不可转移: part_id 冲突时只更新同一设计项下的行
const UPSERT_PART_SQL: &str = r#"INSERT INTO part (
        part_id, design_item_id, length_mm, width_mm, thickness_mm,
        quantity, material_name, material_id
    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON CONFLICT(part_id) DO UPDATE SET
        length_mm = excluded.length_mm,
        width_mm = excluded.width_mm,
        thickness_mm = excluded.thickness_mm,
        quantity = excluded.quantity,
        material_name = excluded.material_name,
        material_id = excluded.material_id
    WHERE part.design_item_id = excluded.design_item_id"#;

/// 零件当前归属 (设计项, 项目)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartOwner {
    pub design_item_id: String,
    pub project_id: String,
}

fn query_part_owner(conn: &Connection, part_id: &str) -> rusqlite::Result<Option<PartOwner>> {
    conn.query_row(
        r#"SELECT p.design_item_id, d.project_id
           FROM part p
           JOIN design_item d ON d.design_item_id = p.design_item_id
           WHERE p.part_id = ?"#,
        params![part_id],
        |row| {
            Ok(PartOwner {
                design_item_id: row.get(0)?,
                project_id: row.get(1)?,
            })
        },
    )
    .optional()
}

fn part_owned_elsewhere(conn: &Connection, part_id: &str) -> RepositoryError {
    match query_part_owner(conn, part_id) {
        Ok(Some(owner)) => RepositoryError::UniqueConstraintViolation(format!(
            "part {} belongs to design item {}",
            part_id, owner.design_item_id
        )),
        Ok(None) => RepositoryError::NotFound {
            entity: "Part".to_string(),
            id: part_id.to_string(),
        },
        Err(e) => e.into(),
    }
}

// ==========================================
// PartsSource Trait - 零件数据源
// ==========================================
// 用途: 采集流程读取项目的设计项与零件
// 实现者: PartsRepository (rusqlite),测试中可替换为内存实现
pub trait PartsSource: Send + Sync {
    /// 查询项目下全部设计项及其零件 (按 design_item_id 排序)
    fn list_design_items_with_parts(&self, project_id: &str) -> RepositoryResult<Vec<DesignItemParts>>;
}

// ==========================================
// PartsRepository - 零件仓储
// ==========================================
pub struct PartsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PartsRepository {
    /// 创建新的PartsRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 创建或更新设计项
    pub fn upsert_design_item(&self, item: &DesignItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO design_item (design_item_id, project_id, name)
               VALUES (?, ?, ?)
               ON CONFLICT(design_item_id) DO UPDATE SET name = excluded.name"#,
            params![&item.design_item_id, &item.project_id, &item.name],
        )?;
        Ok(())
    }

    /// 插入或替换零件
    pub fn upsert_part(&self, part: &Part) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            UPSERT_PART_SQL,
            params![
                &part.part_id,
                &part.design_item_id,
                part.length_mm,
                part.width_mm,
                part.thickness_mm,
                part.quantity,
                &part.material_name,
                &part.material_id,
            ],
        )?;
        if changed == 0 {
            return Err(part_owned_elsewhere(&conn, &part.part_id));
        }
        Ok(())
    }

    /// 批量写入设计项与零件 (单事务)
    ///
    /// 已归属其他设计项的 part_id 不会被改写,也不计入写入数
    ///
    /// # 返回
    /// - `Ok(part_count)`: 写入的零件数
    pub fn batch_upsert(&self, items: &[DesignItemParts]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for item in items {
            tx.execute(
                r#"INSERT INTO design_item (design_item_id, project_id, name)
                   VALUES (?, ?, ?)
                   ON CONFLICT(design_item_id) DO UPDATE SET name = excluded.name"#,
                params![
                    &item.design_item.design_item_id,
                    &item.design_item.project_id,
                    &item.design_item.name
                ],
            )?;

            for part in &item.parts {
                let changed = tx.execute(UPSERT_PART_SQL,
                    params![
                        &part.part_id,
                        &part.design_item_id,
                        part.length_mm,
                        part.width_mm,
                        part.thickness_mm,
                        part.quantity,
                        &part.material_name,
                        &part.material_id,
                    ],
                )?;
                count += changed;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 修改零件材料名称
    pub fn update_part_material(&self, part_id: &str, material_name: Option<&str>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE part SET material_name = ? WHERE part_id = ?",
            params![material_name, part_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Part".to_string(),
                id: part_id.to_string(),
            });
        }
        Ok(())
    }

    /// 删除零件
    pub fn delete_part(&self, part_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM part WHERE part_id = ?", params![part_id])?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Part".to_string(),
                id: part_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查询设计项
    pub fn find_design_item(&self, design_item_id: &str) -> RepositoryResult<Option<DesignItem>> {
        let conn = self.get_conn()?;
        let item = conn
            .query_row(
                "SELECT design_item_id, project_id, name FROM design_item WHERE design_item_id = ?",
                params![design_item_id],
                |row| {
                    Ok(DesignItem {
                        design_item_id: row.get(0)?,
                        project_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(item)
    }

    /// 查询零件当前归属
    pub fn find_part_owner(&self, part_id: &str) -> RepositoryResult<Option<PartOwner>> {
        let conn = self.get_conn()?;
        Ok(query_part_owner(&conn, part_id)?)
    }

    fn map_part(row: &Row) -> rusqlite::Result<Part> {
        Ok(Part {
            part_id: row.get(0)?,
            design_item_id: row.get(1)?,
            length_mm: row.get(2)?,
            width_mm: row.get(3)?,
            thickness_mm: row.get(4)?,
            quantity: row.get(5)?,
            material_name: row.get(6)?,
            material_id: row.get(7)?,
        })
    }
}

impl PartsSource for PartsRepository {
    fn list_design_items_with_parts(&self, project_id: &str) -> RepositoryResult<Vec<DesignItemParts>> {
        let conn = self.get_conn()?;

        let mut item_stmt = conn.prepare(
            "SELECT design_item_id, project_id, name FROM design_item WHERE project_id = ? ORDER BY design_item_id",
        )?;
        let mut grouped: BTreeMap<String, DesignItemParts> = BTreeMap::new();
        let items = item_stmt.query_map(params![project_id], |row| {
            Ok(DesignItem {
                design_item_id: row.get(0)?,
                project_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        for item in items {
            let item = item?;
            grouped.insert(
                item.design_item_id.clone(),
                DesignItemParts {
                    design_item: item,
                    parts: Vec::new(),
                },
            );
        }

        let mut part_stmt = conn.prepare(
            r#"SELECT p.part_id, p.design_item_id, p.length_mm, p.width_mm, p.thickness_mm,
                      p.quantity, p.material_name, p.material_id
               FROM part p
               JOIN design_item d ON d.design_item_id = p.design_item_id
               WHERE d.project_id = ?
               ORDER BY p.design_item_id, p.part_id"#,
        )?;
        let parts = part_stmt.query_map(params![project_id], Self::map_part)?;
        for part in parts {
            let part = part?;
            if let Some(group) = grouped.get_mut(&part.design_item_id) {
                group.parts.push(part);
            }
        }

        Ok(grouped.into_values().collect())
    }
}
