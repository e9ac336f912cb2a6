// ==========================================
// 材料采集子系统 - 库存数据仓储
// ==========================================
// 职责: 库存记录查询 (映射/价格同步) 与维护写入
// ==========================================

use crate::domain::inventory::InventoryItem;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// InventorySource Trait - 库存数据源
// ==========================================
// 实现者: InventoryRepository (rusqlite),测试中可替换为故障注入实现
pub trait InventorySource: Send + Sync {
    fn find_by_id(&self, inventory_id: &str) -> RepositoryResult<Option<InventoryItem>>;

    fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<InventoryItem>>;
}

// ==========================================
// InventoryRepository - 库存仓储
// ==========================================
pub struct InventoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryRepository {
    /// 创建新的InventoryRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入或更新库存记录
    pub fn upsert(&self, item: &InventoryItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO inventory_item (inventory_id, sku, name, unit_cost, stock_level, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(inventory_id) DO UPDATE SET
                   sku = excluded.sku,
                   name = excluded.name,
                   unit_cost = excluded.unit_cost,
                   stock_level = excluded.stock_level,
                   updated_at = excluded.updated_at"#,
            params![
                &item.inventory_id,
                &item.sku,
                &item.name,
                item.unit_cost,
                item.stock_level,
                item.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// 修改库存单价
    pub fn update_unit_cost(
        &self,
        inventory_id: &str,
        unit_cost: f64,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE inventory_item SET unit_cost = ?, updated_at = ? WHERE inventory_id = ?",
            params![
                unit_cost,
                updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                inventory_id
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "InventoryItem".to_string(),
                id: inventory_id.to_string(),
            });
        }
        Ok(())
    }

    fn find_one(&self, column: &str, value: &str) -> RepositoryResult<Option<InventoryItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT inventory_id, sku, name, unit_cost, stock_level, updated_at FROM inventory_item WHERE {} = ?",
            column
        );
        let item = conn
            .query_row(&sql, params![value], Self::map_row)
            .optional()?;
        Ok(item)
    }

    fn map_row(row: &Row) -> rusqlite::Result<InventoryItem> {
        let ts_raw: String = row.get(5)?;
        let updated_at = NaiveDateTime::parse_from_str(&ts_raw, "%Y-%m-%d %H:%M:%S").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(InventoryItem {
            inventory_id: row.get(0)?,
            sku: row.get(1)?,
            name: row.get(2)?,
            unit_cost: row.get(3)?,
            stock_level: row.get(4)?,
            updated_at,
        })
    }
}

impl InventorySource for InventoryRepository {
    fn find_by_id(&self, inventory_id: &str) -> RepositoryResult<Option<InventoryItem>> {
        self.find_one("inventory_id", inventory_id)
    }

    fn find_by_sku(&self, sku: &str) -> RepositoryResult<Option<InventoryItem>> {
        self.find_one("sku", sku)
    }
}
