// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::Utc;
use material_harvest::domain::inventory::InventoryItem;
use material_harvest::domain::palette::StockSheet;
use material_harvest::domain::part::{DesignItem, DesignItemParts, Part};

// ==========================================
// Part 构建器
// ==========================================

pub struct PartBuilder {
    part_id: String,
    material_name: Option<String>,
    material_id: Option<String>,
    quantity: i64,
    length_mm: f64,
    width_mm: f64,
    thickness_mm: Option<f64>,
}

impl PartBuilder {
    pub fn new(part_id: &str) -> Self {
        Self {
            part_id: part_id.to_string(),
            material_name: None,
            material_id: None,
            quantity: 1,
            length_mm: 600.0,
            width_mm: 400.0,
            thickness_mm: None,
        }
    }

    pub fn material(mut self, name: &str) -> Self {
        self.material_name = Some(name.to_string());
        self
    }

    pub fn material_id(mut self, id: &str) -> Self {
        self.material_id = Some(id.to_string());
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn size(mut self, length_mm: f64, width_mm: f64) -> Self {
        self.length_mm = length_mm;
        self.width_mm = width_mm;
        self
    }

    pub fn thickness(mut self, thickness_mm: f64) -> Self {
        self.thickness_mm = Some(thickness_mm);
        self
    }

    pub fn build(self, design_item_id: &str) -> Part {
        Part {
            part_id: self.part_id,
            design_item_id: design_item_id.to_string(),
            length_mm: self.length_mm,
            width_mm: self.width_mm,
            thickness_mm: self.thickness_mm,
            quantity: self.quantity,
            material_name: self.material_name,
            material_id: self.material_id,
        }
    }
}

// ==========================================
// DesignItem 构建器
// ==========================================

pub struct DesignItemBuilder {
    design_item_id: String,
    name: String,
    parts: Vec<PartBuilder>,
}

impl DesignItemBuilder {
    pub fn new(design_item_id: &str) -> Self {
        Self {
            design_item_id: design_item_id.to_string(),
            name: format!("Item {}", design_item_id),
            parts: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn part(mut self, part: PartBuilder) -> Self {
        self.parts.push(part);
        self
    }

    pub fn build(self, project_id: &str) -> DesignItemParts {
        let design_item_id = self.design_item_id;
        DesignItemParts {
            parts: self
                .parts
                .into_iter()
                .map(|p| p.build(&design_item_id))
                .collect(),
            design_item: DesignItem {
                design_item_id,
                project_id: project_id.to_string(),
                name: self.name,
            },
        }
    }
}

// ==========================================
// 其他构建函数
// ==========================================

pub fn inventory_item(inventory_id: &str, sku: &str, unit_cost: f64) -> InventoryItem {
    InventoryItem {
        inventory_id: inventory_id.to_string(),
        sku: sku.to_string(),
        name: format!("Stock {}", sku),
        unit_cost,
        stock_level: 20.0,
        updated_at: Utc::now().naive_utc(),
    }
}

pub fn stock_sheet(id: &str) -> StockSheet {
    StockSheet::new(id, 2440.0, 1220.0)
}
