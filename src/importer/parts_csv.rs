// ==========================================
// 材料采集子系统 - 零件批量导入
// ==========================================
// 列: design_item_id, design_item_name, part_id?, length_mm, width_mm,
//     thickness_mm?, quantity, material_name?, material_id?
// 行级错误收集到报告,不中断整批;缺失 part_id 自动生成
// ==========================================

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::part::{DesignItem, DesignItemParts, Part};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, RawRecord};
use crate::repository::parts_repo::PartsRepository;

const REQUIRED_COLUMNS: [&str; 4] = ["design_item_id", "length_mm", "width_mm", "quantity"];

/// 单行导入错误
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

/// 导入报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartsImportReport {
    pub import_id: String,
    pub project_id: String,
    pub total_rows: usize,
    pub imported_parts: usize,
    pub design_items: usize,
    pub errors: Vec<RowError>,
}

impl PartsImportReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ==========================================
// PartsCsvImporter - 零件 CSV 导入器
// ==========================================
pub struct PartsCsvImporter {
    parts_repo: Arc<PartsRepository>,
    parser: CsvParser,
}

impl PartsCsvImporter {
    pub fn new(parts_repo: Arc<PartsRepository>) -> Self {
        Self {
            parts_repo,
            parser: CsvParser,
        }
    }

    /// 从 CSV 文件导入
    pub fn import_file(&self, project_id: &str, path: &Path) -> ImportResult<PartsImportReport> {
        let records = self.parser.parse_file(path)?;
        self.import_records(project_id, records)
    }

    /// 从任意 reader 导入
    pub fn import_reader<R: Read>(&self, project_id: &str, source: R) -> ImportResult<PartsImportReport> {
        let records = self.parser.parse_reader(source)?;
        self.import_records(project_id, records)
    }

    #[instrument(skip(self, records), fields(project_id = %project_id, rows = records.len()))]
    fn import_records(&self, project_id: &str, records: Vec<RawRecord>) -> ImportResult<PartsImportReport> {
        if let Some((_, first)) = records.first() {
            for column in REQUIRED_COLUMNS {
                if !first.contains_key(column) {
                    return Err(ImportError::MissingColumn(column.to_string()));
                }
            }
        }

        let total_rows = records.len();
        let mut errors = Vec::new();
        let mut grouped: BTreeMap<String, DesignItemParts> = BTreeMap::new();
        // 本批次内 part_id -> design_item_id
        let mut batch_owners: HashMap<String, String> = HashMap::new();

        for (row, fields) in records {
            match map_row(project_id, row, &fields) {
                Ok((item, part)) => {
                    let ownership = self
                        .check_ownership(project_id, &item)
                        .and_then(|_| self.check_part_owner(&part, &batch_owners));
                    if let Err(message) = ownership {
                        errors.push(RowError { row, message });
                        continue;
                    }
                    batch_owners.insert(part.part_id.clone(), part.design_item_id.clone());
                    grouped
                        .entry(item.design_item_id.clone())
                        .or_insert_with(|| DesignItemParts {
                            design_item: item,
                            parts: Vec::new(),
                        })
                        .parts
                        .push(part);
                }
                Err(e) => errors.push(RowError {
                    row,
                    message: e.to_string(),
                }),
            }
        }

        let items: Vec<DesignItemParts> = grouped.into_values().collect();
        let imported_parts = if items.is_empty() {
            0
        } else {
            self.parts_repo.batch_upsert(&items)?
        };

        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "零件导入存在行级错误");
        }
        tracing::info!(imported_parts, design_items = items.len(), "零件导入完成");

        Ok(PartsImportReport {
            import_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            total_rows,
            imported_parts,
            design_items: items.len(),
            errors,
        })
    }

    /// 已存在的设计项必须属于同一项目
    fn check_ownership(&self, project_id: &str, item: &DesignItem) -> Result<(), String> {
        match self.parts_repo.find_design_item(&item.design_item_id) {
            Ok(Some(existing)) if existing.project_id != project_id => Err(format!(
                "design item {} belongs to project {}",
                item.design_item_id, existing.project_id
            )),
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    /// 已存在的零件不能改挂到其他设计项
    fn check_part_owner(&self, part: &Part, batch_owners: &HashMap<String, String>) -> Result<(), String> {
        if let Some(owner) = batch_owners.get(&part.part_id) {
            if owner != &part.design_item_id {
                return Err(format!(
                    "part {} already listed under design item {}",
                    part.part_id, owner
                ));
            }
        }
        match self.parts_repo.find_part_owner(&part.part_id) {
            Ok(Some(owner)) if owner.design_item_id != part.design_item_id => Err(format!(
                "part {} belongs to design item {} of project {}",
                part.part_id, owner.design_item_id, owner.project_id
            )),
            Ok(_) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }
}

fn cell<'a>(fields: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    fields.get(key).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn parse_f64(fields: &HashMap<String, String>, key: &str, row: usize) -> ImportResult<Option<f64>> {
    match cell(fields, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| ImportError::TypeConversionError {
                row,
                field: key.to_string(),
                message: format!("not a number: {}", raw),
            }),
    }
}

fn required_f64(fields: &HashMap<String, String>, key: &str, row: usize) -> ImportResult<f64> {
    parse_f64(fields, key, row)?.ok_or_else(|| ImportError::FieldMappingError {
        row,
        message: format!("{} is required", key),
    })
}

/// 行 -> (设计项, 零件)
fn map_row(project_id: &str, row: usize, fields: &HashMap<String, String>) -> ImportResult<(DesignItem, Part)> {
    let design_item_id = cell(fields, "design_item_id")
        .ok_or_else(|| ImportError::FieldMappingError {
            row,
            message: "design_item_id is empty".to_string(),
        })?
        .to_string();

    let length_mm = required_f64(fields, "length_mm", row)?;
    let width_mm = required_f64(fields, "width_mm", row)?;
    let thickness_mm = parse_f64(fields, "thickness_mm", row)?;

    let quantity = match cell(fields, "quantity") {
        None => 1,
        Some(raw) => raw.parse::<i64>().map_err(|_| ImportError::TypeConversionError {
            row,
            field: "quantity".to_string(),
            message: format!("not an integer: {}", raw),
        })?,
    };

    let item = DesignItem {
        design_item_id: design_item_id.clone(),
        project_id: project_id.to_string(),
        name: cell(fields, "design_item_name")
            .unwrap_or(&design_item_id)
            .to_string(),
    };

    let part = Part {
        part_id: cell(fields, "part_id")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        design_item_id,
        length_mm,
        width_mm,
        thickness_mm,
        quantity,
        material_name: cell(fields, "material_name").map(str::to_string),
        material_id: cell(fields, "material_id").map(str::to_string),
    };

    Ok((item, part))
}
