// ==========================================
// 材料采集子系统 - 导入层
// ==========================================
// 职责: 外部零件数据批量导入 (CSV)
// 红线: 只通过 Repository 写入
// ==========================================

pub mod error;
pub mod file_parser;
pub mod parts_csv;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::CsvParser;
pub use parts_csv::{PartsCsvImporter, PartsImportReport, RowError};
