// ==========================================
// 材料采集流程集成测试
// ==========================================
// 测试范围:
// 1. 首次采集 / 映射 / 厚度变化 / 重新映射 四个端到端场景
// 2. 幂等性、映射保留、计数不变量
// 3. 移除材料不触发失效
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use helpers::test_data_builder::*;
use material_harvest::domain::types::{MaterialType, PipelineStage};
use material_harvest::engine::mapping_manager::MappingRequest;

fn mapping(inventory_id: &str, unit_cost: Option<f64>) -> MappingRequest {
    MappingRequest {
        inventory_id: inventory_id.to_string(),
        inventory_name: format!("Stock {}", inventory_id),
        inventory_sku: format!("SKU-{}", inventory_id),
        unit_cost,
        stock_sheets: Vec::new(),
    }
}

fn seed_single_part(env: &ApiTestEnv, material: &str, qty: i64) {
    env.seed_parts(&[DesignItemBuilder::new("D1")
        .name("Base unit")
        .part(PartBuilder::new("p1").material(material).quantity(qty).size(600.0, 400.0))
        .build("P1")]);
}

// ==========================================
// 端到端场景
// ==========================================

#[tokio::test]
async fn test_first_harvest_creates_unmapped_entry() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    seed_single_part(&env, "18mm Melamine MFC", 2);

    let result = env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    assert_eq!(result.new_materials, vec!["melamine mfc".to_string()]);
    assert!(result.removed_materials.is_empty());
    assert_eq!(result.total_materials, 1);
    assert_eq!(result.unmapped_count, 1);
    assert_eq!(result.mapped_count, 0);

    let entry = env.entry("P1", "melamine mfc", 18);
    assert_eq!(entry.material_type, MaterialType::Panel);
    assert_eq!(entry.usage_count, 2);
    assert_eq!(entry.design_name, "18mm Melamine MFC");
    assert_eq!(entry.design_item_ids, vec!["D1".to_string()]);
    assert!(entry.mapping.is_none());

    // 新材料触发估算及下游失效
    let snapshot = env.palette_api.get_optimization_snapshot("P1").unwrap();
    assert!(snapshot.state.estimation.is_stale());
    assert!(snapshot.state.production.is_stale());
    assert_eq!(
        snapshot.state.estimation.invalidation_reasons,
        vec!["New materials discovered: melamine mfc".to_string()]
    );
    assert_eq!(snapshot.status.version, 1);
    assert!(snapshot.consolidated_cutlist.is_stale);
}

#[tokio::test]
async fn test_mapping_without_cost_uses_inventory_price() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    env.seed_inventory(&inventory_item("inv1", "SKU-inv1", 25000.0));
    seed_single_part(&env, "18mm Melamine MFC", 2);
    env.palette_api.harvest_materials("P1", "alice").await.unwrap();

    let entry_id = env.entry("P1", "melamine mfc", 18).id;
    let result = env
        .palette_api
        .map_material_to_inventory("P1", &entry_id, mapping("inv1", None), "alice")
        .unwrap();

    assert_eq!(result.entry.unit_cost(), Some(25000.0));
    assert_eq!(result.mapped_count, 1);
    assert_eq!(result.unmapped_count, 0);
    // 首次映射且无备料板: 不失效
    assert_eq!(result.invalidation_version, None);

    let stored = env.entry("P1", "melamine mfc", 18);
    let block = stored.mapping.expect("映射块缺失");
    assert_eq!(block.inventory_id, "inv1");
    assert_eq!(block.mapped_by, "alice");
}

#[tokio::test]
async fn test_thickness_change_replaces_entry() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    seed_single_part(&env, "18mm Melamine MFC", 2);
    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    let old_id = env.entry("P1", "melamine mfc", 18).id;

    env.palette_api
        .update_part_material("P1", "p1", Some("20mm Melamine MFC"), "alice")
        .unwrap();
    let result = env.palette_api.harvest_materials("P1", "alice").await.unwrap();

    assert_eq!(result.removed_materials, vec!["melamine mfc".to_string()]);
    assert_eq!(result.existing_materials, vec!["melamine mfc".to_string()]);
    assert!(result.new_materials.is_empty());
    assert_eq!(result.total_materials, 1);
    assert_eq!(result.unmapped_count, 1);

    let palette = env.palette_api.get_palette("P1").unwrap().unwrap();
    assert!(palette.find_by_key("melamine mfc", 18).is_none());
    let new_entry = palette.find_by_key("melamine mfc", 20).unwrap();
    assert_ne!(new_entry.id, old_id);
    assert!(new_entry.mapping.is_none());
}

#[tokio::test]
async fn test_remapping_invalidates_production() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    seed_single_part(&env, "18mm Melamine MFC", 2);
    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    env.palette_api
        .mark_stage_recomputed("P1", PipelineStage::Estimation, "worker")
        .unwrap();
    env.palette_api
        .mark_stage_recomputed("P1", PipelineStage::Production, "worker")
        .unwrap();

    let entry_id = env.entry("P1", "melamine mfc", 18).id;
    env.palette_api
        .map_material_to_inventory("P1", &entry_id, mapping("inv1", Some(10.0)), "alice")
        .unwrap();
    let result = env
        .palette_api
        .map_material_to_inventory("P1", &entry_id, mapping("inv2", Some(12.0)), "bob")
        .unwrap();

    assert_eq!(
        result.invalidation_reasons,
        vec!["Material mapping changed: 18mm Melamine MFC".to_string()]
    );
    assert_eq!(result.invalidation_version, Some(2));

    let snapshot = env.palette_api.get_optimization_snapshot("P1").unwrap();
    assert!(!snapshot.state.estimation.is_stale());
    assert!(snapshot.state.production.is_stale());
    assert_eq!(
        snapshot.state.production.invalidation_reasons,
        vec!["Material mapping changed: 18mm Melamine MFC".to_string()]
    );

    let events = env.publisher.events();
    let last = events.last().unwrap();
    assert_eq!(last.trigger_kind, "MAPPING_CHANGED");
    assert_eq!(last.newly_stale, vec![PipelineStage::Production]);
}

// ==========================================
// 不变量
// ==========================================

#[tokio::test]
async fn test_harvest_is_idempotent() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    env.seed_parts(&[
        DesignItemBuilder::new("D1")
            .part(PartBuilder::new("p1").material("White MFC 18mm").quantity(4))
            .part(PartBuilder::new("p2").material("Oak Veneer"))
            .build("P1"),
        DesignItemBuilder::new("D2")
            .part(PartBuilder::new("p3").material("white_mfc 18mm").quantity(2))
            .part(PartBuilder::new("p4"))
            .build("P1"),
    ]);

    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    let first = env.palette_api.get_palette("P1").unwrap().unwrap();
    let version_after_first = env.version("P1");

    let second = env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    assert!(second.new_materials.is_empty());
    assert!(second.removed_materials.is_empty());
    assert_eq!(second.invalidation_version, None);
    assert_eq!(env.version("P1"), version_after_first);

    let palette = env.palette_api.get_palette("P1").unwrap().unwrap();
    assert_eq!(palette.entries.len(), 3);
    let ids = |p: &material_harvest::MaterialPalette| p.entries.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&palette), ids(&first));

    let mfc = env.entry("P1", "white mfc", 18);
    assert_eq!(mfc.usage_count, 6);
    assert_eq!(mfc.design_item_ids, vec!["D1".to_string(), "D2".to_string()]);

    // 无材料名称的零件计入 unknown
    let unknown = env.entry("P1", "unknown", 18);
    assert_eq!(unknown.usage_count, 1);
}

#[tokio::test]
async fn test_harvest_preserves_mapping_and_stock_sheets() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    seed_single_part(&env, "Birch Ply 12mm", 3);
    env.palette_api.harvest_materials("P1", "alice").await.unwrap();

    let entry_id = env.entry("P1", "birch ply", 12).id;
    let mut req = mapping("inv-birch", Some(48.5));
    req.stock_sheets = vec![stock_sheet("S1"), stock_sheet("S2")];
    env.palette_api
        .map_material_to_inventory("P1", &entry_id, req, "alice")
        .unwrap();

    // 数量变化后重新采集
    env.seed_parts(&[DesignItemBuilder::new("D1")
        .name("Base unit")
        .part(PartBuilder::new("p1").material("Birch Ply 12mm").quantity(7))
        .build("P1")]);
    env.palette_api.harvest_materials("P1", "alice").await.unwrap();

    let entry = env.entry("P1", "birch ply", 12);
    assert_eq!(entry.id, entry_id);
    assert_eq!(entry.usage_count, 7);
    assert_eq!(entry.inventory_id(), Some("inv-birch"));
    assert_eq!(entry.unit_cost(), Some(48.5));
    let sheet_ids: Vec<&str> = entry.stock_sheets.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sheet_ids, vec!["S1", "S2"]);
}

#[tokio::test]
async fn test_counters_stay_consistent() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    env.seed_parts(&[DesignItemBuilder::new("D1")
        .part(PartBuilder::new("p1").material("MFC 18mm"))
        .part(PartBuilder::new("p2").material("Clear Glass 6mm"))
        .part(PartBuilder::new("p3").material("Walnut Edge Banding 1mm"))
        .build("P1")]);

    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    let check = |env: &ApiTestEnv| {
        let palette = env.palette_api.get_palette("P1").unwrap().unwrap();
        assert!(palette.counters_consistent());
        assert_eq!(palette.mapped_count + palette.unmapped_count, palette.entries.len());
        palette
    };

    let palette = check(&env);
    let glass = env.entry("P1", "clear glass", 6);
    assert_eq!(glass.material_type, MaterialType::Glass);
    assert_eq!(env.entry("P1", "walnut edge banding", 1).material_type, MaterialType::Edge);

    for entry in &palette.entries {
        env.palette_api
            .map_material_to_inventory("P1", &entry.id, mapping(&format!("inv-{}", entry.thickness_mm), Some(5.0)), "alice")
            .unwrap();
        check(&env);
    }
    assert_eq!(check(&env).unmapped_count, 0);

    env.palette_api.unmap_material("P1", &glass.id, "alice").unwrap();
    let palette = check(&env);
    assert_eq!(palette.mapped_count, 2);

    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    assert_eq!(check(&env).mapped_count, 2);
}

#[tokio::test]
async fn test_removed_material_does_not_invalidate() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    env.seed_parts(&[DesignItemBuilder::new("D1")
        .part(PartBuilder::new("p1").material("MFC 18mm"))
        .part(PartBuilder::new("p2").material("Oak Veneer"))
        .build("P1")]);
    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    let before = env.version("P1");

    // 删除零件本身触发 PartsChanged,随后的采集不再额外失效
    let version = env.palette_api.delete_part("P1", "p2", "alice").unwrap();
    assert_eq!(version, before + 1);
    let result = env.palette_api.harvest_materials("P1", "alice").await.unwrap();

    assert_eq!(result.removed_materials, vec!["oak veneer".to_string()]);
    assert_eq!(result.total_materials, 1);
    assert_eq!(result.invalidation_version, None);
    assert_eq!(env.version("P1"), version);
}

#[tokio::test]
async fn test_configured_default_thickness() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_project("P1");
    env.config_manager
        .set_global_config_value("harvest.default_thickness_mm", "16")
        .unwrap();
    env.seed_parts(&[DesignItemBuilder::new("D1")
        .part(PartBuilder::new("p1").material("Grey MFC"))
        .part(PartBuilder::new("p2").material("Grey MFC").thickness(25.0))
        .build("P1")]);

    env.palette_api.harvest_materials("P1", "alice").await.unwrap();
    assert_eq!(env.entry("P1", "grey mfc", 16).usage_count, 1);
    assert_eq!(env.entry("P1", "grey mfc", 25).usage_count, 1);

    let logs = env.action_log_repo.list_by_project("P1", 10).unwrap();
    let payload = logs[0].payload_json.as_ref().unwrap();
    assert_eq!(payload["default_thickness_mm"], 16);
    assert_eq!(payload["config_snapshot"]["harvest.default_thickness_mm"], "16");
}
