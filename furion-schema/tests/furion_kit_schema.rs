use furion_schema::*;
use furion_types::SchemaVersion;

#[test]
fn furion_kit_schema_has_single_unindexed_table() {
    let migrations = furion_kit_schema().unwrap();
    assert_eq!(migrations.latest(), Some(FURION_KIT_VERSION));

    let layout = migrations.layout_at(FURION_KIT_VERSION).unwrap();
    let tables: Vec<&TableDef> = layout.tables().collect();
    assert_eq!(tables.len(), 1);

    let diag = layout.table(ROUTING_DIAGNOSIS).unwrap();
    assert!(diag.is_auto_increment());
    assert!(diag.indexes.is_empty());
}

#[test]
fn furion_kit_schema_has_no_path_past_v1() {
    let migrations = furion_kit_schema().unwrap();
    assert!(matches!(
        migrations.plan(FURION_KIT_VERSION, SchemaVersion(2)),
        Err(SchemaError::NoUpgradePath { .. })
    ));
}

#[test]
fn macro_drops_tables_with_null() {
    let migrations = define_schema! {
        version 1 => {
            routingDiagnosis: "++id",
            scratch: "++id",
        },
        version 3 => {
            scratch: null,
        },
    }
    .unwrap();

    let versions: Vec<u32> = migrations.versions().map(|v| v.0).collect();
    assert_eq!(versions, vec![1, 3]);

    let layout = migrations.layout_at(SchemaVersion(3)).unwrap();
    assert!(layout.table("scratch").is_none());
    assert!(layout.table(ROUTING_DIAGNOSIS).is_some());
}

#[test]
fn macro_surfaces_declaration_errors() {
    let result = define_schema! {
        version 1 => {
            broken: "++",
        },
    };
    assert!(matches!(result, Err(SchemaError::InvalidDeclaration { .. })));
}
