//! Integration tests for templates

use civ_atlas::core::config::AtlasConfig;
use civ_atlas::schema::{Attribute, RawAttributes};
use civ_atlas::{Atlas, AtlasError};

fn raw(pairs: &[(&str, &str)]) -> RawAttributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Every attribute at its first value except those listed
fn everything_but(skip: &[&str]) -> RawAttributes {
    Attribute::ALL
        .iter()
        .filter(|attribute| !skip.contains(&attribute.name()))
        .map(|attribute| (attribute.name().to_string(), attribute.values()[0].to_string()))
        .collect()
}

#[tokio::test]
async fn test_warrior_culture_instantiation() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();

    let mut defaults = everything_but(&["technology_level"]);
    defaults.insert("government_type".into(), "tribal_council".into());
    defaults.insert("military_structure".into(), "warrior_class".into());
    atlas
        .templates()
        .create_template("warrior_culture", Some("Raiders of the steppe"), &defaults)
        .await
        .unwrap();

    let record = atlas
        .templates()
        .instantiate("warrior_culture", &raw(&[("technology_level", "iron_age")]))
        .await
        .unwrap();

    assert_eq!(record.value_of("government_type"), Some("tribal_council"));
    assert_eq!(record.value_of("technology_level"), Some("iron_age"));
    assert_eq!(record.value_of("military_structure"), Some("warrior_class"));
    assert_eq!(record.name, "warrior_culture");
    assert_eq!(record.description.as_deref(), Some("Raiders of the steppe"));

    // The record is really stored
    let stored = atlas.civilizations().get(record.id).await.unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_overrides_win_and_custom_name() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    atlas
        .templates()
        .create_template("river_kingdom", None, &everything_but(&[]))
        .await
        .unwrap();

    let record = atlas
        .templates()
        .instantiate_as(
            "river_kingdom",
            "Kingdom of Ashfall",
            &raw(&[("government_type", "monarchy"), ("primary_terrain", "coastal")]),
        )
        .await
        .unwrap();
    assert_eq!(record.name, "Kingdom of Ashfall");
    assert_eq!(record.value_of("government_type"), Some("monarchy"));
    assert_eq!(record.value_of("primary_terrain"), Some("coastal"));
}

#[tokio::test]
async fn test_duplicate_name_conflicts() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let defaults = raw(&[("government_type", "monarchy")]);
    atlas.templates().create_template("crowns", None, &defaults).await.unwrap();

    let err = atlas
        .templates()
        .create_template("crowns", None, &defaults)
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::Conflict { kind: "template", .. }));
}

#[tokio::test]
async fn test_illegal_defaults_rejected() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();

    let err = atlas
        .templates()
        .create_template("broken", None, &raw(&[("government_type", "kraterocracy")]))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("government_type"));

    let err = atlas
        .templates()
        .create_template("broken", None, &raw(&[("eye_color", "green")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::Validation { .. }));

    // Nothing was stored by the failed attempts
    assert!(atlas.templates().list_templates().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_incomplete_merge_is_validation_error() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    atlas
        .templates()
        .create_template("sparse", None, &raw(&[("government_type", "monarchy")]))
        .await
        .unwrap();

    let err = atlas
        .templates()
        .instantiate("sparse", &raw(&[("technology_level", "iron_age")]))
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::Validation { .. }));
    assert_eq!(err.field(), Some("settlement_pattern"));
    assert_eq!(atlas.analytics().statistics().await.unwrap().total_count, 0);

    let err = atlas
        .templates()
        .instantiate("sparse", &raw(&[("technology_level", "laser_age")]))
        .await
        .unwrap_err();
    assert_eq!(err.field(), Some("technology_level"));
}

#[tokio::test]
async fn test_list_get_delete() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    for name in ["zealots", "artisans", "mariners"] {
        atlas.templates().create_template(name, None, &RawAttributes::new()).await.unwrap();
    }

    let names: Vec<_> = atlas
        .templates()
        .list_templates()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["artisans", "mariners", "zealots"]);

    atlas.templates().delete_template("mariners").await.unwrap();
    assert!(matches!(
        atlas.templates().get_template("mariners").await,
        Err(AtlasError::NotFound { kind: "template", .. })
    ));
    assert!(matches!(
        atlas.templates().instantiate("mariners", &RawAttributes::new()).await,
        Err(AtlasError::NotFound { .. })
    ));
    assert!(atlas.templates().delete_template("mariners").await.is_err());
}
