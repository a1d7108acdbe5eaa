//! Integration tests for similarity scoring and ranking

use civ_atlas::civilization::CivilizationDraft;
use civ_atlas::core::config::{AtlasConfig, MissingAttributePolicy};
use civ_atlas::core::types::CivilizationId;
use civ_atlas::schema::{Attribute, AttributeOrdering, AttributeSet, SchemaRegistry};
use civ_atlas::similarity::SimilarityScorer;
use civ_atlas::{seed, Atlas, AtlasError};
use proptest::prelude::*;

/// Complete draft with every attribute at its first value, then `overrides`
fn draft(name: &str, overrides: &[(&str, &str)]) -> CivilizationDraft {
    let mut draft = CivilizationDraft::new(name);
    for attribute in Attribute::ALL {
        draft
            .attributes
            .insert(attribute.name().to_string(), attribute.values()[0].to_string());
    }
    for (attribute, value) in overrides {
        draft.attributes.insert(attribute.to_string(), value.to_string());
    }
    draft
}

async fn populated(count: usize) -> (Atlas, Vec<CivilizationId>) {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let mut ids = Vec::new();
    for draft in seed::generate_drafts(2024, count) {
        ids.push(atlas.civilizations().create(&draft).await.unwrap().id);
    }
    (atlas, ids)
}

#[tokio::test]
async fn test_find_similar_contract() {
    let (atlas, ids) = populated(40).await;

    for &id in ids.iter().take(10) {
        let matches = atlas.similarity().find_similar(id, 3, Some(0.5)).await.unwrap();
        assert!(matches.len() <= 3);
        assert!(matches.iter().all(|m| m.id != id));
        assert!(matches.iter().all(|m| m.score >= 0.5));
        for pair in matches.windows(2) {
            assert!(pair[0].score > pair[1].score || (pair[0].score == pair[1].score && pair[0].id < pair[1].id));
        }
    }
}

#[tokio::test]
async fn test_ties_broken_by_id() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let target = atlas.civilizations().create(&draft("Origin", &[])).await.unwrap();

    // Identical twins all score 1.0
    let mut twins = Vec::new();
    for i in 0..4 {
        twins.push(
            atlas
                .civilizations()
                .create(&draft(&format!("Twin {}", i), &[]))
                .await
                .unwrap()
                .id,
        );
    }
    twins.sort();

    let matches = atlas.similarity().find_similar(target.id, 10, Some(0.0)).await.unwrap();
    let ranked: Vec<_> = matches.iter().map(|m| m.id).collect();
    assert_eq!(ranked, twins);
    assert!(matches.iter().all(|m| m.score == 1.0));
}

#[tokio::test]
async fn test_threshold_filters_and_defaults() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let target = atlas.civilizations().create(&draft("Origin", &[])).await.unwrap();
    let close = atlas
        .civilizations()
        .create(&draft("Close", &[("primary_religion", "polytheistic")]))
        .await
        .unwrap();

    let mut far_overrides = Vec::new();
    for attribute in Attribute::ALL {
        let values = attribute.values();
        far_overrides.push((attribute.name(), values[values.len() - 1]));
    }
    atlas.civilizations().create(&draft("Far", &far_overrides)).await.unwrap();

    // Default threshold is 0.5: the opposite-corner record is excluded
    let matches = atlas.similarity().find_similar(target.id, 10, None).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, close.id);

    let all = atlas.similarity().find_similar(target.id, 10, Some(0.0)).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_invalid_threshold_and_unknown_entity() {
    let (atlas, ids) = populated(3).await;

    let err = atlas.similarity().find_similar(ids[0], 3, Some(1.5)).await.unwrap_err();
    assert_eq!(err.field(), Some("min_threshold"));

    let err = atlas
        .similarity()
        .find_similar(CivilizationId::new(), 3, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::NotFound { .. }));
}

#[tokio::test]
async fn test_parallel_ranking_matches_sequential() {
    let sequential = Atlas::in_memory(AtlasConfig {
        parallel_threshold: usize::MAX,
        ..AtlasConfig::default()
    })
    .unwrap();
    let parallel = Atlas::in_memory(AtlasConfig {
        parallel_threshold: 1,
        ..AtlasConfig::default()
    })
    .unwrap();

    let drafts = seed::generate_drafts(77, 60);
    let mut seq_ids = Vec::new();
    let mut par_ids = Vec::new();
    for draft in &drafts {
        seq_ids.push(sequential.civilizations().create(draft).await.unwrap().id);
        par_ids.push(parallel.civilizations().create(draft).await.unwrap().id);
    }

    let seq_scores: Vec<f64> = sequential
        .similarity()
        .find_similar(seq_ids[0], 60, Some(0.0))
        .await
        .unwrap()
        .iter()
        .map(|m| m.score)
        .collect();
    let par_scores: Vec<f64> = parallel
        .similarity()
        .find_similar(par_ids[0], 60, Some(0.0))
        .await
        .unwrap()
        .iter()
        .map(|m| m.score)
        .collect();
    assert_eq!(seq_scores, par_scores);
}

#[tokio::test]
async fn test_compare_reports_breakdown() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let a = atlas.civilizations().create(&draft("A", &[])).await.unwrap();
    let b = atlas
        .civilizations()
        .create(&draft("B", &[("technology_level", "bronze_age"), ("primary_religion", "animistic")]))
        .await
        .unwrap();

    let comparison = atlas.similarity().compare(a.id, b.id).await.unwrap();
    let differing: Vec<_> = comparison.differences().map(|c| c.attribute).collect();
    assert_eq!(differing, vec![Attribute::PrimaryReligion, Attribute::TechnologyLevel]);
    assert_eq!(comparison.similarities().count(), Attribute::ALL.len() - 2);

    // stone_age vs bronze_age is one step of six on an ordinal scale
    let tech = comparison
        .attributes
        .iter()
        .find(|c| c.attribute == Attribute::TechnologyLevel)
        .unwrap();
    assert!((tech.similarity.unwrap() - 5.0 / 6.0).abs() < 1e-12);

    let expected = (Attribute::ALL.len() as f64 - 2.0 + 5.0 / 6.0) / Attribute::ALL.len() as f64;
    assert!((comparison.score - expected).abs() < 1e-12);
    assert_eq!(
        comparison.score,
        atlas.similarity().score(b.id, a.id).await.unwrap()
    );
}

#[tokio::test]
async fn test_focused_ranking() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let target = atlas
        .civilizations()
        .create(&draft("Target", &[("government_type", "monarchy")]))
        .await
        .unwrap();
    let same_government = atlas
        .civilizations()
        .create(&draft("Crowned", &[("government_type", "monarchy"), ("primary_terrain", "island")]))
        .await
        .unwrap();
    atlas
        .civilizations()
        .create(&draft("Council", &[("government_type", "tribal_council")]))
        .await
        .unwrap();

    let matches = atlas
        .similarity()
        .find_similar_focused(target.id, 5, Some(1.0), &["government_type"])
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, same_government.id);

    let err = atlas
        .similarity()
        .find_similar_focused(target.id, 5, None, &["hair_color"])
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::InvalidAttribute(_)));
}

// Wrong ordering defaults flatten similarity without any error being raised,
// so both sides of the default are pinned here.
#[test]
fn test_default_orderings_are_pinned() {
    let registry = SchemaRegistry::builtin();
    for attribute in [
        Attribute::TechnologyLevel,
        Attribute::PopulationDensity,
        Attribute::PopulationSize,
        Attribute::LiteracyRate,
    ] {
        assert_eq!(registry.definition(attribute).ordering, AttributeOrdering::Ordinal, "{}", attribute);
    }
    for attribute in [
        Attribute::PrimaryReligion,
        Attribute::GovernmentType,
        Attribute::PrimaryTerrain,
        Attribute::ArtFocus,
    ] {
        assert_eq!(registry.definition(attribute).ordering, AttributeOrdering::Nominal, "{}", attribute);
    }
}

fn attribute_set() -> impl Strategy<Value = AttributeSet> {
    proptest::collection::vec(proptest::option::weighted(0.9, 0usize..16), Attribute::ALL.len()).prop_map(
        |picks| {
            Attribute::ALL
                .iter()
                .zip(picks)
                .filter_map(|(attribute, pick)| {
                    pick.and_then(|index| attribute.value_at(index % attribute.values().len()))
                })
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn prop_score_symmetric_and_bounded(a in attribute_set(), b in attribute_set()) {
        let registry = SchemaRegistry::builtin();
        for policy in [MissingAttributePolicy::MaxDistance, MissingAttributePolicy::Skip] {
            let scorer = SimilarityScorer::new(&registry, policy);
            let ab = scorer.score(&a, &b);
            prop_assert_eq!(ab, scorer.score(&b, &a));
            prop_assert!((0.0..=1.0).contains(&ab));
        }
    }

    #[test]
    fn prop_complete_sets_are_reflexive(rng_seed in any::<u64>()) {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(rng_seed);
        let set = seed::random_attributes(&mut rng);
        let registry = SchemaRegistry::builtin();
        let scorer = SimilarityScorer::new(&registry, MissingAttributePolicy::MaxDistance);
        prop_assert_eq!(scorer.score(&set, &set), 1.0);
    }
}
