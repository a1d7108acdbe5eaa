//! Deterministic sample population generation

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::civilization::{CivilizationDraft, Measurements};
use crate::schema::{Attribute, AttributeSet};

const ONSETS: &[&str] = &["Ak", "Bel", "Cor", "Dra", "El", "Fen", "Gal", "Hy", "Ith", "Kar", "Lum", "Mor", "Nes", "Or", "Qua", "Ros", "Sar", "Tul", "Vey", "Zan"];
const CODAS: &[&str] = &["ar", "eth", "ia", "on", "und", "is", "oria", "esh", "ai", "um"];
const TAGS: &[&str] = &["coastal", "ancient", "nomadic", "mercantile", "sacred", "frontier", "scholarly", "martial"];

/// Generate a random name
fn generate_name(index: usize, rng: &mut ChaCha8Rng) -> String {
    let onset = ONSETS.choose(rng).copied().unwrap_or("Al");
    let coda = CODAS.choose(rng).copied().unwrap_or("a");
    format!("{}{} {}", onset, coda, index + 1)
}

/// One legal value per attribute, chosen uniformly
pub fn random_attributes(rng: &mut ChaCha8Rng) -> AttributeSet {
    Attribute::ALL
        .iter()
        .filter_map(|attribute| {
            let index = rng.gen_range(0..attribute.values().len());
            attribute.value_at(index)
        })
        .collect()
}

fn generate_measurements(rng: &mut ChaCha8Rng) -> Measurements {
    Measurements {
        exact_population: rng.gen_bool(0.5).then(|| rng.gen_range(100..5_000_000)),
        exact_life_expectancy: rng.gen_bool(0.5).then(|| rng.gen_range(20.0..95.0)),
        territory_size_km2: rng.gen_bool(0.3).then(|| rng.gen_range(10.0..2_000_000.0)),
    }
}

/// `count` complete, valid drafts; the same seed always yields the same drafts
pub fn generate_drafts(seed: u64, count: usize) -> Vec<CivilizationDraft> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|index| {
            let name = generate_name(index, &mut rng);
            let attributes = random_attributes(&mut rng);
            let tag_count = rng.gen_range(0..3);
            let tags = TAGS
                .choose_multiple(&mut rng, tag_count)
                .map(|tag| tag.to_string())
                .collect();
            CivilizationDraft {
                description: Some(format!("Generated civilization {} of seed {}", index + 1, seed)),
                tags,
                created_by: Some("generator".to_string()),
                measurements: generate_measurements(&mut rng),
                ..CivilizationDraft::from_attributes(name, &attributes)
            }
        })
        .collect()
}
