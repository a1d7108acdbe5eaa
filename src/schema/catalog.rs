//! The fixed attribute catalog
//!
//! Every dimension a civilization is described by is a closed enum. The
//! `attribute_catalog!` invocation below is the single source of truth for
//! dimension names, their legal values (in rank order), and their category.
//! It generates:
//! - one enum per dimension, serialized as its snake_case value
//! - `Attribute`, naming the dimensions themselves
//! - `AttributeValue`, a tagged union over every dimension's enum

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::error::AtlasError;

/// Grouping used when presenting the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    GeographicSettlement,
    PoliticalStructure,
    EconomicSystem,
    SocialStructure,
    CulturalReligious,
    KnowledgeEducation,
    MilitaryDefense,
    CommunicationLanguage,
    EnvironmentalRelations,
    AdditionalAttributes,
}

impl Category {
    pub const ALL: &'static [Category] = &[
        Category::GeographicSettlement,
        Category::PoliticalStructure,
        Category::EconomicSystem,
        Category::SocialStructure,
        Category::CulturalReligious,
        Category::KnowledgeEducation,
        Category::MilitaryDefense,
        Category::CommunicationLanguage,
        Category::EnvironmentalRelations,
        Category::AdditionalAttributes,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Category::GeographicSettlement => "Geographic & Settlement",
            Category::PoliticalStructure => "Political Structure",
            Category::EconomicSystem => "Economic System",
            Category::SocialStructure => "Social Structure",
            Category::CulturalReligious => "Cultural & Religious",
            Category::KnowledgeEducation => "Knowledge & Education",
            Category::MilitaryDefense => "Military & Defense",
            Category::CommunicationLanguage => "Communication & Language",
            Category::EnvironmentalRelations => "Environmental Relations",
            Category::AdditionalAttributes => "Additional Attributes",
        }
    }

    pub fn attributes(self) -> impl Iterator<Item = Attribute> {
        Attribute::ALL
            .iter()
            .copied()
            .filter(move |attribute| attribute.category() == self)
    }
}

macro_rules! attribute_catalog {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $key:literal in $category:ident {
                $( $variant:ident = $value:literal ),+ $(,)?
            }
        )+
    ) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            pub enum $name {
                $( #[serde(rename = $value)] $variant, )+
            }

            impl $name {
                /// Every legal value, in declaration (rank) order
                pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

                pub fn as_str(self) -> &'static str {
                    match self {
                        $( $name::$variant => $value, )+
                    }
                }

                pub fn parse(raw: &str) -> Option<Self> {
                    match raw {
                        $( $value => Some($name::$variant), )+
                        _ => None,
                    }
                }

                /// Position in declaration order
                pub fn index(self) -> usize {
                    self as usize
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl From<$name> for AttributeValue {
                fn from(value: $name) -> Self {
                    AttributeValue::$name(value)
                }
            }
        )+

        /// A named categorical dimension
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Attribute {
            $( $name, )+
        }

        impl Attribute {
            /// Every dimension, in catalog order
            pub const ALL: &'static [Attribute] = &[ $( Attribute::$name, )+ ];

            /// Wire name, e.g. `technology_level`
            pub fn name(self) -> &'static str {
                match self {
                    $( Attribute::$name => $key, )+
                }
            }

            pub fn from_name(raw: &str) -> Option<Self> {
                match raw {
                    $( $key => Some(Attribute::$name), )+
                    _ => None,
                }
            }

            pub fn category(self) -> Category {
                match self {
                    $( Attribute::$name => Category::$category, )+
                }
            }

            /// Legal values in declaration order
            pub fn values(self) -> &'static [&'static str] {
                match self {
                    $( Attribute::$name => &[ $( $value, )+ ], )+
                }
            }

            pub fn parse_value(self, raw: &str) -> Option<AttributeValue> {
                match self {
                    $( Attribute::$name => $name::parse(raw).map(AttributeValue::$name), )+
                }
            }

            /// The value at `index` in declaration order
            pub fn value_at(self, index: usize) -> Option<AttributeValue> {
                match self {
                    $( Attribute::$name => $name::ALL.get(index).copied().map(AttributeValue::$name), )+
                }
            }
        }

        /// One legal value of one dimension
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AttributeValue {
            $( $name($name), )+
        }

        impl AttributeValue {
            pub fn attribute(self) -> Attribute {
                match self {
                    $( AttributeValue::$name(_) => Attribute::$name, )+
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $( AttributeValue::$name(value) => value.as_str(), )+
                }
            }

            /// Position of the value within its dimension's declaration order
            pub fn index(self) -> usize {
                match self {
                    $( AttributeValue::$name(value) => value.index(), )+
                }
            }
        }
    };
}

attribute_catalog! {
    // === Geographic & Settlement ===
    SettlementPattern = "settlement_pattern" in GeographicSettlement {
        Nomadic = "nomadic",
        SemiNomadic = "semi_nomadic",
        Settled = "settled",
        Urban = "urban",
        Rural = "rural",
        Mixed = "mixed",
    }
    PrimaryTerrain = "primary_terrain" in GeographicSettlement {
        Desert = "desert",
        Forest = "forest",
        Mountains = "mountains",
        Plains = "plains",
        Coastal = "coastal",
        Island = "island",
        Arctic = "arctic",
        Underground = "underground",
    }
    PopulationDensity = "population_density" in GeographicSettlement {
        Sparse = "sparse",
        Low = "low",
        Medium = "medium",
        High = "high",
        Megacity = "megacity",
    }
    ArchitectureStyle = "architecture_style" in GeographicSettlement {
        TemporaryStructures = "temporary_structures",
        Wood = "wood",
        Stone = "stone",
        ClayAdobe = "clay_adobe",
        Metal = "metal",
        MixedMaterials = "mixed_materials",
    }

    // === Political Structure ===
    GovernmentType = "government_type" in PoliticalStructure {
        Democracy = "democracy",
        Monarchy = "monarchy",
        Oligarchy = "oligarchy",
        Theocracy = "theocracy",
        TribalCouncil = "tribal_council",
        Anarchy = "anarchy",
        Dictatorship = "dictatorship",
        Republic = "republic",
    }
    LeadershipSelection = "leadership_selection" in PoliticalStructure {
        Hereditary = "hereditary",
        Elected = "elected",
        Appointed = "appointed",
        CombatTrial = "combat_trial",
        ReligiousSelection = "religious_selection",
        Meritocratic = "meritocratic",
    }
    CentralizationLevel = "centralization_level" in PoliticalStructure {
        HighlyCentralized = "highly_centralized",
        Federal = "federal",
        Confederated = "confederated",
        Decentralized = "decentralized",
        Tribal = "tribal",
    }
    LegalSystem = "legal_system" in PoliticalStructure {
        CommonLaw = "common_law",
        CivilLaw = "civil_law",
        ReligiousLaw = "religious_law",
        CustomaryLaw = "customary_law",
        Mixed = "mixed",
    }

    // === Economic System ===
    PrimaryEconomy = "primary_economy" in EconomicSystem {
        HunterGatherer = "hunter_gatherer",
        Agricultural = "agricultural",
        Pastoral = "pastoral",
        TradeBased = "trade_based",
        Industrial = "industrial",
        Service = "service",
        Mixed = "mixed",
    }
    TradeOrientation = "trade_orientation" in EconomicSystem {
        Isolationist = "isolationist",
        LocalTradeOnly = "local_trade_only",
        RegionalTrade = "regional_trade",
        InternationalTrade = "international_trade",
        TradeEmpire = "trade_empire",
    }
    CurrencyType = "currency_type" in EconomicSystem {
        Barter = "barter",
        CommodityMoney = "commodity_money",
        MetalCoins = "metal_coins",
        PaperCurrency = "paper_currency",
        Digital = "digital",
        Mixed = "mixed",
    }
    PropertyRights = "property_rights" in EconomicSystem {
        Communal = "communal",
        Private = "private",
        Mixed = "mixed",
        StateOwned = "state_owned",
    }

    // === Social Structure ===
    SocialStratification = "social_stratification" in SocialStructure {
        Egalitarian = "egalitarian",
        CasteSystem = "caste_system",
        ClassBased = "class_based",
        Meritocratic = "meritocratic",
        Mixed = "mixed",
    }
    GenderRoles = "gender_roles" in SocialStructure {
        Egalitarian = "egalitarian",
        Patriarchal = "patriarchal",
        Matriarchal = "matriarchal",
        Complementary = "complementary",
        Fluid = "fluid",
    }
    FamilyStructure = "family_structure" in SocialStructure {
        Nuclear = "nuclear",
        Extended = "extended",
        ClanBased = "clan_based",
        Communal = "communal",
        Matrilineal = "matrilineal",
        Patrilineal = "patrilineal",
    }
    AgeHierarchy = "age_hierarchy" in SocialStructure {
        ElderLed = "elder_led",
        YouthOriented = "youth_oriented",
        AgeEgalitarian = "age_egalitarian",
        Mixed = "mixed",
    }

    // === Cultural & Religious ===
    PrimaryReligion = "primary_religion" in CulturalReligious {
        Monotheistic = "monotheistic",
        Polytheistic = "polytheistic",
        Animistic = "animistic",
        Atheistic = "atheistic",
        AncestorWorship = "ancestor_worship",
        NatureWorship = "nature_worship",
        Mixed = "mixed",
    }
    ReligiousInfluence = "religious_influence" in CulturalReligious {
        Secular = "secular",
        ModerateInfluence = "moderate_influence",
        StrongInfluence = "strong_influence",
        Theocratic = "theocratic",
    }
    ArtFocus = "art_focus" in CulturalReligious {
        VisualArts = "visual_arts",
        Music = "music",
        Literature = "literature",
        Performance = "performance",
        Crafts = "crafts",
        Architecture = "architecture",
        Mixed = "mixed",
    }
    CulturalValues = "cultural_values" in CulturalReligious {
        Individualistic = "individualistic",
        Collectivistic = "collectivistic",
        HonorBased = "honor_based",
        HarmonyFocused = "harmony_focused",
        AchievementOriented = "achievement_oriented",
    }

    // === Knowledge & Education ===
    EducationSystem = "education_system" in KnowledgeEducation {
        Apprenticeship = "apprenticeship",
        FormalSchools = "formal_schools",
        ReligiousEducation = "religious_education",
        OralTradition = "oral_tradition",
        ScientificMethod = "scientific_method",
        Mixed = "mixed",
    }
    LiteracyRate = "literacy_rate" in KnowledgeEducation {
        None = "none",
        Low = "low",
        Moderate = "moderate",
        High = "high",
        Universal = "universal",
    }
    KnowledgeBasis = "knowledge_basis" in KnowledgeEducation {
        EmpiricalScientific = "empirical_scientific",
        TraditionalCultural = "traditional_cultural",
        ReligiousMystical = "religious_mystical",
        Mixed = "mixed",
    }
    TechnologyLevel = "technology_level" in KnowledgeEducation {
        StoneAge = "stone_age",
        BronzeAge = "bronze_age",
        IronAge = "iron_age",
        PreIndustrial = "pre_industrial",
        Industrial = "industrial",
        InformationAge = "information_age",
        PostScarcity = "post_scarcity",
    }

    // === Military & Defense ===
    MilitaryStructure = "military_structure" in MilitaryDefense {
        NoMilitary = "no_military",
        Militia = "militia",
        ProfessionalArmy = "professional_army",
        WarriorClass = "warrior_class",
        Conscription = "conscription",
        Mercenary = "mercenary",
    }
    WarfareApproach = "warfare_approach" in MilitaryDefense {
        Pacifist = "pacifist",
        DefensiveOnly = "defensive_only",
        Expansionist = "expansionist",
        RaidingCulture = "raiding_culture",
        Diplomatic = "diplomatic",
    }
    PrimaryWeapons = "primary_weapons" in MilitaryDefense {
        Melee = "melee",
        RangedPrimitive = "ranged_primitive",
        Gunpowder = "gunpowder",
        ModernFirearms = "modern_firearms",
        AdvancedTechnology = "advanced_technology",
    }

    // === Communication & Language ===
    LanguageComplexity = "language_complexity" in CommunicationLanguage {
        Simple = "simple",
        Moderate = "moderate",
        Complex = "complex",
        MultipleLanguages = "multiple_languages",
    }
    WritingSystem = "writing_system" in CommunicationLanguage {
        None = "none",
        Pictographic = "pictographic",
        Ideographic = "ideographic",
        Alphabetic = "alphabetic",
        Mixed = "mixed",
    }
    CommunicationMethods = "communication_methods" in CommunicationLanguage {
        OralOnly = "oral_only",
        Written = "written",
        Digital = "digital",
        TelepathicOther = "telepathic_other",
    }

    // === Environmental Relations ===
    ResourceUse = "resource_use" in EnvironmentalRelations {
        Sustainable = "sustainable",
        Exploitative = "exploitative",
        ConservationFocused = "conservation_focused",
        Mixed = "mixed",
    }
    AgricultureType = "agriculture_type" in EnvironmentalRelations {
        None = "none",
        Subsistence = "subsistence",
        Intensive = "intensive",
        Permaculture = "permaculture",
        Industrial = "industrial",
    }
    EnergySources = "energy_sources" in EnvironmentalRelations {
        HumanAnimal = "human_animal",
        WoodBiomass = "wood_biomass",
        FossilFuels = "fossil_fuels",
        Renewable = "renewable",
        Nuclear = "nuclear",
        Other = "other",
    }

    // === Additional Attributes ===
    /// tiny < 1k, small < 10k, medium < 100k, large < 1M, massive beyond
    PopulationSize = "population_size" in AdditionalAttributes {
        Tiny = "tiny",
        Small = "small",
        Medium = "medium",
        Large = "large",
        Massive = "massive",
    }
    /// very_short < 30y, short < 50y, moderate < 70y, long < 90y, very_long beyond
    LifeExpectancy = "life_expectancy" in AdditionalAttributes {
        VeryShort = "very_short",
        Short = "short",
        Moderate = "moderate",
        Long = "long",
        VeryLong = "very_long",
    }
    TechnologicalAdoption = "technological_adoption" in AdditionalAttributes {
        Technophobic = "technophobic",
        Conservative = "conservative",
        Moderate = "moderate",
        Progressive = "progressive",
        Technophilic = "technophilic",
    }
    ExternalRelations = "external_relations" in AdditionalAttributes {
        Xenophobic = "xenophobic",
        Isolationist = "isolationist",
        Cautious = "cautious",
        Open = "open",
        Cosmopolitan = "cosmopolitan",
    }
    ChangeRate = "change_rate" in AdditionalAttributes {
        Static = "static",
        SlowChanging = "slow_changing",
        Moderate = "moderate",
        RapidChange = "rapid_change",
        Revolutionary = "revolutionary",
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = AtlasError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Attribute::from_name(raw).ok_or_else(|| AtlasError::InvalidAttribute(raw.to_string()))
    }
}

impl Serialize for Attribute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Attribute {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Attribute::from_name(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown attribute `{}`", raw)))
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized as the bare value; the dimension comes from context
impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_all_dimensions() {
        assert_eq!(Attribute::ALL.len(), 38);
        for category in Category::ALL {
            assert!(category.attributes().count() >= 3, "{:?} is underpopulated", category);
        }
    }

    #[test]
    fn test_every_enumeration_is_nonempty_and_roundtrips() {
        for &attribute in Attribute::ALL {
            let values = attribute.values();
            assert!(!values.is_empty());
            for (index, raw) in values.iter().enumerate() {
                let value = attribute.parse_value(raw).unwrap();
                assert_eq!(value.attribute(), attribute);
                assert_eq!(value.as_str(), *raw);
                assert_eq!(value.index(), index);
                assert_eq!(attribute.value_at(index), Some(value));
            }
            assert_eq!(Attribute::from_name(attribute.name()), Some(attribute));
        }
    }

    #[test]
    fn test_values_do_not_leak_between_dimensions() {
        // "iron_age" is a technology level, not a government
        assert!(Attribute::TechnologyLevel.parse_value("iron_age").is_some());
        assert!(Attribute::GovernmentType.parse_value("iron_age").is_none());
    }

    #[test]
    fn test_typed_values_serialize_as_wire_strings() {
        let json = serde_json::to_string(&TechnologyLevel::IronAge).unwrap();
        assert_eq!(json, "\"iron_age\"");
        let back: GovernmentType = serde_json::from_str("\"tribal_council\"").unwrap();
        assert_eq!(back, GovernmentType::TribalCouncil);
    }

    #[test]
    fn test_attribute_from_str_reports_invalid_attribute() {
        assert_eq!("change_rate".parse::<Attribute>().unwrap(), Attribute::ChangeRate);
        let err = "hair_color".parse::<Attribute>().unwrap_err();
        assert!(matches!(err, AtlasError::InvalidAttribute(name) if name == "hair_color"));
    }

    #[test]
    fn test_typed_conversion_into_attribute_value() {
        let value: AttributeValue = PrimaryReligion::Animistic.into();
        assert_eq!(value.attribute(), Attribute::PrimaryReligion);
        assert_eq!(value.to_string(), "animistic");
    }
}
