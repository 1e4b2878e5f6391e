//! The stock achievement list.

use crate::{AchievementDef, AchievementKind, StatKey, HARVEST_ALL_FLAG};

fn def(id: &str, title: &str, description: &str, kind: AchievementKind) -> AchievementDef {
    AchievementDef {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        kind,
    }
}

fn at_least(stat: StatKey, threshold: u64) -> AchievementKind {
    AchievementKind::StatAtLeast { stat, threshold }
}

/// All eighteen achievements in evaluation order.
///
/// `plant_types` feeds the botanist condition and `purchasable_plots` the
/// "own every plot" threshold.
pub fn standard_achievements(plant_types: &[String], purchasable_plots: u64) -> Vec<AchievementDef> {
    use StatKey::*;
    vec![
        // planting
        def("first_plant", "First Sprout", "Plant your first crop", at_least(PlantsPlanted, 1)),
        def("gardener", "Gardener", "Plant 10 crops", at_least(PlantsPlanted, 10)),
        def("farmer", "Farmer", "Plant 50 crops", at_least(PlantsPlanted, 50)),
        def(
            "monoculture",
            "Monoculture",
            "Plant 20 crops of a single kind",
            AchievementKind::SingleTypePlantedAtLeast { threshold: 20 },
        ),
        def(
            "botanist",
            "Botanist",
            "Plant every kind of crop at least once",
            AchievementKind::AllTypesPlanted {
                types: plant_types.to_vec(),
            },
        ),
        // harvest
        def("first_harvest", "First Harvest", "Harvest your first crop", at_least(PlantsHarvested, 1)),
        def("harvest_25", "Reaper", "Harvest 25 crops", at_least(PlantsHarvested, 25)),
        def("harvest_100", "Combine", "Harvest 100 crops", at_least(PlantsHarvested, 100)),
        def(
            "harvest_all",
            "Nothing Wasted",
            "Harvest every plot at once",
            AchievementKind::Flag {
                key: HARVEST_ALL_FLAG.to_string(),
            },
        ),
        // fertilizer
        def("fertilizer_5", "Amateur Chemist", "Use 5 fertilizers", at_least(FertilizersUsed, 5)),
        def("fertilizer_25", "Chemist", "Use 25 fertilizers", at_least(FertilizersUsed, 25)),
        // plots
        def("first_plot", "Small Garden", "Buy your first extra plot", at_least(PlotsOwned, 1)),
        def("plots_5", "Expansion", "Buy 5 new plots", at_least(PlotsOwned, 5)),
        def(
            "all_plots",
            "Land Baron",
            "Buy every available plot",
            at_least(PlotsOwned, purchasable_plots),
        ),
        // economy
        def("first_sale", "First Sale", "Sell any crop", at_least(PlantsSold, 1)),
        def("earned_50", "Small Trader", "Hold 50 coins", at_least(Balance, 50)),
        def("earned_200", "Merchant", "Hold 200 coins", at_least(Balance, 200)),
        def("golden_hands", "Golden Hands", "Reach 500 coins", at_least(Balance, 500)),
    ]
}
