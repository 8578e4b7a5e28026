use serde::Serialize;

/// One named nutrient amount as reported by the food database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientAmount {
    pub name: String,
    pub unit_name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NutrientProfile {
    pub nutrients: Vec<NutrientAmount>,
}

/// The four values a ledger record carries, per 100 g.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NutrientValues {
    pub calories: f64,
    pub fat: f64,
    pub carbohydrates: f64,
    pub protein: f64,
}

impl NutrientProfile {
    /// Picks energy (kcal only), total fat, carbohydrate by difference and
    /// protein by case-insensitive name. Missing ones stay zero; when a name
    /// repeats the last entry wins.
    pub fn extract(&self) -> NutrientValues {
        let mut out = NutrientValues::default();
        for n in &self.nutrients {
            match n.name.to_lowercase().as_str() {
                "energy" => {
                    if n.unit_name.eq_ignore_ascii_case("kcal") {
                        out.calories = n.amount;
                    }
                }
                "total lipid (fat)" => out.fat = n.amount,
                "carbohydrate, by difference" => out.carbohydrates = n.amount,
                "protein" => out.protein = n.amount,
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(name: &str, unit: &str, amount: f64) -> NutrientAmount {
        NutrientAmount {
            name: name.into(),
            unit_name: unit.into(),
            amount,
        }
    }

    #[test]
    fn energy_is_taken_only_in_kcal() {
        let profile = NutrientProfile {
            nutrients: vec![n("Energy", "kJ", 800.0), n("Energy", "kcal", 190.0)],
        };
        assert_eq!(profile.extract().calories, 190.0);

        let reversed = NutrientProfile {
            nutrients: vec![n("Energy", "kcal", 190.0), n("Energy", "kJ", 800.0)],
        };
        assert_eq!(reversed.extract().calories, 190.0);
    }

    #[test]
    fn names_match_case_insensitively() {
        let profile = NutrientProfile {
            nutrients: vec![
                n("PROTEIN", "g", 31.02),
                n("Total Lipid (Fat)", "g", 3.57),
                n("carbohydrate, BY difference", "g", 0.5),
                n("ENERGY", "KCAL", 165.0),
                n("Sodium, Na", "mg", 74.0),
            ],
        };
        assert_eq!(
            profile.extract(),
            NutrientValues {
                calories: 165.0,
                fat: 3.57,
                carbohydrates: 0.5,
                protein: 31.02,
            }
        );
    }

    #[test]
    fn unmatched_nutrients_default_to_zero() {
        let profile = NutrientProfile {
            nutrients: vec![n("Protein", "g", 0.26)],
        };
        let v = profile.extract();
        assert_eq!(v.protein, 0.26);
        assert_eq!(v.calories, 0.0);
        assert_eq!(v.fat, 0.0);
        assert_eq!(v.carbohydrates, 0.0);
    }
}
