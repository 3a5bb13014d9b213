//! Row-wise derivation of distance, emissions and equivalents.
//!
//! Every function here is pure. Missing inputs (unparseable fare, unknown
//! category) produce `None` rather than an error, and `None` propagates
//! through every dependent metric.

use serde::Serialize;

use crate::rates::{
    CAR_KG_PER_1000_KM, Discount, REFUND_DIVISOR, RateRule, TREE_KG_PER_YEAR, TicketCategory,
    rate_rule,
};

/// Metrics attached to each travel record at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub rule: Option<RateRule>,
    pub distance_km: Option<f64>,
    pub co2_kg: Option<f64>,
    pub energy_mj: Option<f64>,
    pub savings_vs_car_kg: Option<f64>,
    pub tree_equivalent: Option<f64>,
}

impl DerivedMetrics {
    pub fn compute(
        fare: Option<f64>,
        fare_class: Option<u8>,
        discount: &Discount,
        category: Option<&TicketCategory>,
    ) -> Self {
        let (rule, distance_km) = distance(fare, fare_class, discount);
        let co2_kg = emission_kg(distance_km, category);
        let savings = savings_vs_car_kg(distance_km, co2_kg);

        Self {
            rule: Some(rule),
            distance_km,
            co2_kg,
            energy_mj: energy_mj_per_km(distance_km, category),
            savings_vs_car_kg: savings,
            tree_equivalent: tree_equivalent(savings),
        }
    }

    /// True when no rate rule matched and the fare was used as distance.
    pub fn is_fallback(&self) -> bool {
        self.rule == Some(RateRule::Fallback)
    }
}

/// Kilometres implied by a fare, together with the rule that produced them.
///
/// Refunds (negative fares) are checked before the rule table. Rules that
/// attribute zero kilometres do so even when the fare is missing.
pub fn distance(
    fare: Option<f64>,
    fare_class: Option<u8>,
    discount: &Discount,
) -> (RateRule, Option<f64>) {
    if let Some(betrag) = fare {
        if betrag < 0.0 {
            return (RateRule::Refund, Some(betrag / REFUND_DIVISOR));
        }
    }

    let rule = rate_rule(fare_class, discount);
    let km = match rule {
        RateRule::Zero => Some(0.0),
        RateRule::Divide(divisor) => fare.map(|betrag| betrag / divisor),
        RateRule::Fallback | RateRule::Refund => fare,
    };

    (rule, km)
}

/// CO₂-equivalent kg for a trip of `distance_km` in the given category.
pub fn emission_kg(distance_km: Option<f64>, category: Option<&TicketCategory>) -> Option<f64> {
    let factor = category?.emission_factor()?;
    Some(distance_km? * factor / 1000.0)
}

/// Energy equivalent in MJ for a trip of `distance_km`.
pub fn energy_mj_per_km(
    distance_km: Option<f64>,
    category: Option<&TicketCategory>,
) -> Option<f64> {
    let multiplier = category?.energy_multiplier()?;
    Some(multiplier * distance_km?)
}

/// CO₂ saved compared with driving the same distance in the reference car.
pub fn savings_vs_car_kg(distance_km: Option<f64>, co2_kg: Option<f64>) -> Option<f64> {
    Some(distance_km? * CAR_KG_PER_1000_KM / 1000.0 - co2_kg?)
}

/// Number of trees needed to absorb `savings_kg` in one year.
pub fn tree_equivalent(savings_kg: Option<f64>) -> Option<f64> {
    Some(savings_kg? / TREE_KG_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn km(fare: f64, class: u8, code: Option<&str>) -> f64 {
        distance(Some(fare), Some(class), &Discount::parse(code)).1.unwrap()
    }

    #[test]
    fn test_refund_divides_by_point_three() {
        for fare in [-0.3, -30.0, -129.9] {
            for class in [0, 1, 2] {
                let (rule, d) = distance(Some(fare), Some(class), &Discount::Ga1Kl);
                assert_eq!(rule, RateRule::Refund);
                assert_eq!(d, Some(fare / 0.3));
            }
        }
    }

    #[test]
    fn test_each_rule_row() {
        assert_eq!(km(100.0, 0, None), 0.0);
        assert_eq!(km(100.0, 0, Some("KEINE")), 0.0);
        assert_eq!(km(100.0, 2, Some("GA1KL")), 100.0 / 0.2);
        assert_eq!(km(100.0, 1, Some("GA1KL")), 100.0 / 0.36);
        assert_eq!(km(100.0, 1, Some("GA2KL")), 100.0 / 0.36);
        assert_eq!(km(100.0, 0, Some("HTA123")), 0.0);
        assert_eq!(km(100.0, 1, Some("HTA123")), 100.0 / 0.36);
        assert_eq!(km(100.0, 2, Some("HTA123")), 100.0 / 0.2);
        assert_eq!(km(100.0, 1, Some("KEINE")), 100.0 / 0.287);
        assert_eq!(km(100.0, 1, None), 100.0 / 0.287);
        assert_eq!(km(100.0, 2, None), 100.0 / 0.239);
        assert_eq!(km(100.0, 2, Some("KEINE")), 100.0 / 0.239);
    }

    #[test]
    fn test_fallback_keeps_fare() {
        let (rule, d) = distance(Some(55.0), Some(2), &Discount::Ga2Kl);
        assert_eq!(rule, RateRule::Fallback);
        assert_eq!(d, Some(55.0));

        let (rule, d) = distance(Some(55.0), None, &Discount::None);
        assert_eq!(rule, RateRule::Fallback);
        assert_eq!(d, Some(55.0));
    }

    #[test]
    fn test_missing_fare() {
        assert_eq!(distance(None, Some(0), &Discount::None).1, Some(0.0));
        assert_eq!(distance(None, Some(1), &Discount::None).1, None);
        assert_eq!(distance(None, Some(9), &Discount::None).1, None);
    }

    #[test]
    fn test_inland_scenario() {
        let inland = TicketCategory::Inland;
        let m = DerivedMetrics::compute(Some(100.0), Some(1), &Discount::None, Some(&inland));

        let d = m.distance_km.unwrap();
        assert!((d - 348.432_055_749_128_9).abs() < 1e-6);
        assert!((m.co2_kg.unwrap() - d * 7.02 / 1000.0).abs() < EPS);
        assert!((m.co2_kg.unwrap() - 2.446).abs() < 1e-3);
        assert!((m.energy_mj.unwrap() - 174.216).abs() < 1e-3);

        let savings = d * 118.64 / 1000.0 - d * 7.02 / 1000.0;
        assert!((m.savings_vs_car_kg.unwrap() - savings).abs() < EPS);
        assert!((m.tree_equivalent.unwrap() - savings / 24.62).abs() < EPS);
    }

    #[test]
    fn test_refund_scenario() {
        let ga = TicketCategory::Ga;
        let m = DerivedMetrics::compute(Some(-30.0), Some(2), &Discount::None, Some(&ga));

        assert!((m.distance_km.unwrap() + 100.0).abs() < EPS);
        assert!((m.co2_kg.unwrap() + 0.702).abs() < EPS);
        assert_eq!(m.rule, Some(RateRule::Refund));
    }

    #[test]
    fn test_unknown_category_is_missing_not_error() {
        let category = TicketCategory::Unknown("Velo".into());
        let m = DerivedMetrics::compute(Some(10.0), Some(2), &Discount::None, Some(&category));

        assert!(m.distance_km.is_some());
        assert_eq!(m.co2_kg, None);
        assert_eq!(m.energy_mj, None);
        assert_eq!(m.savings_vs_car_kg, None);
        assert_eq!(m.tree_equivalent, None);
    }

    #[test]
    fn test_foreign_ticket_uses_higher_factor() {
        let ausland = TicketCategory::Ausland;
        let m = DerivedMetrics::compute(Some(239.0), Some(2), &Discount::None, Some(&ausland));
        assert!((m.distance_km.unwrap() - 1000.0).abs() < 1e-9);
        assert!((m.co2_kg.unwrap() - 40.82).abs() < 1e-9);
        assert!((m.energy_mj.unwrap() - 750.0).abs() < 1e-9);
    }
}
