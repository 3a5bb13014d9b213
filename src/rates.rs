//! Fixed rate and coefficient tables used to turn fares into kilometres,
//! emissions and energy equivalents.
//!
//! These are the values of the "Basic Emissions Report" workbook. They are
//! constants of the business domain and never change at runtime.

use std::fmt;

use serde::Serialize;

/// Fare units per kilometre assumed for refunds.
pub const REFUND_DIVISOR: f64 = 0.3;

/// CO₂ (kg per 1000 km) emitted by the reference car.
pub const CAR_KG_PER_1000_KM: f64 = 118.64;

/// CO₂ (kg) a tree absorbs per year.
pub const TREE_KG_PER_YEAR: f64 = 24.62;

/// No-discount marker used by the ticketing system.
const NO_DISCOUNT: &str = "KEINE";

/// Discount (Reduktion) applied to a fare.
///
/// An absent code and `KEINE` both map to [`Discount::None`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Discount {
    None,
    Ga1Kl,
    Ga2Kl,
    Hta123,
    Other(String),
}

impl Discount {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some(NO_DISCOUNT) => Discount::None,
            Some("GA1KL") => Discount::Ga1Kl,
            Some("GA2KL") => Discount::Ga2Kl,
            Some("HTA123") => Discount::Hta123,
            Some(other) => Discount::Other(other.to_string()),
        }
    }

    /// Label used in reports. [`Discount::None`] renders as `KEINE`.
    pub fn label(&self) -> &str {
        match self {
            Discount::None => NO_DISCOUNT,
            Discount::Ga1Kl => "GA1KL",
            Discount::Ga2Kl => "GA2KL",
            Discount::Hta123 => "HTA123",
            Discount::Other(code) => code.as_str(),
        }
    }
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of the (fare class, discount) rule lookup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "rule", content = "divisor", rename_all = "snake_case")]
pub enum RateRule {
    /// Negative fare; divided by [`REFUND_DIVISOR`].
    Refund,
    /// Travel is covered by a pass; no kilometres are attributed.
    Zero,
    /// Fare divided by the given fare-units-per-km.
    Divide(f64),
    /// No rule matched; the fare itself is used as the distance.
    Fallback,
}

/// Looks up the rule for a non-negative fare. First match wins.
///
/// | class | discount           | rule          |
/// |-------|--------------------|---------------|
/// | 0     | none               | zero          |
/// | 2     | GA1KL              | / 0.2         |
/// | 1     | GA1KL, GA2KL       | / 0.36        |
/// | 0     | HTA123             | zero          |
/// | 1     | HTA123             | / 0.36        |
/// | 2     | HTA123             | / 0.2         |
/// | 1     | none               | / 0.287       |
/// | 2     | none               | / 0.239       |
/// | *     | *                  | fallback      |
pub fn rate_rule(fare_class: Option<u8>, discount: &Discount) -> RateRule {
    match (fare_class, discount) {
        (Some(0), Discount::None) => RateRule::Zero,
        (Some(2), Discount::Ga1Kl) => RateRule::Divide(0.2),
        (Some(1), Discount::Ga1Kl | Discount::Ga2Kl) => RateRule::Divide(0.36),
        (Some(0), Discount::Hta123) => RateRule::Zero,
        (Some(1), Discount::Hta123) => RateRule::Divide(0.36),
        (Some(2), Discount::Hta123) => RateRule::Divide(0.2),
        (Some(1), Discount::None) => RateRule::Divide(0.287),
        (Some(2), Discount::None) => RateRule::Divide(0.239),
        _ => RateRule::Fallback,
    }
}

/// Ticket category (RUMBA-Artikel) from the lookup sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TicketCategory {
    Inland,
    Ga,
    Ausland,
    Ausschluss,
    Erstattung,
    Verkehrsverbund,
    /// `#NV`, the spreadsheet's "not available" marker.
    NotAvailable,
    Unknown(String),
}

impl TicketCategory {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Tickets Inland" => TicketCategory::Inland,
            "GA" => TicketCategory::Ga,
            "Tickets Ausland" => TicketCategory::Ausland,
            "Ausschluss" => TicketCategory::Ausschluss,
            "Erstattung" => TicketCategory::Erstattung,
            "Tickets Verkehrsverbund" => TicketCategory::Verkehrsverbund,
            "#NV" => TicketCategory::NotAvailable,
            other => TicketCategory::Unknown(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TicketCategory::Inland => "Tickets Inland",
            TicketCategory::Ga => "GA",
            TicketCategory::Ausland => "Tickets Ausland",
            TicketCategory::Ausschluss => "Ausschluss",
            TicketCategory::Erstattung => "Erstattung",
            TicketCategory::Verkehrsverbund => "Tickets Verkehrsverbund",
            TicketCategory::NotAvailable => "#NV",
            TicketCategory::Unknown(label) => label.as_str(),
        }
    }

    /// CO₂ kg per 1000 km, or `None` for unrecognized categories.
    pub fn emission_factor(&self) -> Option<f64> {
        match self {
            TicketCategory::Inland
            | TicketCategory::Ga
            | TicketCategory::Ausschluss
            | TicketCategory::Erstattung
            | TicketCategory::NotAvailable => Some(7.02),
            TicketCategory::Ausland => Some(40.82),
            TicketCategory::Verkehrsverbund => Some(8.04),
            TicketCategory::Unknown(_) => None,
        }
    }

    /// Energy equivalent (MJ) per km, or `None` for unrecognized categories.
    pub fn energy_multiplier(&self) -> Option<f64> {
        match self {
            TicketCategory::Inland
            | TicketCategory::Ga
            | TicketCategory::Ausschluss
            | TicketCategory::Erstattung
            | TicketCategory::NotAvailable => Some(0.5),
            TicketCategory::Ausland => Some(0.75),
            TicketCategory::Verkehrsverbund => Some(0.73),
            TicketCategory::Unknown(_) => None,
        }
    }
}

impl fmt::Display for TicketCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_keine_and_absent_are_equal() {
        assert_eq!(Discount::parse(None), Discount::None);
        assert_eq!(Discount::parse(Some("KEINE")), Discount::None);
        assert_eq!(Discount::parse(Some("  ")), Discount::None);
        assert_eq!(Discount::parse(Some("GA1KL")), Discount::Ga1Kl);
        assert_eq!(
            Discount::parse(Some("STREKENABO")),
            Discount::Other("STREKENABO".into())
        );
    }

    #[test]
    fn test_rule_table_rows() {
        let cases = [
            (Some(0), Discount::None, RateRule::Zero),
            (Some(2), Discount::Ga1Kl, RateRule::Divide(0.2)),
            (Some(1), Discount::Ga1Kl, RateRule::Divide(0.36)),
            (Some(1), Discount::Ga2Kl, RateRule::Divide(0.36)),
            (Some(0), Discount::Hta123, RateRule::Zero),
            (Some(1), Discount::Hta123, RateRule::Divide(0.36)),
            (Some(2), Discount::Hta123, RateRule::Divide(0.2)),
            (Some(1), Discount::None, RateRule::Divide(0.287)),
            (Some(2), Discount::None, RateRule::Divide(0.239)),
        ];

        for (class, discount, expected) in cases {
            assert_eq!(rate_rule(class, &discount), expected, "{class:?}/{discount}");
        }
    }

    #[test]
    fn test_unmatched_combinations_fall_back() {
        assert_eq!(rate_rule(Some(2), &Discount::Ga2Kl), RateRule::Fallback);
        assert_eq!(rate_rule(Some(0), &Discount::Ga1Kl), RateRule::Fallback);
        assert_eq!(rate_rule(Some(3), &Discount::None), RateRule::Fallback);
        assert_eq!(rate_rule(None, &Discount::None), RateRule::Fallback);
        assert_eq!(
            rate_rule(Some(1), &Discount::Other("X".into())),
            RateRule::Fallback
        );
    }

    #[test]
    fn test_category_coefficients() {
        assert_eq!(TicketCategory::parse("GA").emission_factor(), Some(7.02));
        assert_eq!(
            TicketCategory::parse("Tickets Ausland").emission_factor(),
            Some(40.82)
        );
        assert_eq!(
            TicketCategory::parse("Tickets Verkehrsverbund").energy_multiplier(),
            Some(0.73)
        );
        assert_eq!(TicketCategory::parse("#NV").energy_multiplier(), Some(0.5));

        let unknown = TicketCategory::parse("Parkplatz");
        assert_eq!(unknown.emission_factor(), None);
        assert_eq!(unknown.energy_multiplier(), None);
        assert_eq!(unknown.label(), "Parkplatz");
    }
}
