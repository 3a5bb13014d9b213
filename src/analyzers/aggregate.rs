use crate::analyzers::types::{AboShare, Headline, SummaryRow, TOTAL_LABEL};
use crate::analyzers::utility::sum_present;
use crate::record::TravelRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Per-category summary table with a trailing TOTAL row.
///
/// Records without a category are not grouped. Count is the row count of the
/// group; every other column sums present values and ignores missing ones.
/// Rows are ordered by Count descending, ties by category label.
pub fn category_summary(records: &[&TravelRecord]) -> Vec<SummaryRow> {
    let mut groups: BTreeMap<&str, Vec<&TravelRecord>> = BTreeMap::new();

    for record in records {
        if let Some(category) = &record.category {
            groups.entry(category.label()).or_default().push(*record);
        }
    }

    let mut rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(label, group)| SummaryRow {
            category: label.to_string(),
            count: group.len(),
            total_distance_km: sum_present(group.iter().map(|r| r.metrics.distance_km)),
            total_energy_mj: sum_present(group.iter().map(|r| r.metrics.energy_mj)),
            total_co2_kg: sum_present(group.iter().map(|r| r.metrics.co2_kg)),
            total_fare: sum_present(group.iter().map(|r| r.fare)),
        })
        .collect();

    // Stable sort keeps the alphabetical order from the BTreeMap for ties.
    rows.sort_by(|a, b| b.count.cmp(&a.count));

    let total = SummaryRow {
        category: TOTAL_LABEL.to_string(),
        count: rows.iter().map(|r| r.count).sum(),
        total_distance_km: rows.iter().map(|r| r.total_distance_km).sum(),
        total_energy_mj: rows.iter().map(|r| r.total_energy_mj).sum(),
        total_co2_kg: rows.iter().map(|r| r.total_co2_kg).sum(),
        total_fare: rows.iter().map(|r| r.total_fare).sum(),
    };
    rows.push(total);

    rows
}

/// Headline totals over the selection.
pub fn headline(records: &[&TravelRecord]) -> Headline {
    Headline {
        records: records.len(),
        total_distance_km: sum_present(records.iter().map(|r| r.metrics.distance_km)),
        total_co2_kg: sum_present(records.iter().map(|r| r.metrics.co2_kg)),
        total_savings_vs_car_kg: sum_present(records.iter().map(|r| r.metrics.savings_vs_car_kg)),
        total_tree_equivalent: sum_present(records.iter().map(|r| r.metrics.tree_equivalent)),
    }
}

/// Distribution of subscriptions: distinct users per discount label.
///
/// Each (user, discount) pair is counted once. Records with an empty
/// Reduktion are skipped; an explicit `KEINE` is its own bar.
pub fn abo_distribution(records: &[&TravelRecord]) -> Vec<AboShare> {
    let mut seen: BTreeSet<(Option<&str>, &str)> = BTreeSet::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for record in records {
        if record.discount_label.is_none() {
            continue;
        }
        let discount = record.discount.label();
        if seen.insert((record.user.as_deref(), discount)) {
            *counts.entry(discount).or_default() += 1;
        }
    }

    let mut shares: Vec<AboShare> = counts
        .into_iter()
        .map(|(discount, users)| AboShare {
            discount: discount.to_string(),
            users,
        })
        .collect();
    shares.sort_by(|a, b| b.users.cmp(&a.users).then_with(|| a.discount.cmp(&b.discount)));

    shares
}
