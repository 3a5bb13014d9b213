//! Aggregation of travel records into dashboard figures.
//!
//! This module groups a filtered selection by ticket category and by
//! departure date, computes headline totals and the subscription mix, and
//! fits a linear trend to cumulative CO₂.

pub mod aggregate;
pub mod series;
pub mod types;
pub mod utility;
