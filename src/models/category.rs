// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity category catalog.
//!
//! Categories are reference data: seeded once, read-only to users. Each one
//! carries the emission factor used to turn a logged quantity into CO₂e and
//! a kind tag that drives the green-points reward.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Points awarded per kg of CO₂e avoided by a carbon-negative activity.
pub const POINTS_PER_KG_AVOIDED: f64 = 10.0;

/// Whether logging a category adds to or removes from a footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CategoryKind {
    Emitting,
    CarbonNegative,
}

/// A category of loggable activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityCategory {
    /// Stable slug (also used as document ID)
    pub id: String,
    pub name: String,
    pub description: String,
    /// kg CO₂e per unit; negative for carbon-negative actions
    pub emission_factor: f64,
    /// Label for the quantity axis ("km", "kWh", "kg", ...)
    pub unit: String,
    pub kind: CategoryKind,
}

impl ActivityCategory {
    /// Carbon amount for a quantity of this activity.
    pub fn carbon_for(&self, quantity: f64) -> f64 {
        quantity * self.emission_factor
    }

    /// Green points earned for an activity with the given carbon amount.
    pub fn points_for(&self, carbon_amount: f64) -> i64 {
        match self.kind {
            CategoryKind::CarbonNegative => {
                (carbon_amount * POINTS_PER_KG_AVOIDED).abs().round() as i64
            }
            CategoryKind::Emitting => 0,
        }
    }
}

fn category(
    id: &str,
    name: &str,
    description: &str,
    emission_factor: f64,
    unit: &str,
    kind: CategoryKind,
) -> ActivityCategory {
    ActivityCategory {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        emission_factor,
        unit: unit.to_string(),
        kind,
    }
}

/// The built-in category catalog.
pub fn seed_categories() -> Vec<ActivityCategory> {
    use CategoryKind::{CarbonNegative, Emitting};

    vec![
        category("car", "Car", "Driving a petrol car", 0.21, "km", Emitting),
        category("bus", "Bus", "Riding a city bus", 0.089, "km", Emitting),
        category("train", "Train", "Riding a train", 0.041, "km", Emitting),
        category("flight", "Flight", "Economy class flight", 0.255, "km", Emitting),
        category("electricity", "Electricity", "Grid electricity use", 0.233, "kWh", Emitting),
        category("natural_gas", "Natural Gas", "Heating or cooking with gas", 2.04, "m³", Emitting),
        category("beef_meal", "Beef Meal", "A meal containing beef", 6.61, "meal", Emitting),
        category(
            "vegetarian_meal",
            "Vegetarian Meal",
            "A meat-free meal",
            1.7,
            "meal",
            Emitting,
        ),
        category(
            "recycling",
            "Recycling",
            "Recycling paper, plastic, glass or metal",
            -0.85,
            "kg",
            CarbonNegative,
        ),
        category(
            "composting",
            "Composting",
            "Composting food and garden waste",
            -0.5,
            "kg",
            CarbonNegative,
        ),
        category(
            "tree_planting",
            "Tree Planting",
            "Planting a tree",
            -21.77,
            "tree",
            CarbonNegative,
        ),
        category(
            "cycling",
            "Cycling",
            "Cycling instead of driving",
            -0.21,
            "km",
            CarbonNegative,
        ),
    ]
}
