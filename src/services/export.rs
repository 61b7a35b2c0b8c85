// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! CSV export of activity history.

use chrono::SecondsFormat;
use std::collections::HashMap;

use crate::models::{ActivityCategory, ActivityRecord};

const HEADER: &str = "logged_at,category,description,quantity,unit,carbon_amount,green_points";

/// Render records as CSV, one row per record in the order given.
pub fn activities_to_csv(records: &[ActivityRecord], categories: &[ActivityCategory]) -> String {
    let by_id: HashMap<&str, &ActivityCategory> =
        categories.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut out = String::with_capacity(64 * (records.len() + 1));
    out.push_str(HEADER);
    out.push_str("\r\n");

    for record in records {
        let category = by_id.get(record.category_id.as_str());
        let name = category.map_or(record.category_id.as_str(), |c| c.name.as_str());
        let unit = category.map_or("", |c| c.unit.as_str());

        let row = [
            record.logged_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            escape_field(name),
            escape_field(&record.description),
            record.quantity.to_string(),
            escape_field(unit),
            format!("{:.3}", record.carbon_amount),
            record.green_points_earned.to_string(),
        ];
        out.push_str(&row.join(","));
        out.push_str("\r\n");
    }

    out
}

/// Quote a field if it contains a delimiter, quote or line break.
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::category::seed_categories;
    use chrono::DateTime;
    use uuid::Uuid;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_csv_rows() {
        let record = ActivityRecord {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            category_id: "recycling".to_string(),
            description: "cans, bottles".to_string(),
            quantity: 5.0,
            carbon_amount: -4.25,
            green_points_earned: 43,
            logged_at: DateTime::from_timestamp(1_709_294_400, 0).unwrap(),
        };

        let csv = activities_to_csv(&[record], &seed_categories());
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "2024-03-01T12:00:00Z,Recycling,\"cans, bottles\",5,kg,-4.250,43"
        );
        assert_eq!(lines[2], "");
    }
}
