//! Call volume by hour, weekday and day

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::CallRecord;

const PEAK_HOURS: usize = 5;

pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayCount {
    pub day: String,
    pub count: usize,
}

/// Usage buckets over UTC start times
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsagePatterns {
    /// Busiest hours, count descending then hour ascending
    pub peak_hours: Vec<HourCount>,
    /// Monday through Sunday, zero days included
    pub day_of_week_distribution: Vec<WeekdayCount>,
    /// Calls per hour of day, index 0 is midnight
    pub hourly_distribution: Vec<usize>,
    /// Weekday x hour grid, Monday first
    pub heatmap: Vec<Vec<usize>>,
    pub daily_usage: BTreeMap<NaiveDate, usize>,
    pub avg_calls_per_day: f64,
}

impl Default for UsagePatterns {
    fn default() -> Self {
        Self {
            peak_hours: Vec::new(),
            day_of_week_distribution: WEEKDAY_NAMES
                .iter()
                .map(|day| WeekdayCount {
                    day: day.to_string(),
                    count: 0,
                })
                .collect(),
            hourly_distribution: vec![0; 24],
            heatmap: vec![vec![0; 24]; 7],
            daily_usage: BTreeMap::new(),
            avg_calls_per_day: 0.0,
        }
    }
}

impl UsagePatterns {
    /// The single most frequent hour, lowest hour on ties.
    pub fn peak_hour(&self) -> Option<u32> {
        self.peak_hours.first().map(|h| h.hour)
    }
}

pub fn analyze_usage(records: &[CallRecord]) -> UsagePatterns {
    let mut patterns = UsagePatterns::default();
    if records.is_empty() {
        return patterns;
    }

    for record in records {
        let hour = record.started_at.hour() as usize;
        let weekday = record.started_at.weekday().num_days_from_monday() as usize;

        patterns.hourly_distribution[hour] += 1;
        patterns.heatmap[weekday][hour] += 1;
        patterns.day_of_week_distribution[weekday].count += 1;
        *patterns.daily_usage.entry(record.started_at.date_naive()).or_insert(0) += 1;
    }

    let mut hours: Vec<HourCount> = patterns
        .hourly_distribution
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(hour, &count)| HourCount { hour: hour as u32, count })
        .collect();
    hours.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.hour.cmp(&b.hour)));
    hours.truncate(PEAK_HOURS);
    patterns.peak_hours = hours;

    patterns.avg_calls_per_day = records.len() as f64 / patterns.daily_usage.len() as f64;
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::fixtures::call;

    #[test]
    fn test_peak_hours_and_weekdays() {
        // 2024-03-04 is a Monday, 2024-03-09 a Saturday
        let records = vec![
            call("1", "A", 60.0, 0.2, None, None, 4, 14),
            call("2", "A", 60.0, 0.2, None, None, 4, 14),
            call("3", "A", 60.0, 0.2, None, None, 4, 9),
            call("4", "A", 60.0, 0.2, None, None, 9, 9),
            call("5", "A", 60.0, 0.2, None, None, 9, 20),
            call("6", "A", 60.0, 0.2, None, None, 9, 1),
            call("7", "A", 60.0, 0.2, None, None, 9, 3),
            call("8", "A", 60.0, 0.2, None, None, 9, 5),
        ];

        let usage = analyze_usage(&records);
        let peaks: Vec<(u32, usize)> = usage.peak_hours.iter().map(|h| (h.hour, h.count)).collect();
        assert_eq!(peaks, vec![(9, 2), (14, 2), (1, 1), (3, 1), (5, 1)]);
        assert_eq!(usage.peak_hour(), Some(9));

        assert_eq!(usage.day_of_week_distribution[0].day, "Monday");
        assert_eq!(usage.day_of_week_distribution[0].count, 3);
        assert_eq!(usage.day_of_week_distribution[5].count, 5);
        assert_eq!(usage.day_of_week_distribution[2].count, 0);

        assert_eq!(usage.heatmap[0][14], 2);
        assert_eq!(usage.hourly_distribution.iter().sum::<usize>(), 8);
        assert_eq!(usage.daily_usage.len(), 2);
        assert_eq!(usage.avg_calls_per_day, 4.0);
    }

    #[test]
    fn test_empty_records() {
        let usage = analyze_usage(&[]);
        assert!(usage.peak_hours.is_empty());
        assert_eq!(usage.peak_hour(), None);
        assert_eq!(usage.day_of_week_distribution.len(), 7);
        assert_eq!(usage.avg_calls_per_day, 0.0);
    }
}
