//! Chart-ready series for dashboards
//!
//! Figures are derived from an assembled [`Report`] only; they never touch
//! call records directly. Rendering is left to the consumer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::report::Report;
use super::usage::WEEKDAY_NAMES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
    Heatmap,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<DataPoint>,
}

impl Series {
    fn new<I, X>(name: &str, points: I) -> Self
    where
        I: IntoIterator<Item = (X, f64)>,
        X: ToString,
    {
        Self {
            name: name.to_string(),
            points: points
                .into_iter()
                .map(|(x, y)| DataPoint { x: x.to_string(), y })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    pub series: Vec<Series>,
}

impl ChartSpec {
    fn new(title: &str, kind: ChartKind, x_label: &str, y_label: &str, series: Vec<Series>) -> Self {
        Self {
            title: title.to_string(),
            kind,
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            series,
        }
    }
}

/// Dashboard charts keyed by chart id. A report without calls yields a
/// single `placeholder` chart.
pub fn build_dashboard_figures(report: &Report) -> BTreeMap<String, ChartSpec> {
    let mut figures = BTreeMap::new();

    if report.is_empty() {
        figures.insert(
            "placeholder".to_string(),
            ChartSpec::new("No Data Available", ChartKind::Line, "", "", Vec::new()),
        );
        return figures;
    }

    let usage = &report.usage_patterns;
    figures.insert(
        "call_volume".to_string(),
        ChartSpec::new(
            "Call Volume Over Time",
            ChartKind::Line,
            "Date",
            "Calls",
            vec![Series::new(
                "Calls",
                usage.daily_usage.iter().map(|(day, &count)| (day, count as f64)),
            )],
        ),
    );

    let stats = &report.agent_performance.agent_stats;
    figures.insert(
        "agent_performance".to_string(),
        ChartSpec::new(
            "Agent Performance Metrics",
            ChartKind::Bar,
            "Agent",
            "Value",
            vec![
                Series::new("Call Count", stats.iter().map(|s| (&s.agent_name, s.call_count as f64))),
                Series::new("Avg Duration", stats.iter().map(|s| (&s.agent_name, s.avg_duration))),
                Series::new("Total Cost", stats.iter().map(|s| (&s.agent_name, s.total_cost))),
                Series::new(
                    "Avg Quality",
                    stats.iter().map(|s| (&s.agent_name, s.avg_quality.unwrap_or(0.0))),
                ),
            ],
        ),
    );

    figures.insert(
        "cost_distribution".to_string(),
        ChartSpec::new(
            "Cost Distribution by Agent",
            ChartKind::Pie,
            "Agent",
            "Cost",
            vec![Series::new(
                "Cost",
                report.cost_analysis.cost_by_agent.iter().map(|c| (&c.agent_name, c.cost)),
            )],
        ),
    );

    figures.insert(
        "quality_trends".to_string(),
        ChartSpec::new(
            "Quality Score Trends",
            ChartKind::Line,
            "Date",
            "Average Quality",
            vec![Series::new(
                "Average Quality",
                report.quality_metrics.quality_trends.iter().map(|(day, &q)| (day, q)),
            )],
        ),
    );

    let rows = WEEKDAY_NAMES
        .iter()
        .zip(&usage.heatmap)
        .map(|(day, hours)| {
            Series::new(
                day,
                hours.iter().enumerate().map(|(hour, &count)| (hour, count as f64)),
            )
        })
        .collect();
    figures.insert(
        "usage_heatmap".to_string(),
        ChartSpec::new("Usage Patterns Heatmap", ChartKind::Heatmap, "Hour", "Day", rows),
    );

    figures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::analyze;
    use crate::analytics::fixtures::{at, call};
    use crate::config::AnalyticsSettings;
    use crate::models::AnalysisWindow;

    fn report(records: Vec<crate::models::CallRecord>) -> Report {
        let window = AnalysisWindow::new(at(1, 0), at(31, 0)).unwrap();
        analyze(window, records, Vec::new(), &AnalyticsSettings::default()).unwrap()
    }

    #[test]
    fn test_empty_report_has_placeholder_only() {
        let figures = build_dashboard_figures(&report(Vec::new()));
        assert_eq!(figures.len(), 1);
        assert_eq!(figures["placeholder"].title, "No Data Available");
    }

    #[test]
    fn test_figures_follow_report_aggregates() {
        let report = report(vec![
            call("1", "A", 400.0, 2.0, Some(9.0), Some(8.0), 4, 10),
            call("2", "B", 30.0, 0.1, None, Some(4.0), 4, 11),
            call("3", "A", 200.0, 1.0, Some(7.0), None, 5, 10),
        ]);
        let figures = build_dashboard_figures(&report);

        let keys: Vec<&str> = figures.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["agent_performance", "call_volume", "cost_distribution", "quality_trends", "usage_heatmap"]
        );

        let volume = &figures["call_volume"].series[0].points;
        assert_eq!(volume.len(), report.usage_patterns.daily_usage.len());
        assert_eq!(volume[0], DataPoint { x: "2024-03-04".to_string(), y: 2.0 });

        let performance = &figures["agent_performance"];
        assert_eq!(performance.kind, ChartKind::Bar);
        assert_eq!(performance.series.len(), 4);
        assert_eq!(performance.series[3].points[1], DataPoint { x: "B".to_string(), y: 0.0 });

        let pie = &figures["cost_distribution"].series[0].points;
        assert_eq!(pie[0].x, "A");
        assert!((pie[0].y - 3.0).abs() < 1e-12);

        let heatmap = &figures["usage_heatmap"];
        assert_eq!(heatmap.series.len(), 7);
        assert_eq!(heatmap.series[0].name, "Monday");
        assert_eq!(heatmap.series[0].points[10].y, 1.0);
        assert_eq!(heatmap.series[1].points[10].y, 1.0);
    }
}
