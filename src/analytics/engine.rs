//! Report generation over a record source

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::clustering::{PatternClusterer, PredictiveInsights};
use super::cost::{analyze_costs, CostAnalysis};
use super::overview::{summarize, OverviewMetrics};
use super::performance::{rank_agents, AgentPerformance};
use super::quality::{analyze_quality, QualityMetrics};
use super::recommendations::generate_recommendations;
use super::report::Report;
use super::usage::{analyze_usage, UsagePatterns};
use super::CallSnapshot;
use crate::config::AnalyticsSettings;
use crate::models::{Agent, AnalysisWindow, CallRecord};
use crate::store::RecordSource;
use crate::{Error, Result};

/// Build a report synchronously from already-loaded data.
///
/// Produces the same analytics as [`AnalyticsEngine::report_for_window`]
/// for the same inputs; only `generated_at` differs.
pub fn analyze(
    window: AnalysisWindow,
    records: Vec<CallRecord>,
    agents: Vec<Agent>,
    settings: &AnalyticsSettings,
) -> Result<Report> {
    let snapshot = CallSnapshot::new(window, records, agents)?;

    let overview = summarize(&snapshot.records, &snapshot.agents);
    let performance = rank_agents(&snapshot.records);
    let cost = analyze_costs(&snapshot.records);
    let quality = analyze_quality(&snapshot.records);
    let usage = analyze_usage(&snapshot.records);
    let insights = PatternClusterer::new(settings.clustering.clone()).analyze(&snapshot.records);

    Ok(assemble(
        &snapshot, settings, overview, performance, cost, quality, usage, insights,
    ))
}

#[allow(clippy::too_many_arguments)]
fn assemble(
    snapshot: &CallSnapshot,
    settings: &AnalyticsSettings,
    overview: OverviewMetrics,
    agent_performance: AgentPerformance,
    cost_analysis: CostAnalysis,
    quality_metrics: QualityMetrics,
    usage_patterns: UsagePatterns,
    predictive_insights: PredictiveInsights,
) -> Report {
    let recommendations = generate_recommendations(
        &overview,
        &agent_performance,
        &cost_analysis,
        &usage_patterns,
        &settings.recommendations,
    );

    if let PredictiveInsights::AnalysisError { predictions } = &predictive_insights {
        warn!("Report built without call patterns: {}", predictions);
    }

    Report {
        window: snapshot.window,
        generated_at: Utc::now(),
        overview,
        agent_performance,
        cost_analysis,
        quality_metrics,
        usage_patterns,
        predictive_insights,
        recommendations,
    }
}

async fn run_stage<T, F>(name: &'static str, snapshot: Arc<CallSnapshot>, stage: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&CallSnapshot) -> T + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || stage(&snapshot))
        .await
        .map_err(|e| Error::internal(format!("{} stage failed: {}", name, e)))?;
    debug!("Stage {} finished", name);
    Ok(result)
}

/// Analytics service bound to one record source
pub struct AnalyticsEngine {
    source: Arc<dyn RecordSource>,
    settings: AnalyticsSettings,
}

impl AnalyticsEngine {
    pub fn new(source: Arc<dyn RecordSource>, settings: AnalyticsSettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    pub async fn generate_report(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Report> {
        let window = AnalysisWindow::new(start, end)?;
        self.report_for_window(window).await
    }

    /// Fetch the window's data and run the analyzers concurrently on
    /// blocking worker threads over one shared snapshot.
    pub async fn report_for_window(&self, window: AnalysisWindow) -> Result<Report> {
        info!(
            "Generating report for {} .. {}",
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );

        let (records, agents) = tokio::try_join!(
            self.source.get_call_records(&window),
            self.source.get_agents()
        )?;
        self.run(window, records, agents).await
    }

    /// Report restricted to the calls of one agent. The agent catalogue is
    /// narrowed to that agent as well.
    pub async fn report_for_agent(&self, window: AnalysisWindow, agent_id: &str) -> Result<Report> {
        info!(
            "Generating report for agent {} over {} .. {}",
            agent_id,
            window.start.to_rfc3339(),
            window.end.to_rfc3339()
        );

        let (records, agents) = tokio::try_join!(
            self.source.get_agent_call_records(&window, agent_id),
            self.source.get_agents()
        )?;
        let agents = agents.into_iter().filter(|agent| agent.id == agent_id).collect();
        self.run(window, records, agents).await
    }

    async fn run(&self, window: AnalysisWindow, records: Vec<CallRecord>, agents: Vec<Agent>) -> Result<Report> {
        let snapshot = Arc::new(CallSnapshot::new(window, records, agents)?);
        debug!(
            "Snapshot holds {} calls and {} agents",
            snapshot.records.len(),
            snapshot.agents.len()
        );

        let clusterer = PatternClusterer::new(self.settings.clustering.clone());
        let (overview, performance, cost, quality, usage, insights) = tokio::try_join!(
            run_stage("overview", snapshot.clone(), |s| summarize(&s.records, &s.agents)),
            run_stage("performance", snapshot.clone(), |s| rank_agents(&s.records)),
            run_stage("cost", snapshot.clone(), |s| analyze_costs(&s.records)),
            run_stage("quality", snapshot.clone(), |s| analyze_quality(&s.records)),
            run_stage("usage", snapshot.clone(), |s| analyze_usage(&s.records)),
            run_stage("clustering", snapshot.clone(), move |s| clusterer.analyze(&s.records)),
        )?;

        let report = assemble(
            &snapshot,
            &self.settings,
            overview,
            performance,
            cost,
            quality,
            usage,
            insights,
        );
        info!(
            "Report ready: {} calls, {} recommendations",
            report.overview.total_calls,
            report.recommendations.len()
        );
        Ok(report)
    }
}
