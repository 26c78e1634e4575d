//! Prometheus metrics for the unified orchestrator

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder, register_counter_vec, register_gauge,
    register_histogram_vec,
};
use serde::Serialize;
use services::services::unified::{ExecutionState, SystemKind, UnifiedResponse};

const SYSTEMS: [SystemKind; 3] = [SystemKind::V1, SystemKind::V2, SystemKind::Hybrid];

lazy_static! {
    /// Finished executions by backend system and terminal status
    pub static ref ORCHESTRATOR_EXECUTIONS_TOTAL: CounterVec = register_counter_vec!(
        "orchestrator_executions_total",
        "Total number of finished executions by system and status",
        &["system", "status"]
    )
    .unwrap();

    /// Routing decisions by chosen system
    pub static ref ORCHESTRATOR_ROUTING_DECISIONS_TOTAL: CounterVec = register_counter_vec!(
        "orchestrator_routing_decisions_total",
        "Total number of routing decisions by chosen system",
        &["system"]
    )
    .unwrap();

    /// Executions currently running
    pub static ref ORCHESTRATOR_IN_FLIGHT: Gauge = register_gauge!(
        "orchestrator_in_flight_executions",
        "Number of executions currently running"
    )
    .unwrap();

    /// Execution duration in seconds
    pub static ref ORCHESTRATOR_EXECUTION_DURATION: HistogramVec = register_histogram_vec!(
        "orchestrator_execution_duration_seconds",
        "Duration of executions in seconds",
        &["system"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
    )
    .unwrap();

    /// Tokens consumed by backend system
    pub static ref ORCHESTRATOR_TOKENS_TOTAL: CounterVec = register_counter_vec!(
        "orchestrator_tokens_total",
        "Total tokens reported by backend agents",
        &["system"]
    )
    .unwrap();

    /// Feedback submissions by rating
    pub static ref ORCHESTRATOR_FEEDBACK_TOTAL: CounterVec = register_counter_vec!(
        "orchestrator_feedback_total",
        "Total number of feedback submissions by rating",
        &["rating"]
    )
    .unwrap();

    /// Batch requests by mode
    pub static ref ORCHESTRATOR_BATCH_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "orchestrator_batch_requests_total",
        "Total number of batch requests by mode",
        &["mode"]
    )
    .unwrap();
}

/// Export all metrics in Prometheus text format
pub fn export_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub fn record_routing(system: SystemKind) {
    ORCHESTRATOR_ROUTING_DECISIONS_TOTAL
        .with_label_values(&[system.to_string().as_str()])
        .inc();
}

pub fn execution_started() {
    ORCHESTRATOR_IN_FLIGHT.inc();
}

pub fn record_execution(response: &UnifiedResponse) {
    let system = response.system_used.to_string();
    ORCHESTRATOR_IN_FLIGHT.dec();
    ORCHESTRATOR_EXECUTIONS_TOTAL
        .with_label_values(&[system.as_str(), response.status.to_string().as_str()])
        .inc();
    ORCHESTRATOR_EXECUTION_DURATION
        .with_label_values(&[system.as_str()])
        .observe(response.duration_ms as f64 / 1000.0);
    ORCHESTRATOR_TOKENS_TOTAL
        .with_label_values(&[system.as_str()])
        .inc_by(response.tokens_used as f64);
}

pub fn record_feedback(rating: u8) {
    ORCHESTRATOR_FEEDBACK_TOTAL
        .with_label_values(&[rating.to_string().as_str()])
        .inc();
}

pub fn record_batch(parallel: bool) {
    ORCHESTRATOR_BATCH_REQUESTS_TOTAL
        .with_label_values(&[if parallel { "parallel" } else { "sequential" }])
        .inc();
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemMetrics {
    pub system: SystemKind,
    pub routed: u64,
    pub completed: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub tokens_used: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackMetrics {
    pub count: u64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub in_flight: u64,
    pub systems: Vec<SystemMetrics>,
    pub feedback: FeedbackMetrics,
}

fn execution_count(system: &str, status: ExecutionState) -> u64 {
    ORCHESTRATOR_EXECUTIONS_TOTAL
        .with_label_values(&[system, status.to_string().as_str()])
        .get() as u64
}

/// Read the process-wide counters back as a JSON-friendly summary.
pub fn summary() -> MetricsSummary {
    let systems = SYSTEMS
        .iter()
        .map(|system| {
            let label = system.to_string();
            let completed = execution_count(&label, ExecutionState::Completed);
            let failed = execution_count(&label, ExecutionState::Failed);
            let finished = completed + failed;
            let duration = ORCHESTRATOR_EXECUTION_DURATION.with_label_values(&[label.as_str()]);
            let samples = duration.get_sample_count();

            SystemMetrics {
                system: *system,
                routed: ORCHESTRATOR_ROUTING_DECISIONS_TOTAL
                    .with_label_values(&[label.as_str()])
                    .get() as u64,
                completed,
                failed,
                success_rate: if finished > 0 {
                    completed as f64 / finished as f64
                } else {
                    0.0
                },
                average_duration_ms: if samples > 0 {
                    duration.get_sample_sum() * 1000.0 / samples as f64
                } else {
                    0.0
                },
                tokens_used: ORCHESTRATOR_TOKENS_TOTAL
                    .with_label_values(&[label.as_str()])
                    .get() as u64,
            }
        })
        .collect();

    let (count, rating_sum) = (1u8..=5).fold((0u64, 0u64), |(count, sum), rating| {
        let n = ORCHESTRATOR_FEEDBACK_TOTAL
            .with_label_values(&[rating.to_string().as_str()])
            .get() as u64;
        (count + n, sum + n * rating as u64)
    });

    MetricsSummary {
        in_flight: ORCHESTRATOR_IN_FLIGHT.get().max(0.0) as u64,
        systems,
        feedback: FeedbackMetrics {
            count,
            average_rating: if count > 0 {
                rating_sum as f64 / count as f64
            } else {
                0.0
            },
        },
    }
}
