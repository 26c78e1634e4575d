//! Tests for the unified orchestrator

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;
    use uuid::Uuid;

    use crate::services::{
        adapters::{GraphAdapter, HealthStatus, LegacyAdapter},
        backends::LocalMemoryService,
        execution_store::{ExecutionStore, InMemoryExecutionStore},
        orchestrator::{OrchestratorError, UnifiedOrchestrator},
        routing::{RoutingError, RoutingRules},
        testing::{ScriptedJobQueue, ScriptedLegacyBackend, graph_registry, legacy_registry},
        unified::{ExecutionState, RequestContext, SystemKind, UnifiedRequest},
    };

    struct Harness {
        orchestrator: UnifiedOrchestrator,
        legacy: Arc<ScriptedLegacyBackend>,
        queue: Arc<ScriptedJobQueue>,
        store: Arc<InMemoryExecutionStore>,
    }

    fn harness_with(legacy: ScriptedLegacyBackend, queue: ScriptedJobQueue) -> Harness {
        let legacy = Arc::new(legacy);
        let queue = Arc::new(queue);
        let store = Arc::new(InMemoryExecutionStore::new());
        let orchestrator = UnifiedOrchestrator::new(
            Arc::new(LegacyAdapter::new(Arc::new(legacy_registry()), legacy.clone())),
            Arc::new(GraphAdapter::new(
                Arc::new(graph_registry()),
                queue.clone(),
                Arc::new(LocalMemoryService::new(100, Duration::from_secs(60))),
                Duration::from_millis(1),
            )),
            store.clone(),
            RoutingRules::default(),
        );
        Harness {
            orchestrator,
            legacy,
            queue,
            store,
        }
    }

    fn harness() -> Harness {
        harness_with(
            ScriptedLegacyBackend::default(),
            ScriptedJobQueue::completing(json!({ "plan": "graph result" })),
        )
    }

    #[tokio::test]
    async fn test_comprehensive_goal_routes_to_graph() {
        let h = harness();
        let decision = h
            .orchestrator
            .route(&UnifiedRequest::new("comprehensive campaign launch", "u1"))
            .await
            .unwrap();
        assert_eq!(decision.system, SystemKind::V2);
    }

    #[tokio::test]
    async fn test_market_research_executes_on_legacy() {
        let h = harness();
        let response = h
            .orchestrator
            .execute(UnifiedRequest::new("market research on competitors", "u1"))
            .await
            .unwrap();

        assert_eq!(response.system_used, SystemKind::V1);
        assert_eq!(response.status, ExecutionState::Completed);
        assert_eq!(response.tokens_used, 100);
        assert_eq!(h.legacy.calls().len(), 1);
        assert!(h.queue.submitted().is_empty());

        let record = h.store.get(&response.execution_id).await.unwrap();
        assert_eq!(record.state, ExecutionState::Completed);
        assert!(record.started_at.is_some());
        assert!(record.completed_at.is_some());
        assert_eq!(record.response.unwrap().execution_id, response.execution_id);
    }

    #[tokio::test]
    async fn test_manual_hybrid_selection_runs_both_phases() {
        let h = harness();
        let request = UnifiedRequest::new("research then launch", "u1")
            .with_agents(vec!["business-intelligence".into(), "content-creator".into()]);

        let decision = h.orchestrator.route(&request).await.unwrap();
        assert_eq!(decision.system, SystemKind::Hybrid);
        let v1 = decision.v1_agents.clone().unwrap();
        let v2 = decision.v2_agents.clone().unwrap();
        assert!(!v1.is_empty() && !v2.is_empty());
        assert!(v1.iter().all(|a| !v2.contains(a)));

        let response = h.orchestrator.execute(request).await.unwrap();
        assert_eq!(response.status, ExecutionState::Completed);
        assert_eq!(response.system_used, SystemKind::Hybrid);
        assert_eq!(
            response.agents_involved,
            vec!["business-intelligence".to_string(), "content-creator".to_string()]
        );
        assert_eq!(response.tokens_used, 300);

        let result = response.result.unwrap();
        assert_eq!(result["v1"], json!({ "summary": "legacy result" }));
        assert_eq!(result["v2"], json!({ "plan": "graph result" }));

        let job = &h.queue.submitted()[0];
        assert_eq!(job.context["bridged"]["v1"], json!({ "summary": "legacy result" }));
    }

    #[tokio::test]
    async fn test_unknown_manual_agent_is_rejected_before_recording() {
        let h = harness();
        let err = h
            .orchestrator
            .execute(UnifiedRequest::new("anything", "u1").with_agents(vec!["ghost".into()]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Routing(RoutingError::NoValidAgents(_))
        ));
        assert!(err.to_string().contains("No valid agents"));
        let counts = h.store.counts().await;
        assert_eq!(counts.processing + counts.completed + counts.failed, 0);
        assert!(h.legacy.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected() {
        let h = harness();
        let err = h
            .orchestrator
            .execute(UnifiedRequest::new("", "u1"))
            .await
            .unwrap_err();
        match err {
            OrchestratorError::Validation(errors) => assert_eq!(errors[0].field, "goal"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_legacy_failure_in_hybrid_skips_graph_phase() {
        let h = harness_with(
            ScriptedLegacyBackend::failing("legacy down"),
            ScriptedJobQueue::completing(json!({})),
        );
        let response = h
            .orchestrator
            .execute(
                UnifiedRequest::new("research", "u1")
                    .with_agents(vec!["business-intelligence".into(), "orchestrator".into()]),
            )
            .await
            .unwrap();

        assert_eq!(response.status, ExecutionState::Failed);
        assert!(response.error.unwrap().starts_with("legacy phase failed"));
        assert!(h.queue.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_graph_failure_in_hybrid_keeps_legacy_output() {
        let h = harness_with(
            ScriptedLegacyBackend::default(),
            ScriptedJobQueue::failing("graph crashed"),
        );
        let response = h
            .orchestrator
            .execute(
                UnifiedRequest::new("research", "u1")
                    .with_agents(vec!["business-intelligence".into(), "orchestrator".into()]),
            )
            .await
            .unwrap();

        assert_eq!(response.status, ExecutionState::Failed);
        assert_eq!(response.error.as_deref(), Some("graph phase failed: graph crashed"));
        assert_eq!(
            response.result.unwrap()["v1"],
            json!({ "summary": "legacy result" })
        );
        assert_eq!(h.legacy.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_orchestration_context_goes_to_graph() {
        let h = harness();
        let request = UnifiedRequest::new("market research", "u1").with_context(RequestContext {
            campaign: Some(json!({ "name": "Spring" })),
            ..Default::default()
        });
        let response = h.orchestrator.execute(request).await.unwrap();
        assert_eq!(response.system_used, SystemKind::V2);
        assert_eq!(h.queue.submitted()[0].agent, "orchestrator");
    }

    #[tokio::test]
    async fn test_submit_then_run_moves_through_states() {
        let h = harness();
        let submission = h
            .orchestrator
            .submit(UnifiedRequest::new("write a haiku", "u1"))
            .await
            .unwrap();
        let id = submission.execution_id;
        assert_eq!(
            h.orchestrator.status(id, "u1").await.unwrap().state,
            ExecutionState::Queued
        );

        let response = h.orchestrator.run(submission).await;
        assert_eq!(response.status, ExecutionState::Completed);
        let record = h.orchestrator.result(id, "u1").await.unwrap();
        assert_eq!(record.state, ExecutionState::Completed);
        assert!(record.response.is_some());
        assert!(h.orchestrator.status(id, "u1").await.unwrap().response.is_none());
    }

    #[tokio::test]
    async fn test_foreign_and_unknown_ids() {
        let h = harness();
        let response = h
            .orchestrator
            .execute(UnifiedRequest::new("write a haiku", "owner"))
            .await
            .unwrap();

        assert!(matches!(
            h.orchestrator.status(response.execution_id, "intruder").await,
            Err(OrchestratorError::Forbidden(_))
        ));
        assert!(matches!(
            h.orchestrator.result(response.execution_id, "intruder").await,
            Err(OrchestratorError::Forbidden(_))
        ));
        assert!(matches!(
            h.orchestrator.status(Uuid::new_v4(), "owner").await,
            Err(OrchestratorError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_available_agents_is_stable_and_deduplicated() {
        let h = harness();
        let first = h.orchestrator.available_agents().await;
        let second = h.orchestrator.available_agents().await;
        assert_eq!(first, second);

        let shared = first.all.iter().filter(|a| *a == "shared-writer").count();
        assert_eq!(shared, 1);
        let mut sorted = first.all.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, first.all);
    }

    #[tokio::test]
    async fn test_health_aggregates_adapters() {
        let h = harness();
        let health = h.orchestrator.health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.systems.len(), 2);

        let degraded = harness_with(
            ScriptedLegacyBackend::default().offline(),
            ScriptedJobQueue::completing(json!({})),
        );
        assert_eq!(
            degraded.orchestrator.health().await.status,
            HealthStatus::Degraded
        );
    }

    #[tokio::test]
    async fn test_capabilities_cover_both_systems() {
        let h = harness();
        let capabilities = h.orchestrator.capabilities().await;
        assert!(capabilities.iter().any(|c| c.system == SystemKind::V1));
        assert!(capabilities.iter().any(|c| c.system == SystemKind::V2));
    }
}
