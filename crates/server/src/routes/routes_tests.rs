//! Router tests for the orchestrator API

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        Router,
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use deployment::Deployment;
    use serde_json::{Value, json};
    use services::services::{
        adapters::{GraphAdapter, LegacyAdapter},
        backends::LocalMemoryService,
        config::OrchestratorConfig,
        execution_store::InMemoryExecutionStore,
        orchestrator::UnifiedOrchestrator,
        routing::RoutingRules,
        testing::{ScriptedJobQueue, ScriptedLegacyBackend, graph_registry, legacy_registry},
    };
    use tower::ServiceExt;

    use crate::{DeploymentImpl, routes::api_router};

    fn deployment_with(legacy: ScriptedLegacyBackend, queue: ScriptedJobQueue) -> DeploymentImpl {
        let orchestrator = UnifiedOrchestrator::new(
            Arc::new(LegacyAdapter::new(
                Arc::new(legacy_registry()),
                Arc::new(legacy),
            )),
            Arc::new(GraphAdapter::new(
                Arc::new(graph_registry()),
                Arc::new(queue),
                Arc::new(LocalMemoryService::new(100, Duration::from_secs(60))),
                Duration::from_millis(1),
            )),
            Arc::new(InMemoryExecutionStore::new()),
            RoutingRules::default(),
        );
        let mut config = OrchestratorConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        DeploymentImpl::from_parts(config, Arc::new(orchestrator))
    }

    fn deployment() -> DeploymentImpl {
        deployment_with(
            ScriptedLegacyBackend::default(),
            ScriptedJobQueue::completing(json!({ "plan": "graph result" })),
        )
    }

    fn token(deployment: &DeploymentImpl, user: &str) -> String {
        deployment
            .auth()
            .issue(user, Duration::from_secs(300))
            .unwrap()
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_missing_or_bad_token_is_unauthorized() {
        let app = api_router(deployment());
        let (status, body) = send(&app, Method::GET, "/api/orchestrator/agents", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));

        let (status, _) = send(
            &app,
            Method::GET,
            "/api/orchestrator/agents",
            Some("not-a-jwt"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_execute_completes_with_links() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "market research on competitors" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = &body["data"];
        assert_eq!(data["status"], json!("completed"));
        assert_eq!(data["systemUsed"], json!("v1"));
        let id = data["executionId"].as_str().unwrap();
        assert_eq!(
            data["links"]["status"],
            json!(format!("/api/orchestrator/status/{id}"))
        );
        assert_eq!(data["response"]["tokensUsed"], json!(100));
    }

    #[tokio::test]
    async fn test_execute_validation_errors_are_400() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorData"][0]["field"], json!("goal"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": 42 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orchestrator/batch",
            Some(&token),
            Some(json!({ "requests": "market research" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orchestrator/feedback",
            Some(&token),
            Some(json!({ "rating": "five" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_execute_for_another_user_is_forbidden() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "market research", "userId": "user-2" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_manual_agents_fail_routing() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment.clone());

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "anything", "agents": ["ghost"] })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["message"].as_str().unwrap().contains("No valid agents"));
        assert_eq!(deployment.execution_counts().await.total, 0);
    }

    #[tokio::test]
    async fn test_failed_execution_is_500_with_details() {
        let deployment = deployment_with(
            ScriptedLegacyBackend::failing("legacy exploded"),
            ScriptedJobQueue::completing(json!({})),
        );
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "market research" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["errorData"]["status"], json!("failed"));
        assert!(body["message"].as_str().unwrap().contains("legacy exploded"));
    }

    #[tokio::test]
    async fn test_status_and_result_are_owner_only() {
        let deployment = deployment();
        let owner = token(&deployment, "owner");
        let intruder = token(&deployment, "intruder");
        let app = api_router(deployment);

        let (_, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&owner),
            Some(json!({ "goal": "write a product launch email" })),
        )
        .await;
        let id = body["data"]["executionId"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/orchestrator/status/{id}"),
            Some(&intruder),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["data"].is_null());

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/orchestrator/result/{id}"),
            Some(&intruder),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/orchestrator/status/{id}"),
            Some(&owner),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["state"], json!("completed"));
        assert!(body["data"].get("response").is_none());

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/orchestrator/result/{id}"),
            Some(&owner),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["response"]["executionId"], json!(id));
    }

    #[tokio::test]
    async fn test_unknown_execution_is_404() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, _) = send(
            &app,
            Method::GET,
            &format!("/api/orchestrator/status/{}", uuid::Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        for path in ["status", "result"] {
            let (status, body) = send(
                &app,
                Method::GET,
                &format!("/api/orchestrator/{path}/not-an-id"),
                Some(&token),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["success"], json!(false));
            assert!(body["message"].as_str().unwrap().contains("not-an-id"));
        }
    }

    #[tokio::test]
    async fn test_async_execute_returns_202_then_finishes() {
        let deployment = deployment_with(
            ScriptedLegacyBackend::default(),
            ScriptedJobQueue::completing(json!({ "plan": "later" })).pending_polls(3),
        );
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "comprehensive campaign launch", "async": true })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["data"]["status"], json!("queued"));
        let result_link = body["data"]["links"]["result"].as_str().unwrap().to_string();

        let mut finished = None;
        for _ in 0..100 {
            let (status, body) = send(&app, Method::GET, &result_link, Some(&token), None).await;
            if status == StatusCode::OK {
                finished = Some(body);
                break;
            }
            assert_eq!(status, StatusCode::ACCEPTED);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let body = finished.expect("execution did not finish");
        assert_eq!(body["data"]["response"]["result"], json!({ "plan": "later" }));
    }

    #[tokio::test]
    async fn test_batch_size_limits() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment.clone());

        let eleven: Vec<Value> = (0..11).map(|i| json!({ "goal": format!("task {i}") })).collect();
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orchestrator/batch",
            Some(&token),
            Some(json!({ "requests": eleven })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orchestrator/batch",
            Some(&token),
            Some(json!({ "requests": [] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(deployment.execution_counts().await.total, 0);
    }

    #[tokio::test]
    async fn test_batch_reports_each_item() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        for parallel in [false, true] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/api/orchestrator/batch",
                Some(&token),
                Some(json!({
                    "parallel": parallel,
                    "requests": [
                        { "goal": "market research" },
                        { "goal": "" },
                        { "goal": "comprehensive campaign launch" }
                    ]
                })),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            let data = &body["data"];
            assert_eq!(data["total"], json!(3));
            assert_eq!(data["succeeded"], json!(2));
            assert_eq!(data["failed"], json!(1));
            assert_eq!(data["parallel"], json!(parallel));
            assert_eq!(data["results"][0]["index"], json!(0));
            assert_eq!(data["results"][1]["success"], json!(false));
            assert!(data["results"][1]["error"].is_string());
        }
    }

    #[tokio::test]
    async fn test_feedback_rating_is_validated() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        for rating in [0, 6] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/api/orchestrator/feedback",
                Some(&token),
                Some(json!({ "rating": rating })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/orchestrator/feedback",
            Some(&token),
            Some(json!({ "rating": 4, "comment": "useful" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Feedback recorded"));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/orchestrator/feedback",
            Some(&token),
            Some(json!({ "rating": 4, "executionId": uuid::Uuid::new_v4() })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_discovery_endpoints() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        let (status, body) =
            send(&app, Method::GET, "/api/orchestrator/agents", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let all = body["data"]["all"].as_array().unwrap();
        assert_eq!(all.iter().filter(|a| *a == "shared-writer").count(), 1);

        let (status, body) = send(
            &app,
            Method::GET,
            "/api/orchestrator/capabilities",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body["data"].as_array().unwrap().is_empty());

        let (status, body) =
            send(&app, Method::GET, "/api/orchestrator/health", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], json!("healthy"));
        let graph = &body["data"]["systems"][1];
        assert_eq!(graph["system"], json!("v2"));
        assert_eq!(graph["memory"]["hits"], json!(0));
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let deployment = deployment();
        let token = token(&deployment, "user-1");
        let app = api_router(deployment);

        send(
            &app,
            Method::POST,
            "/api/orchestrator/execute",
            Some(&token),
            Some(json!({ "goal": "market research" })),
        )
        .await;

        let (status, body) =
            send(&app, Method::GET, "/api/orchestrator/metrics", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["executions"]["completed"], json!(1));
        assert_eq!(body["data"]["systems"].as_array().unwrap().len(), 3);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/orchestrator/metrics/prometheus")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let text = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&text).contains("orchestrator_executions_total"));
    }
}
