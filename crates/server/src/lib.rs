pub mod error;
pub mod middleware;
pub mod orchestrator_metrics;
pub mod routes;

pub type DeploymentImpl = local_deployment::LocalDeployment;
