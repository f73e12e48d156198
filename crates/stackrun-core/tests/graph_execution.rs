//! Layered execution of instance graphs against a scripted provider.

mod support;

use std::time::Duration;

use serde_json::json;
use stackrun_core::deploy::{GraphExecutor, summarize};
use stackrun_core::error::{ProviderError, ROLE_NOT_FOUND_CODE, StackError};
use stackrun_core::graph::{build_graph, set_dependencies};
use stackrun_core::template::InstanceMap;
use stackrun_core::types::{Credentials, Operation};

use support::{RecordingReporter, ScriptedProvider, instance_map};

fn three_tier() -> InstanceMap {
    let mut instances = instance_map(&[
        ("db", json!({"size": "small"})),
        ("api", json!({"dbUrl": "${output:db.url}"})),
        ("web", json!({"apiUrl": "${output:api.url}"})),
    ]);
    set_dependencies(&mut instances);
    instances
}

async fn run(
    instances: &mut InstanceMap,
    operation: Operation,
    provider: &ScriptedProvider,
    reporter: &RecordingReporter,
) -> Result<(), StackError> {
    let graph = build_graph(instances, operation)?;
    let credentials = Credentials::new();
    GraphExecutor::new(provider, reporter, &credentials)
        .execute(instances, operation, graph)
        .await
}

#[tokio::test]
async fn deploy_runs_dependencies_first() {
    let mut instances = three_tier();
    let provider = ScriptedProvider::new().with_outputs("db", json!({"url": "postgres://db"}));
    let reporter = RecordingReporter::default();

    run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["db", "api", "web"]);
    assert_eq!(
        reporter.statuses(),
        vec!["[1/3] Deploying db", "[2/3] Deploying api", "[3/3] Deploying web"]
    );

    let summary = summarize(&instances);
    assert_eq!(summary.succeeded_names(), vec!["api", "db", "web"]);
    assert_eq!(summary.outputs["db"]["url"], "postgres://db");
    assert!(summary.outputs["web"].is_empty());
}

#[tokio::test]
async fn db_api_web_scenario() {
    let mut instances = instance_map(&[
        ("db", json!({})),
        ("api", json!({"db": "${output:db.endpoint}"})),
        ("web", json!({"api": "${output:api.url}"})),
    ]);
    set_dependencies(&mut instances);

    let graph = build_graph(&instances, Operation::Deploy).unwrap();
    assert_eq!(
        graph.edges(),
        vec![
            ("api".to_string(), "db".to_string()),
            ("web".to_string(), "api".to_string()),
        ]
    );

    let provider = ScriptedProvider::new().with_outputs("db", json!({"endpoint": "x"}));
    let reporter = RecordingReporter::default();
    run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["db", "api", "web"]);
    let summary = summarize(&instances);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.outputs.len(), 3);
    assert_eq!(summary.outputs["db"]["endpoint"], "x");
}

#[tokio::test]
async fn remove_runs_dependents_first_with_empty_inputs() {
    let mut instances = three_tier();
    let provider = ScriptedProvider::new();
    let reporter = RecordingReporter::default();

    run(&mut instances, Operation::Remove, &provider, &reporter)
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["web", "api", "db"]);
    assert_eq!(
        reporter.statuses(),
        vec!["[1/3] Removing web", "[2/3] Removing api", "[3/3] Removing db"]
    );
    assert_eq!(provider.received_inputs("api"), Some(json!({})));
}

#[tokio::test]
async fn independent_instances_share_a_layer_and_run_concurrently() {
    let mut instances = instance_map(&[("a", json!({})), ("b", json!({})), ("c", json!({}))]);
    set_dependencies(&mut instances);
    let provider = ScriptedProvider::new().with_delay(Duration::from_millis(20));
    let reporter = RecordingReporter::default();

    run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap();

    assert_eq!(reporter.statuses(), vec!["[1/3] Deploying a, b, c"]);
    assert_eq!(provider.max_in_flight(), 3);
}

#[tokio::test]
async fn failure_is_recorded_and_the_run_continues() {
    let mut instances = three_tier();
    let provider = ScriptedProvider::new().failing("db", ProviderError::new("disk full"));
    let reporter = RecordingReporter::default();

    run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["db", "api", "web"]);
    assert_eq!(reporter.errors(), vec!["db: disk full"]);

    let db = &instances["db"];
    assert!(db.outputs.is_none());
    assert_eq!(db.error.as_ref().unwrap().message, "db: disk full");

    let summary = summarize(&instances);
    assert_eq!(summary.failed_names(), vec!["db"]);
    assert_eq!(summary.succeeded_names(), vec!["api", "web"]);
}

#[tokio::test]
async fn every_instance_lands_in_exactly_one_bucket() {
    let mut instances = instance_map(&[
        ("a", json!({})),
        ("b", json!({"x": "${output:a.x}"})),
        ("c", json!({"x": "${output:a.x}"})),
        ("d", json!({"x": "${output:b.x} ${output:c.x}"})),
    ]);
    set_dependencies(&mut instances);
    let provider = ScriptedProvider::new()
        .failing("b", ProviderError::new("nope").with_code("InvalidParameter"))
        .failing("d", ProviderError::new("nope"));
    let reporter = RecordingReporter::default();

    run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap();

    let summary = summarize(&instances);
    assert_eq!(summary.succeeded.len() + summary.failed.len(), instances.len());
    for instance in instances.values() {
        assert!(instance.succeeded() != instance.failed(), "{}", instance.name);
    }
    assert_eq!(
        instances["b"].error.as_ref().unwrap().code.as_deref(),
        Some("InvalidParameter")
    );
}

#[tokio::test]
async fn fatal_permission_error_stops_after_the_layer() {
    let mut instances = instance_map(&[
        ("cache", json!({})),
        ("db", json!({})),
        ("api", json!({"db": "${output:db.url}", "cache": "${output:cache.url}"})),
    ]);
    set_dependencies(&mut instances);
    let provider = ScriptedProvider::new()
        .with_delay(Duration::from_millis(5))
        .failing(
            "db",
            ProviderError::new("role SLS_QcsRole missing").with_code(ROLE_NOT_FOUND_CODE),
        );
    let reporter = RecordingReporter::default();

    let err = run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap_err();

    match err {
        StackError::FatalPermission { instance, message } => {
            assert_eq!(instance, "db");
            assert_eq!(message, "role SLS_QcsRole missing");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The sibling in the failing layer still finished; the next layer never started.
    assert_eq!(provider.calls(), vec!["cache", "db"]);
    assert!(instances["cache"].succeeded());
    assert!(instances["db"].failed());
    assert!(!instances["api"].succeeded() && !instances["api"].failed());
}

#[tokio::test]
async fn fatal_permission_error_also_stops_remove() {
    let mut instances = three_tier();
    let provider = ScriptedProvider::new().failing(
        "web",
        ProviderError::new("no role").with_code(ROLE_NOT_FOUND_CODE),
    );
    let reporter = RecordingReporter::default();

    let err = run(&mut instances, Operation::Remove, &provider, &reporter)
        .await
        .unwrap_err();

    assert!(matches!(err, StackError::FatalPermission { .. }));
    assert_eq!(provider.calls(), vec!["web"]);
}

#[tokio::test]
async fn cycles_are_rejected_before_any_call() {
    let mut instances = instance_map(&[
        ("a", json!({"x": "${output:b.x}"})),
        ("b", json!({"x": "${output:a.x}"})),
        ("c", json!({})),
    ]);
    set_dependencies(&mut instances);
    let provider = ScriptedProvider::new();
    let reporter = RecordingReporter::default();

    let err = run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap_err();

    match err {
        StackError::CyclicDependency { cycles, report } => {
            assert_eq!(cycles, vec![vec!["a".to_string(), "b".to_string()]]);
            assert!(report.starts_with("Your template has circular dependencies:"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(provider.calls().is_empty());
    assert!(reporter.statuses().is_empty());
}

#[tokio::test]
async fn references_to_unknown_instances_do_not_block() {
    let mut instances = instance_map(&[("api", json!({"x": "${output:elsewhere.url}"}))]);
    set_dependencies(&mut instances);
    assert!(instances["api"].dependencies.is_empty());

    let provider = ScriptedProvider::new();
    let reporter = RecordingReporter::default();
    run(&mut instances, Operation::Deploy, &provider, &reporter)
        .await
        .unwrap();

    assert_eq!(provider.calls(), vec!["api"]);
    assert_eq!(
        provider.received_inputs("api"),
        Some(json!({"x": "${output:elsewhere.url}"}))
    );
}
