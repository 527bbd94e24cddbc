//! Service and node lifecycle against the `PostgreSQL` store.

use std::sync::Arc;

use atelier::human_task::{
    domain::{ActorId, HumanTaskStatus, TaskDefId},
    ports::{HumanTaskRepository, ProcessInstance, ProcessStatus},
    services::{
        HumanTaskNode, HumanTaskNodeConfig, HumanTaskNodeError, TaskLifecycleError,
    },
};
use rstest::rstest;
use serde_json::json;

use crate::postgres::helpers::{
    BoxError, PreparedStore, actor, group, prepared_store, process_task,
};
use crate::test_helpers::{RecordingEngine, ResumeCall, ScenarioInstance, variables};

fn approval_node() -> HumanTaskNodeConfig {
    HumanTaskNodeConfig::new(
        TaskDefId::new("approve").expect("valid task definition id"),
        "Approve purchase order",
    )
    .with_candidate_users([actor("alice"), actor("bob")])
    .with_candidate_groups([group("finance")])
}

#[rstest]
fn node_to_completion_resumes_the_process_once(
    prepared_store: Result<PreparedStore, BoxError>,
) -> Result<(), BoxError> {
    let store = prepared_store?;
    let engine = RecordingEngine::new();
    let service = Arc::new(store.service(&engine));
    let instance = ScenarioInstance::new("po-5001", variables(json!({ "amount": 4200 })));
    let mut node = HumanTaskNode::new(approval_node(), Arc::clone(&service));

    let (claimed, outcome, rerun) = store.runtime.block_on(async {
        let task_id = node.execute(&instance).await?;
        let claimed = service.claim(task_id, &actor("alice")).await?;
        let outcome = service
            .complete(task_id, variables(json!({ "approved": true })))
            .await?;
        let rerun = HumanTaskNode::new(approval_node(), Arc::clone(&service))
            .execute(&instance)
            .await?;
        Ok::<_, BoxError>((claimed, outcome, rerun))
    })?;

    assert_eq!(instance.current_status(), Some(ProcessStatus::Waiting));
    assert_eq!(claimed.assignee(), Some(&actor("alice")));
    assert_eq!(outcome.task.status(), HumanTaskStatus::Completed);
    assert!(outcome.resumption.is_notified());
    assert_ne!(rerun, outcome.task.id(), "completion frees the activation");
    assert_eq!(
        engine.calls(),
        vec![ResumeCall {
            process_id: instance.id().clone(),
            task_def_id: approval_node().id().clone(),
            outcome: variables(json!({ "approved": true })),
        }]
    );
    Ok(())
}

#[rstest]
fn live_activation_blocks_a_second_node(
    prepared_store: Result<PreparedStore, BoxError>,
) -> Result<(), BoxError> {
    let store = prepared_store?;
    let engine = RecordingEngine::new();
    let service = Arc::new(store.service(&engine));
    let instance = ScenarioInstance::new("po-5002", variables(json!({})));

    let blocked = store.runtime.block_on(async {
        HumanTaskNode::new(approval_node(), Arc::clone(&service))
            .execute(&instance)
            .await?;
        Ok::<_, BoxError>(
            HumanTaskNode::new(approval_node(), Arc::clone(&service))
                .execute(&instance)
                .await,
        )
    })?;

    assert!(
        matches!(
            blocked,
            Err(HumanTaskNodeError::Create(
                TaskLifecycleError::DuplicateActivation { .. }
            ))
        ),
        "expected the live activation to be refused, got {blocked:?}"
    );
    Ok(())
}

#[rstest]
fn racing_claims_leave_one_assignee(
    prepared_store: Result<PreparedStore, BoxError>,
) -> Result<(), BoxError> {
    let store = prepared_store?;
    let engine = RecordingEngine::new();
    let service = Arc::new(store.service(&engine));

    let (results, stored) = store.runtime.block_on(async {
        let task = store
            .repository
            .insert(&process_task("po-5003", "approve"))
            .await?;
        let claims = ["alice", "bob"].map(|name| {
            let service = Arc::clone(&service);
            let task_id = task.id();
            tokio::spawn(async move { service.claim(task_id, &actor(name)).await })
        });
        let mut results = Vec::new();
        for claim in claims {
            results.push(claim.await?);
        }
        let stored = service.find(task.id()).await?;
        Ok::<_, BoxError>((results, stored))
    })?;

    let winners: Vec<ActorId> = results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .filter_map(|task| task.assignee().cloned())
        .collect();
    assert_eq!(winners.len(), 1, "exactly one claim may win: {results:?}");
    assert!(results.iter().filter_map(|result| result.as_ref().err()).all(|err| matches!(
        err,
        TaskLifecycleError::Conflict(_) | TaskLifecycleError::Unauthorized { .. }
    )));
    assert_eq!(
        stored.as_ref().and_then(|task| task.assignee()),
        winners.first()
    );
    Ok(())
}

#[rstest]
fn racing_completions_resume_once(
    prepared_store: Result<PreparedStore, BoxError>,
) -> Result<(), BoxError> {
    let store = prepared_store?;
    let engine = RecordingEngine::new();
    let service = Arc::new(store.service(&engine));

    let results = store.runtime.block_on(async {
        let task = store
            .repository
            .insert(&process_task("po-5004", "approve"))
            .await?;
        let completions = [1, 2].map(|attempt| {
            let service = Arc::clone(&service);
            let task_id = task.id();
            tokio::spawn(async move {
                service
                    .complete(task_id, variables(json!({ "attempt": attempt })))
                    .await
            })
        });
        let mut results = Vec::new();
        for completion in completions {
            results.push(completion.await?);
        }
        Ok::<_, BoxError>(results)
    })?;

    let notified = results
        .iter()
        .filter(|result| {
            result
                .as_ref()
                .is_ok_and(|outcome| outcome.resumption.is_notified())
        })
        .count();
    assert_eq!(notified, 1, "unexpected outcomes: {results:?}");
    assert!(results.iter().all(|result| match result {
        Ok(outcome) => outcome.task.status() == HumanTaskStatus::Completed,
        Err(err) => matches!(err, TaskLifecycleError::Conflict(_)),
    }));
    assert_eq!(engine.calls().len(), 1);
    Ok(())
}
