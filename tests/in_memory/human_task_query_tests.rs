//! In-memory integration tests for human-task queries.

use atelier::human_task::domain::{
    GroupId, HumanTaskStatus, ProcessInstanceId, TaskDefinition, TaskQuery,
};
use rstest::rstest;
use serde_json::json;

use super::helpers::{Harness, actor, approval_node, harness};
use crate::test_helpers::{ScenarioInstance, variables};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn status_document_selects_open_tasks(harness: Harness) -> eyre::Result<()> {
    let open = harness
        .service
        .create(TaskDefinition::new("Triage").with_candidate_users([actor("alice")]))
        .await?;
    let reserved = harness
        .service
        .create(TaskDefinition::new("Sign").with_assignee(actor("carol")))
        .await?;

    let found = harness
        .service
        .query(&TaskQuery::from_document(variables(json!({ "status": "New" }))))
        .await?;
    eyre::ensure!(found.iter().map(|task| task.id()).collect::<Vec<_>>() == vec![open.id()]);

    let assigned = harness
        .service
        .query_one(&TaskQuery::new().with_assignee(&actor("carol")))
        .await?;
    eyre::ensure!(assigned.map(|task| task.id()) == Some(reserved.id()));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn inbox_query_finds_tasks_offered_to_a_group(harness: Harness) -> eyre::Result<()> {
    for id in ["po-2001", "po-2002"] {
        let instance = ScenarioInstance::new(id, variables(json!({})));
        harness.node(approval_node()).execute(&instance).await?;
    }
    harness
        .service
        .create(TaskDefinition::new("Unrelated").with_candidate_users([actor("dana")]))
        .await?;

    let finance = GroupId::new("finance")?;
    let inbox = harness
        .service
        .query(
            &TaskQuery::new()
                .with_candidate_group(&finance)
                .with_status(HumanTaskStatus::New),
        )
        .await?;

    eyre::ensure!(inbox.len() == 2, "expected two finance tasks, got {}", inbox.len());
    eyre::ensure!(inbox.windows(2).all(|pair| match pair {
        [older, newer] => older.created_time() <= newer.created_time(),
        _ => true,
    }));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn process_query_tracks_status_changes(harness: Harness) -> eyre::Result<()> {
    let instance = ScenarioInstance::new("po-3001", variables(json!({ "amount": 90 })));
    let task_id = harness.node(approval_node()).execute(&instance).await?;
    let by_process = TaskQuery::new().with_process(&ProcessInstanceId::new("po-3001")?);

    harness.service.claim(task_id, &actor("bob")).await?;

    let in_progress = harness
        .service
        .query_one(&by_process.clone().with_status(HumanTaskStatus::InProgress))
        .await?;
    eyre::ensure!(in_progress.map(|task| task.id()) == Some(task_id));

    let still_new = harness
        .service
        .query_one(&by_process.with_status(HumanTaskStatus::New))
        .await?;
    eyre::ensure!(still_new.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unmatched_query_returns_nothing(harness: Harness) -> eyre::Result<()> {
    harness
        .service
        .create(TaskDefinition::new("Triage").with_candidate_users([actor("alice")]))
        .await?;

    let document = variables(json!({ "processVariables": { "amount": 1 } }));
    eyre::ensure!(harness.service.query(&TaskQuery::from_document(document)).await?.is_empty());
    eyre::ensure!(
        harness
            .service
            .query_one(&TaskQuery::new().with_status(HumanTaskStatus::Completed))
            .await?
            .is_none()
    );
    Ok(())
}
