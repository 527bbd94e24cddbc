//! When steps for human-task lifecycle BDD scenarios.

use std::sync::Arc;

use super::world::{HumanTaskWorld, approval_node, run_async};
use atelier::human_task::{domain::ActorId, services::HumanTaskNode};
use eyre::WrapErr;
use rstest_bdd_macros::when;
use serde_json::json;

use crate::test_helpers::variables;

#[when("the approval node executes")]
fn approval_node_executes(world: &mut HumanTaskWorld) -> Result<(), eyre::Report> {
    let instance = world
        .instance
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing process instance in scenario world"))?;
    let mut node = HumanTaskNode::new(approval_node()?, Arc::clone(&world.service));
    let task_id = run_async(node.execute(instance)).wrap_err("execute approval node")?;
    world.task_id = Some(task_id);
    Ok(())
}

#[when(r#""{actor}" claims the task"#)]
fn actor_claims_task(world: &mut HumanTaskWorld, actor: String) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let actor = ActorId::new(actor)?;
    world.last_claim = Some(run_async(world.service.claim(task_id, &actor)));
    Ok(())
}

#[when("work starts on the task")]
fn work_starts(world: &mut HumanTaskWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    run_async(world.service.start_working(task_id)).wrap_err("start work on task")?;
    Ok(())
}

#[when("the task is completed")]
fn task_completed(world: &mut HumanTaskWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let outcome = run_async(
        world
            .service
            .complete(task_id, variables(json!({ "approved": true }))),
    )
    .wrap_err("complete task")?;
    world.completions.push(outcome);
    Ok(())
}
