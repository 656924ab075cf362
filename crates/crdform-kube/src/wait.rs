//! Polling loops for `wait_for_delete` and `wait_for_upsert`
//!
//! Both loops GET the object, check it, and sleep `min(poll_interval,
//! remaining)` until the deadline. A [`WaitTimeout::Once`] deadline is the start
//! instant, so exactly one GET is made and the loop never sleeps.

use crdform_core::wait::{DeleteWait, WaitCondition, WaitTimeout};
use crdform_core::{JsonPath, ObjectRef, ResourceIdentity};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::{Instant, sleep};

use crate::client::DynamicClient;
use crate::error::{HandlerError, HandlerResult};

/// Time left before `deadline`, or None once it has passed
fn remaining(deadline: Instant) -> Option<Duration> {
    let now = Instant::now();
    (now < deadline).then(|| deadline - now)
}

/// Poll until the object is gone.
///
/// Returns as soon as a GET reports NotFound; any other GET error aborts.
pub async fn wait_for_deletion(
    client: &dyn DynamicClient,
    identity: &ResourceIdentity,
    object: &ObjectRef,
    wait: &DeleteWait,
) -> HandlerResult<()> {
    let deadline = Instant::now() + wait.timeout.budget();
    let mut attempts = 0usize;

    loop {
        attempts += 1;
        match client.get(identity, object).await {
            Err(e) if e.is_not_found() => {
                tracing::info!(object = %object, attempts, "object deleted");
                return Ok(());
            }
            Err(e) => return Err(HandlerError::Get(e)),
            Ok(_) => {}
        }

        let Some(left) = remaining(deadline) else {
            tracing::info!(object = %object, attempts, "timed out waiting for deletion");
            return Err(HandlerError::DeleteTimedOut {
                id: object.id(),
                timeout: wait.timeout.to_string(),
            });
        };
        sleep(wait.poll_interval.min(left)).await;
    }
}

/// Poll until every condition holds, one after another.
///
/// Returns the last object read, if any condition was configured.
pub async fn wait_for_conditions(
    client: &dyn DynamicClient,
    identity: &ResourceIdentity,
    object: &ObjectRef,
    conditions: &[WaitCondition],
) -> HandlerResult<Option<JsonValue>> {
    let mut last_object = None;
    for condition in conditions {
        let path = JsonPath::parse(&condition.jsonpath).map_err(HandlerError::InvalidWait)?;
        last_object = Some(wait_for_condition(client, identity, object, condition, &path).await?);
    }
    Ok(last_object)
}

async fn wait_for_condition(
    client: &dyn DynamicClient,
    identity: &ResourceIdentity,
    object: &ObjectRef,
    condition: &WaitCondition,
    path: &JsonPath,
) -> HandlerResult<JsonValue> {
    let deadline = Instant::now() + condition.timeout.budget();

    loop {
        let current = client.get(identity, object).await.map_err(HandlerError::Get)?;
        let rendered = path.render(&current);
        if rendered.as_deref() == Some(condition.value.as_str()) {
            tracing::info!(object = %object, jsonpath = %condition.jsonpath, "condition met");
            return Ok(current);
        }

        let Some(left) = remaining(deadline) else {
            return Err(HandlerError::UpsertTimedOut {
                id: object.id(),
                jsonpath: condition.jsonpath.clone(),
                expected: condition.value.clone(),
                last: rendered.unwrap_or_else(|| "<none>".to_string()),
                timeout: timeout_label(condition.timeout),
            });
        };
        tracing::debug!(
            object = %object,
            jsonpath = %condition.jsonpath,
            current = rendered.as_deref().unwrap_or("<none>"),
            "condition not met yet"
        );
        sleep(condition.poll_interval.min(left)).await;
    }
}

fn timeout_label(timeout: WaitTimeout) -> String {
    match timeout {
        WaitTimeout::Once => "a single check".to_string(),
        other => other.to_string(),
    }
}
