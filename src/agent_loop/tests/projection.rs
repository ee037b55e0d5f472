use super::*;

use pretty_assertions::assert_eq;

#[tokio::test]
async fn model_failure_ends_run_with_one_failure_turn() {
    let provider = ScriptedProvider::new(vec![Err(MedicError::api(500, "upstream down"))]);
    let (sink, events) = capture_events();
    let (driver, probe, shell) = driver_with(provider, sink);

    let result = driver.run(test_context()).await;
    assert_eq!(result.outcome, RunOutcome::Failed);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("upstream down")));

    let failures = turns(&events, TurnRole::Failure);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("upstream down"));
    assert_eq!(probe.teardowns.load(Ordering::SeqCst), 1);
    assert_eq!(shell.teardowns.load(Ordering::SeqCst), 1);

    let seen = notifications(&events);
    assert_eq!(seen.first(), Some(&Notification::Clear));
    assert_eq!(seen.get(1), Some(&Notification::Running { value: true }));
    assert_eq!(seen.last(), Some(&Notification::Running { value: false }));
}

#[tokio::test]
async fn unknown_tool_is_reported_back_and_run_continues() {
    let call = crate::types::ToolCall {
        id: "call-x".to_string(),
        name: "does_not_exist".to_string(),
        arguments: serde_json::json!({}),
    };
    let provider = ScriptedProvider::new(vec![
        Ok(ModelReply::default().with_tool_call(call)),
        Ok(ModelReply::text("Sorry, wrong tool.")),
    ]);
    let (sink, events) = capture_events();
    let (driver, _probe, _shell) = driver_with(provider.clone(), sink);

    let result = driver.run(test_context()).await;
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(provider.calls(), 2);

    let reported = notifications(&events).into_iter().find_map(|n| match n {
        Notification::ToolResult {
            tool_name,
            content,
            is_error,
        } if tool_name == "does_not_exist" => Some((content, is_error)),
        _ => None,
    });
    let (content, is_error) = reported.expect("tool result notification");
    assert!(is_error);
    assert!(content.contains("does not exist"));
}

#[tokio::test]
async fn sequence_numbers_are_dense_and_increasing() {
    let provider = ScriptedProvider::new(vec![Ok(ModelReply::text("Done."))]);
    let (sink, events) = capture_events();
    let (driver, _probe, _shell) = driver_with(provider, sink);
    let run_id = driver.run_id();

    let result = driver.run(test_context()).await;
    assert_eq!(result.run_id, run_id);

    let events = events.lock().expect("event lock");
    let seqs: Vec<u64> = events.iter().map(|e| e.seq).collect();
    let expected: Vec<u64> = (1..=events.len() as u64).collect();
    assert_eq!(seqs, expected);
    assert!(events.iter().all(|e| e.run_id == run_id));
}

#[tokio::test]
async fn blank_agent_text_is_not_projected() {
    let provider = ScriptedProvider::new(vec![Ok(ModelReply::text("  "))]);
    let (sink, events) = capture_events();
    let (driver, _probe, _shell) = driver_with(provider, sink);

    let result = driver.run(test_context()).await;
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert!(turns(&events, TurnRole::Agent).is_empty());
}

#[tokio::test]
async fn run_registry_tracks_runs_until_they_end() {
    let (provider, entered, release) =
        ScriptedProvider::gated(vec![Ok(ModelReply::text("Done."))]);
    let (sink, _events) = capture_events();
    let (driver, _probe, _shell) = driver_with(provider, sink);
    let run_id = driver.run_id();

    let registry = RunRegistry::new();
    let handle = registry.launch(driver, test_context());
    entered.notified().await;
    assert_eq!(registry.active(), vec![run_id]);
    let control = registry.get(run_id).expect("registered run");
    assert_eq!(control.status(), RunStatus::Running);

    release.notify_one();
    let result = handle.await.expect("join run");
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert!(registry.get(run_id).is_none());
    assert!(registry.active().is_empty());
    assert_eq!(control.status(), RunStatus::Finished);
}

#[tokio::test]
async fn completed_run_reports_finished_and_ignores_stop() {
    let provider = ScriptedProvider::new(vec![Ok(ModelReply::text("Install a C toolchain."))]);
    let (sink, events) = capture_events();
    let (driver, _probe, _shell) = driver_with(provider, sink);
    let control = driver.control();

    let result = driver.run(test_context()).await;
    assert_eq!(result.outcome, RunOutcome::Completed);
    assert_eq!(control.status(), RunStatus::Finished);
    assert!(!control.stop());
    assert!(!control.pause());
    assert!(turns(&events, TurnRole::System).is_empty());
}
