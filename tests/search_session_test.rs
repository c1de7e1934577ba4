#![cfg(unix)]

mod common;

use common::Workspace;
use rgscout::core::{Message, MessageSender};
use rgscout::core::SupervisorError;
use rgscout::search::{
    build_arguments, ProcessOutcome, SearchError, SearchNotification, SearchSession, SessionUpdate,
};
use rgscout::SearchQuery;
use serial_test::serial;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn names(session: &SearchSession) -> Vec<String> {
    session.results().iter().map(|e| e.name.clone()).collect()
}

#[tokio::test]
#[serial]
async fn test_results_are_validated_and_sorted() {
    let ws = Workspace::new(&["b.txt", "a.txt", "sub/c.txt", "tail.txt"]);
    let tool = ws.tool(
        r#"printf '%s/b.txt\n%s/missing.txt\n' "$root" "$root"
printf 'rg: %s/locked: Permission denied (os error 13)\n' "$root" >&2
printf '%s/sub/c.txt\n\n   \n%s/a.txt\n' "$root" "$root"
printf '%s/tail.txt' "$root"
exit 0"#,
    );

    let mut session = SearchSession::new(&tool);
    let query = SearchQuery::new(&ws.root, "content", false, vec![]);
    session.start(&query).unwrap();
    assert_eq!(session.outcome(), Some(ProcessOutcome::RunningStillActive));

    let outcome = timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(outcome, Some(ProcessOutcome::CompletedWithMatches));
    // The unterminated last line is not reported
    assert_eq!(names(&session), vec!["a.txt", "b.txt", "c.txt"]);
    assert_eq!(session.missing_paths(), 1);
    assert_eq!(session.results().entries()[2].directory, ws.root.join("sub").display().to_string());
    assert_eq!(session.status_message(), "3 results found");
}

#[tokio::test]
#[serial]
async fn test_exit_codes_map_to_outcomes() {
    let ws = Workspace::new(&["a.txt"]);
    let content = SearchQuery::new(&ws.root, "needle", false, vec![]);
    let listing = SearchQuery::new(&ws.root, "", false, vec![]);

    let cases = [
        ("exit 1", &content, ProcessOutcome::CompletedNoMatches),
        ("exit 2", &content, ProcessOutcome::CompletedToolError(2)),
        ("exit 0", &content, ProcessOutcome::CompletedNoMatches),
        ("exit 0", &listing, ProcessOutcome::CompletedWithMatches),
        ("kill -9 $$", &content, ProcessOutcome::Crashed),
    ];

    for (body, query, expected) in cases {
        let tool = ws.tool(body);
        let mut session = SearchSession::new(&tool);
        session.start(query).unwrap();
        let outcome = timeout(WAIT, session.wait()).await.unwrap();
        assert_eq!(outcome, Some(expected), "script: {}", body);
        assert!(!session.is_running());
    }
}

#[tokio::test]
#[serial]
async fn test_cancel_keeps_partial_results() {
    let ws = Workspace::new(&["first.txt"]);
    let tool = ws.tool(
        r#"printf '%s/first.txt\n' "$root"
exec sleep 30"#,
    );

    let mut session = SearchSession::new(&tool);
    session.start(&SearchQuery::new(&ws.root, "", false, vec![])).unwrap();

    // Wait until the first result has arrived
    while session.results().is_empty() {
        let update = timeout(WAIT, session.next_update()).await.unwrap();
        assert!(matches!(update, Some(SessionUpdate::Batch { .. })));
    }

    assert!(session.cancel());
    assert!(!session.cancel());
    let outcome = timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(outcome, Some(ProcessOutcome::KilledByUser));
    assert_eq!(names(&session), vec!["first.txt"]);
    assert_eq!(session.status_message(), "Search stopped, 1 results kept");

    // Cancelling a finished search does nothing
    assert!(!session.cancel());
    assert_eq!(session.outcome(), Some(ProcessOutcome::KilledByUser));
}

#[tokio::test]
#[serial]
async fn test_second_start_is_rejected_while_running() {
    let ws = Workspace::new(&["a.txt"]);
    let tool = ws.tool(
        r#"printf '%s/a.txt\n' "$root"
exec sleep 30"#,
    );
    let query = SearchQuery::new(&ws.root, "", false, vec![]);

    let mut session = SearchSession::new(&tool);
    session.start(&query).unwrap();
    while session.results().is_empty() {
        timeout(WAIT, session.next_update()).await.unwrap();
    }

    let second = session.start(&query);
    assert!(matches!(second, Err(SearchError::Supervisor(_))));
    // The running search keeps its results
    assert_eq!(session.results().count(), 1);

    session.cancel();
    timeout(WAIT, session.wait()).await.unwrap();

    // A new search starts from an empty result set
    let tool = ws.tool("exit 1");
    let mut session_after = SearchSession::new(&tool);
    session_after.start(&query).unwrap();
    assert_eq!(session_after.results().count(), 0);
    assert_eq!(
        timeout(WAIT, session_after.wait()).await.unwrap(),
        Some(ProcessOutcome::CompletedNoMatches)
    );
}

#[tokio::test]
#[serial]
async fn test_restart_clears_previous_results() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    let tool = ws.tool(r#"printf '%s/a.txt\n%s/b.txt\n' "$root" "$root""#);
    let query = SearchQuery::new(&ws.root, "", false, vec![]);

    let mut session = SearchSession::new(&tool);
    session.start(&query).unwrap();
    timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(session.results().count(), 2);

    session.start(&query).unwrap();
    assert_eq!(session.results().count(), 0);
    timeout(WAIT, session.wait()).await.unwrap();
    assert_eq!(session.results().count(), 2);
}

#[tokio::test]
#[serial]
async fn test_tool_receives_built_arguments() {
    let ws = Workspace::new(&[]);
    let args_file = ws.temp.path().join("args.txt");
    let tool = ws.tool(&format!(
        r#"printf '%s\n' "$@" > '{}'
exit 1"#,
        args_file.display()
    ));
    let query = SearchQuery::new(&ws.root, "foo", false, vec!["*.txt;*.md".to_string()]);

    let mut session = SearchSession::new(&tool);
    session.start(&query).unwrap();
    timeout(WAIT, session.wait()).await.unwrap();

    let recorded: Vec<String> = fs::read_to_string(&args_file)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    let expected: Vec<String> = build_arguments(&query)
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(recorded, expected);
    assert_eq!(&recorded[..6], &["-l", "-F", "foo", "--glob=*.txt", "--glob=*.md", "--no-messages"]);
}

#[tokio::test]
#[serial]
async fn test_notifications_are_published_in_order() {
    let ws = Workspace::new(&["a.txt"]);
    let tool = ws.tool(
        r#"printf '%s/a.txt\n%s/gone.txt\n' "$root" "$root"
exit 0"#,
    );
    let (tx, mut rx) = mpsc::unbounded_channel::<Message<SearchNotification>>();

    let mut session = SearchSession::new(&tool).with_notifier(MessageSender::new(tx));
    session.start(&SearchQuery::new(&ws.root, "x", true, vec![])).unwrap();
    timeout(WAIT, session.wait()).await.unwrap();
    drop(session);

    let mut methods = Vec::new();
    while let Some(message) = rx.recv().await {
        match &message.payload {
            SearchNotification::PushResults { entries, total } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(*total, 1);
            }
            SearchNotification::ReportMissingPath(line) => assert!(line.ends_with("gone.txt")),
            SearchNotification::CompleteSearch { outcome, total } => {
                assert_eq!(*outcome, ProcessOutcome::CompletedWithMatches);
                assert_eq!(*total, 1);
            }
            SearchNotification::ClearResults => {}
        }
        methods.push(message.method);
    }

    assert_eq!(methods.first().map(String::as_str), Some("clearResults"));
    assert_eq!(methods.last().map(String::as_str), Some("completeSearch"));
    assert!(methods.contains(&"pushResults".to_string()));
    assert!(methods.contains(&"reportMissingPath".to_string()));
}

#[tokio::test]
#[serial]
async fn test_spawn_failure_keeps_previous_search() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    let tool = ws.tool(r#"printf '%s/a.txt\n%s/b.txt\n' "$root" "$root""#);
    let query = SearchQuery::new(&ws.root, "", false, vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel::<Message<SearchNotification>>();

    let mut session = SearchSession::new(&tool).with_notifier(MessageSender::new(tx));
    session.start(&query).unwrap();
    timeout(WAIT, session.wait()).await.unwrap();
    while rx.try_recv().is_ok() {}

    // The file still exists but can no longer be executed
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();
    let result = session.start(&query);

    assert!(matches!(
        result,
        Err(SearchError::Supervisor(SupervisorError::Spawn { .. }))
    ));
    assert!(!session.is_running());
    assert_eq!(session.results().count(), 2);
    assert_eq!(session.outcome(), Some(ProcessOutcome::CompletedWithMatches));
    assert_eq!(session.status_message(), "2 results found");
    assert!(rx.try_recv().is_err(), "observers must not be told to clear");
}

#[tokio::test]
#[serial]
async fn test_wait_or_cancel_runs_to_completion_without_stop() {
    let ws = Workspace::new(&["a.txt", "b.txt"]);
    let tool = ws.tool(r#"printf '%s/b.txt\n%s/a.txt\n' "$root" "$root""#);

    let mut session = SearchSession::new(&tool);
    session.start(&SearchQuery::new(&ws.root, "", false, vec![])).unwrap();
    let outcome = timeout(WAIT, session.wait_or_cancel(std::future::pending::<()>()))
        .await
        .unwrap();

    assert_eq!(outcome, Some(ProcessOutcome::CompletedWithMatches));
    assert_eq!(names(&session), vec!["a.txt", "b.txt"]);
}

#[tokio::test]
#[serial]
async fn test_wait_or_cancel_stops_on_request_and_keeps_results() {
    let ws = Workspace::new(&["first.txt"]);
    let tool = ws.tool(
        r#"printf '%s/first.txt\n' "$root"
exec sleep 30"#,
    );
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = stop_tx.send(());
    });

    let mut session = SearchSession::new(&tool);
    session.start(&SearchQuery::new(&ws.root, "", false, vec![])).unwrap();
    let stop = async {
        let _ = stop_rx.await;
    };
    let outcome = timeout(WAIT, session.wait_or_cancel(stop)).await.unwrap();

    assert_eq!(outcome, Some(ProcessOutcome::KilledByUser));
    assert_eq!(names(&session), vec!["first.txt"]);
    assert!(!session.is_running());
}

#[tokio::test]
async fn test_wait_or_cancel_on_idle_session() {
    let mut session = SearchSession::new("rg");
    assert!(session.wait_or_cancel(async {}).await.is_none());
}
