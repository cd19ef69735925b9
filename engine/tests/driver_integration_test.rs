//! Integration tests for the decision loop driver
//!
//! Validates the action/reply contract end to end: tool dispatch and
//! feedback, re-prompting on invalid JSON, the fallback reply and the turn
//! cap.

mod common;

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use common::harness;
use genesis_engine::agent::driver::FALLBACK_REPLY;
use genesis_engine::agent::{
    Driver, TaskState, TaskStatus, TurnObserver, TurnOutcome, INVALID_JSON_PROMPT,
};
use genesis_engine::events::{EventKind, EventSink, MemorySink};
use genesis_engine::llm::MessageRole;
use genesis_engine::tools::{ListFilesTool, PathResolver, ToolRegistry, WriteFileTool};
use sdk::{ActionRequest, CoreTool};

/// Tool that records its arguments and echoes them back
struct RecordingTool {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl CoreTool for RecordingTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn signature(&self) -> &str {
        "run_command(cmd)"
    }

    fn description(&self) -> &str {
        "Pretend to run a command."
    }

    async fn call(&self, args: &[String]) -> String {
        self.calls.lock().unwrap().push(args.to_vec());
        format!("ran {}", args.join(" "))
    }
}

fn recording_registry() -> (Arc<ToolRegistry>, Arc<Mutex<Vec<Vec<String>>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let registry = ToolRegistry::empty().with(RecordingTool {
        calls: Arc::clone(&calls),
    });
    (Arc::new(registry), calls)
}

#[derive(Default)]
struct Recorder {
    thoughts: Vec<String>,
    actions: Vec<ActionRequest>,
    results: Vec<String>,
    replies: Vec<String>,
    parse_errors: usize,
    cap: Option<usize>,
}

impl TurnObserver for Recorder {
    fn on_thought(&mut self, thought: &str) {
        self.thoughts.push(thought.to_string());
    }

    fn on_action(&mut self, action: &ActionRequest) {
        self.actions.push(action.clone());
    }

    fn on_tool_result(&mut self, _tool: &str, result: &str) {
        self.results.push(result.to_string());
    }

    fn on_reply(&mut self, reply: &str) {
        self.replies.push(reply.to_string());
    }

    fn on_parse_error(&mut self, _raw: &str) {
        self.parse_errors += 1;
    }

    fn on_cap_reached(&mut self, max_turns: usize) {
        self.cap = Some(max_turns);
    }
}

fn events() -> (Arc<MemorySink>, Arc<dyn EventSink>) {
    let sink = Arc::new(MemorySink::new());
    let events = Arc::clone(&sink) as Arc<dyn EventSink>;
    (sink, events)
}

#[tokio::test]
async fn test_reply_ends_loop_immediately() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![Some(r#"{"thought":"easy","reply":"Hello there"}"#)],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, calls) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let mut recorder = Recorder::default();
    let outcome = driver.run(&mut h.agent, "Hi", &mut recorder).await;

    assert_eq!(outcome, TurnOutcome::Reply("Hello there".to_string()));
    assert_eq!(recorder.thoughts, vec!["easy".to_string()]);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(h.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_action_result_is_fed_back_as_tool_output() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![
            Some(r#"{"thought":"look","action":{"tool":"run_command","args":["ls -la"]}}"#),
            Some(r#"{"thought":"seen it","reply":"Task completed."}"#),
        ],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, calls) = recording_registry();
    let (sink, events) = events();
    let driver = Driver::new(tools, 10, events);

    let mut recorder = Recorder::default();
    let outcome = driver
        .run(&mut h.agent, "List the workspace", &mut recorder)
        .await;

    assert_eq!(outcome, TurnOutcome::Reply("Task completed.".to_string()));
    assert_eq!(*calls.lock().unwrap(), vec![vec!["ls -la".to_string()]]);
    assert_eq!(recorder.results, vec!["ran ls -la".to_string()]);

    // Second model call saw the tool result as the newest user message
    let seen = h.seen.lock().unwrap();
    let last = seen[1].last().unwrap();
    assert_eq!(last.role, MessageRole::User);
    assert_eq!(last.content, "Tool Output: ran ls -la");

    assert_eq!(h.agent.state().status, TaskStatus::Completed);
    assert_eq!(h.agent.state().current_step, 1);

    let actions: Vec<String> = sink
        .events()
        .into_iter()
        .filter(|(kind, _, _)| *kind == EventKind::Action)
        .map(|(_, content, _)| content)
        .collect();
    assert_eq!(actions, vec![r#"run_command(["ls -la"])"#.to_string()]);
}

#[tokio::test]
async fn test_unknown_tool_is_reported_to_model() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![
            Some(r#"{"action":{"tool":"fly","args":["away"]}}"#),
            Some(r#"{"reply":"That tool does not exist, sorry."}"#),
        ],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, _) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let outcome = driver
        .run(&mut h.agent, "Fly", &mut Recorder::default())
        .await;

    assert!(matches!(outcome, TurnOutcome::Reply(_)));
    let seen = h.seen.lock().unwrap();
    assert_eq!(
        seen[1].last().unwrap().content,
        "Tool Output: Error: Tool fly not found."
    );
}

#[tokio::test]
async fn test_invalid_json_triggers_reprompt() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![
            Some("Sure, I will list the files now."),
            Some(r#"{"reply":"Here you go"}"#),
        ],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, calls) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let mut recorder = Recorder::default();
    let outcome = driver
        .run(&mut h.agent, "List files", &mut recorder)
        .await;

    assert_eq!(outcome, TurnOutcome::Reply("Here you go".to_string()));
    assert_eq!(recorder.parse_errors, 1);
    assert!(calls.lock().unwrap().is_empty());

    let seen = h.seen.lock().unwrap();
    assert_eq!(seen[1].last().unwrap().content, INVALID_JSON_PROMPT);
}

#[tokio::test]
async fn test_reprompt_keeps_the_users_task() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![Some("not json"), Some(r#"{"thought":"ok","reply":"hi"}"#)],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, _) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let outcome = driver
        .run(&mut h.agent, "Build a CSV parser", &mut Recorder::default())
        .await;

    assert_eq!(outcome, TurnOutcome::Reply("hi".to_string()));

    let state = h.agent.state();
    assert_eq!(state.task.as_deref(), Some("Build a CSV parser"));
    assert_eq!(state.status, TaskStatus::InProgress);
    assert_eq!(
        state.notes,
        vec!["Task started: Build a CSV parser", "Thought: ok", "Reply: hi"]
    );

    let users: Vec<String> = h
        .sink
        .events()
        .into_iter()
        .filter(|(kind, _, _)| *kind == EventKind::User)
        .map(|(_, content, _)| content)
        .collect();
    assert_eq!(users, vec!["Build a CSV parser".to_string()]);
}

#[tokio::test]
async fn test_thought_only_decision_is_shown_as_reply() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![Some(r#"{"thought":"I need more details"}"#)],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, _) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let outcome = driver
        .run(&mut h.agent, "Do it", &mut Recorder::default())
        .await;
    assert_eq!(
        outcome,
        TurnOutcome::Reply("I need more details".to_string())
    );
}

#[tokio::test]
async fn test_empty_decision_uses_fallback_reply() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![Some("{}")],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, _) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let outcome = driver
        .run(&mut h.agent, "Do it", &mut Recorder::default())
        .await;
    assert_eq!(outcome, TurnOutcome::Reply(FALLBACK_REPLY.to_string()));
}

#[tokio::test]
async fn test_turn_cap_stops_endless_actions() {
    let temp_dir = TempDir::new().unwrap();
    let script = (0..20)
        .map(|_| Some(r#"{"action":{"tool":"run_command","args":["sleep 1"]}}"#))
        .collect();
    let mut h = harness(
        script,
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, calls) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);
    assert_eq!(driver.max_turns(), 10);

    let mut recorder = Recorder::default();
    let outcome = driver
        .run(&mut h.agent, "Loop forever", &mut recorder)
        .await;

    assert_eq!(outcome, TurnOutcome::CapReached(10));
    assert_eq!(recorder.cap, Some(10));
    assert_eq!(h.seen.lock().unwrap().len(), 10);
    assert_eq!(calls.lock().unwrap().len(), 10);
    assert_eq!(h.agent.state().current_step, 10);
    assert_eq!(h.agent.state().status, TaskStatus::InProgress);
}

#[tokio::test]
async fn test_brain_error_reply_surfaces_to_user() {
    let temp_dir = TempDir::new().unwrap();
    let mut h = harness(
        vec![None],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (tools, _) = recording_registry();
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let outcome = driver
        .run(&mut h.agent, "Hello", &mut Recorder::default())
        .await;
    assert_eq!(
        outcome,
        TurnOutcome::Reply("I encountered a brain error. Retrying...".to_string())
    );
}

#[tokio::test]
async fn test_file_tools_round_trip_through_loop() {
    let temp_dir = TempDir::new().unwrap();
    let workspace = temp_dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();

    let paths = PathResolver::new(&workspace, temp_dir.path());
    let tools = Arc::new(
        ToolRegistry::empty()
            .with(WriteFileTool::new(paths.clone()))
            .with(ListFilesTool::new(paths)),
    );

    let mut h = harness(
        vec![
            Some(r#"{"action":{"tool":"write_file","args":["notes.txt","hello"]}}"#),
            Some(r#"{"action":{"tool":"list_files","args":["."]}}"#),
            Some(r#"{"reply":"Task completed."}"#),
        ],
        &temp_dir.path().join("state.json"),
        TaskState::default(),
    );
    let (_, events) = events();
    let driver = Driver::new(tools, 10, events);

    let mut recorder = Recorder::default();
    let outcome = driver
        .run(&mut h.agent, "Write some notes", &mut recorder)
        .await;

    assert_eq!(outcome, TurnOutcome::Reply("Task completed.".to_string()));
    assert_eq!(
        std::fs::read_to_string(workspace.join("notes.txt")).unwrap(),
        "hello"
    );
    assert!(recorder.results[0].starts_with("File written to "));
    assert_eq!(recorder.results[1], "notes.txt");
    assert_eq!(h.agent.state().current_step, 2);
}
