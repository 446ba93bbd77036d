use std::sync::Arc;

use serde_json::Value;
use tokio::time::{sleep, Duration};

use convoflow::{
    ActionInvoker, ActionOutcome, BackendRegistry, ConvoFlowError, EchoBackend, Flow,
    InMemoryFlowStore, InMemoryTemplateStore, TurnDriver, TurnPosition, TurnRequest,
};

struct NoopInvoker;

#[async_trait::async_trait]
impl ActionInvoker for NoopInvoker {
    async fn invoke(&self, _url: &str, _body: &Value) -> ActionOutcome {
        ActionOutcome::success(Value::Null)
    }
}

fn build_driver(flow_json: &str) -> TurnDriver {
    let flows = InMemoryFlowStore::new();
    flows.register(Flow::from_json(flow_json).expect("flow parses"));
    let backends = BackendRegistry::new().with_backend("echo", Arc::new(EchoBackend));
    TurnDriver::new(
        Arc::new(flows),
        Arc::new(InMemoryTemplateStore::new()),
        Arc::new(backends),
        Arc::new(NoopInvoker),
    )
}

fn request(flow: &str, session: &str, input: &str) -> TurnRequest {
    TurnRequest {
        flow_id: flow.to_string(),
        session_id: session.to_string(),
        user_input: input.to_string(),
    }
}

#[tokio::test]
async fn prompt_then_reply_runs_the_flow_across_two_turns() {
    let driver = build_driver(
        r#"{
            "id": "onboarding",
            "name": "Onboarding",
            "nodes": [
                {"id": "start", "kind": "start"},
                {"id": "ask", "kind": "interaction", "prompt": "What is your name?"},
                {"id": "end", "kind": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "ask"},
                {"id": "e2", "source": "ask", "target": "end"}
            ]
        }"#,
    );

    let first = driver
        .handle_turn(request("onboarding", "s1", ""))
        .await
        .expect("first turn");
    assert_eq!(first.emitted, vec!["What is your name?".to_string()]);
    assert_eq!(first.position, TurnPosition::Paused("ask".to_string()));
    assert_eq!(
        driver.sessions().current_node("s1").as_deref(),
        Some("ask")
    );

    let second = driver
        .handle_turn(request("onboarding", "s1", "Alice"))
        .await
        .expect("second turn");
    assert_eq!(second.position, TurnPosition::Completed);
    assert_eq!(
        second.emitted,
        vec!["Flow completed at end node: end".to_string()]
    );
    assert!(driver.sessions().is_empty());
}

#[tokio::test]
async fn prompts_resolve_placeholders_from_the_variable_context() {
    let driver = build_driver(
        r#"{
            "id": "greet",
            "name": "Greeter",
            "nodes": [
                {"id": "start", "kind": "start"},
                {"id": "hello", "kind": "interaction", "prompt": "Hello [user_input], ready?"},
                {"id": "end", "kind": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "hello"},
                {"id": "e2", "source": "hello", "target": "end"}
            ]
        }"#,
    );

    let outcome = driver
        .handle_turn(request("greet", "s1", "Bob"))
        .await
        .expect("turn");
    assert_eq!(outcome.emitted, vec!["Hello Bob, ready?".to_string()]);
}

#[tokio::test]
async fn invalid_input_reprompts_without_advancing() {
    let driver = build_driver(
        r#"{
            "id": "count",
            "name": "Counter",
            "nodes": [
                {"id": "start", "kind": "start"},
                {"id": "ask", "kind": "interaction",
                 "prompt": "How many?", "validation_pattern": "^\\d+$"},
                {"id": "end", "kind": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "ask"},
                {"id": "e2", "source": "ask", "target": "end"}
            ]
        }"#,
    );

    driver
        .handle_turn(request("count", "s1", ""))
        .await
        .expect("first turn");

    let rejected = driver
        .handle_turn(request("count", "s1", "plenty"))
        .await
        .expect("rejected turn");
    assert_eq!(
        rejected.emitted,
        vec![
            "Invalid input. Please try again.".to_string(),
            "How many?".to_string()
        ]
    );
    assert_eq!(rejected.position, TurnPosition::Paused("ask".to_string()));

    let accepted = driver
        .handle_turn(request("count", "s1", "42"))
        .await
        .expect("accepted turn");
    assert_eq!(accepted.position, TurnPosition::Completed);
}

#[tokio::test]
async fn late_reply_is_routed_to_the_timeout_fallback() {
    let driver = build_driver(
        r#"{
            "id": "quiz",
            "name": "Quiz",
            "nodes": [
                {"id": "start", "kind": "start"},
                {"id": "ask", "kind": "interaction",
                 "prompt": "Quick, answer!", "timeout_seconds": 0,
                 "fallback_node": "too_slow"},
                {"id": "too_slow", "kind": "interaction", "prompt": "Too slow. Try again?"},
                {"id": "end", "kind": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "ask"},
                {"id": "e2", "source": "ask", "target": "end"},
                {"id": "e3", "source": "too_slow", "target": "end"}
            ]
        }"#,
    );

    driver
        .handle_turn(request("quiz", "s1", ""))
        .await
        .expect("first turn");
    sleep(Duration::from_millis(20)).await;

    let late = driver
        .handle_turn(request("quiz", "s1", "the answer"))
        .await
        .expect("late turn");
    assert_eq!(late.emitted, vec!["Too slow. Try again?".to_string()]);
    assert_eq!(late.position, TurnPosition::Paused("too_slow".to_string()));
}

#[tokio::test]
async fn branch_takes_the_first_matching_case_or_the_default() {
    let flow = r#"{
        "id": "triage",
        "name": "Triage",
        "nodes": [
            {"id": "start", "kind": "start"},
            {"id": "ask", "kind": "interaction", "prompt": "Proceed?"},
            {"id": "route", "kind": "branch",
             "cases": [
                {"expression": "false", "target_node": "a"},
                {"expression": "user_input == 'yes'", "target_node": "b"}
             ],
             "default_node": "c"},
            {"id": "a", "kind": "interaction", "prompt": "A"},
            {"id": "b", "kind": "interaction", "prompt": "B"},
            {"id": "c", "kind": "interaction", "prompt": "C"}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "ask"},
            {"id": "e2", "source": "ask", "target": "route"}
        ]
    }"#;
    let driver = build_driver(flow);

    driver
        .handle_turn(request("triage", "yes-session", ""))
        .await
        .expect("first turn");
    let matched = driver
        .handle_turn(request("triage", "yes-session", "yes"))
        .await
        .expect("matched turn");
    assert_eq!(matched.emitted, vec!["B".to_string()]);
    assert_eq!(matched.position, TurnPosition::Paused("b".to_string()));

    driver
        .handle_turn(request("triage", "no-session", ""))
        .await
        .expect("first turn");
    let defaulted = driver
        .handle_turn(request("triage", "no-session", "no"))
        .await
        .expect("defaulted turn");
    assert_eq!(defaulted.emitted, vec!["C".to_string()]);
    assert_eq!(defaulted.position, TurnPosition::Paused("c".to_string()));
}

#[tokio::test]
async fn a_start_without_successors_ends_immediately() {
    let driver = build_driver(
        r#"{
            "id": "stub",
            "name": "Stub",
            "nodes": [{"id": "start", "kind": "start"}],
            "edges": []
        }"#,
    );

    let outcome = driver
        .handle_turn(request("stub", "s1", "hi"))
        .await
        .expect("turn");
    assert_eq!(
        outcome.emitted,
        vec!["Flow ended. No further nodes.".to_string()]
    );
    assert_eq!(outcome.position, TurnPosition::Completed);
    assert!(driver.sessions().is_empty());
}

#[tokio::test]
async fn cyclic_auto_chaining_graphs_fail_instead_of_spinning() {
    let driver = build_driver(
        r#"{
            "id": "cycle",
            "name": "Cycle",
            "nodes": [
                {"id": "start", "kind": "start"},
                {"id": "b1", "kind": "branch",
                 "cases": [{"expression": "true", "target_node": "b2"}]},
                {"id": "b2", "kind": "branch",
                 "cases": [{"expression": "true", "target_node": "b1"}]}
            ],
            "edges": [{"id": "e1", "source": "start", "target": "b1"}]
        }"#,
    );

    let err = driver
        .handle_turn(request("cycle", "s1", "go"))
        .await
        .expect_err("cycle must not spin forever");
    assert!(matches!(err, ConvoFlowError::MaxIterationsExceeded(256)));
}

#[tokio::test]
async fn unknown_flow_ids_are_rejected() {
    let driver = build_driver(
        r#"{
            "id": "known",
            "name": "Known",
            "nodes": [{"id": "start", "kind": "start"}],
            "edges": []
        }"#,
    );

    let err = driver
        .handle_turn(request("missing", "s1", "hi"))
        .await
        .expect_err("missing flow");
    assert!(matches!(err, ConvoFlowError::FlowNotFound(_)));
}

#[tokio::test]
async fn completed_sessions_can_start_over_from_the_top() {
    let driver = build_driver(
        r#"{
            "id": "loopable",
            "name": "Loopable",
            "nodes": [
                {"id": "start", "kind": "start"},
                {"id": "ask", "kind": "interaction", "prompt": "Name?"},
                {"id": "end", "kind": "end"}
            ],
            "edges": [
                {"id": "e1", "source": "start", "target": "ask"},
                {"id": "e2", "source": "ask", "target": "end"}
            ]
        }"#,
    );

    driver
        .handle_turn(request("loopable", "s1", ""))
        .await
        .expect("first run, turn one");
    driver
        .handle_turn(request("loopable", "s1", "Alice"))
        .await
        .expect("first run, turn two");

    // completion removed the session, so the next input begins a fresh run
    let restarted = driver
        .handle_turn(request("loopable", "s1", ""))
        .await
        .expect("second run, turn one");
    assert_eq!(restarted.emitted, vec!["Name?".to_string()]);
    assert_eq!(restarted.position, TurnPosition::Paused("ask".to_string()));
}
