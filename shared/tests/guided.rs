use shared::guided::{
    Advance, Answers, FlowState, GuidedFlow, KeyCommand, Step, DEFAULT_COMPLETION_MESSAGE, PACING_DELAY,
};
use shared::Role;

fn two_step_flow() -> GuidedFlow {
    GuidedFlow::new(vec![
        Step::text("name", "name", "What should I call you?"),
        Step::tap("end", "Take a breath."),
    ])
}

#[test]
fn tapping_past_the_end_completes_exactly_once() {
    let mut flow = two_step_flow();
    assert!(matches!(flow.submit_text("Aki"), Advance::Transitioning(_)));
    assert!(flow.reveal());

    let mut expected = Answers::new();
    expected.insert("name".into(), "Aki".into());

    // Two taps land back to back.
    let first = flow.tap();
    let second = flow.tap();

    assert_eq!(first, Advance::Completed(expected));
    assert_eq!(second, Advance::Ignored);
    assert_eq!(flow.state(), FlowState::Completed);

    let completions = flow
        .transcript()
        .iter()
        .filter(|m| m.role == Role::Assistant && m.content == DEFAULT_COMPLETION_MESSAGE)
        .count();
    assert_eq!(completions, 1);
    assert!(!flow.reveal());
}

#[test]
fn restart_after_completion_resets_everything() {
    let mut flow = two_step_flow().with_completion_message("done");
    flow.submit_text("Aki");
    flow.reveal();
    flow.tap();
    assert!(flow.is_completed());

    flow.restart();

    assert_eq!(flow.state(), FlowState::Showing(0));
    assert!(flow.answers().is_empty());
    assert_eq!(flow.transcript().len(), 1);
    assert_eq!(flow.transcript()[0].content, "What should I call you?");
    assert_eq!(flow.position(), 0);
}

#[test]
fn select_only_accepts_listed_options() {
    let mut flow = GuidedFlow::new(vec![Step::select(
        "mood",
        "mood",
        "Pick one",
        &["calm", "restless"],
    )]);

    assert_eq!(flow.select("angry"), Advance::Ignored);
    assert!(matches!(flow.select("calm"), Advance::Completed(_)));
    assert_eq!(flow.answers().get("mood").map(String::as_str), Some("calm"));
    assert_eq!(flow.transcript()[1].role, Role::User);
    assert_eq!(flow.transcript()[1].content, "calm");
}

#[test]
fn space_and_enter_advance_tap_steps() {
    let mut flow = GuidedFlow::new(vec![
        Step::tap("one", "First"),
        Step::tap("two", "Second"),
        Step::tap("three", "Third"),
    ]);

    let next = KeyCommand::from_code("Space").unwrap();
    assert_eq!(flow.key(next), Advance::Transitioning(PACING_DELAY));
    // Still transitioning: the second press is dropped.
    assert_eq!(flow.key(next), Advance::Ignored);
    assert!(flow.reveal());

    assert_eq!(
        flow.key(KeyCommand::from_code("Enter").unwrap()),
        Advance::Transitioning(PACING_DELAY)
    );
    assert!(flow.reveal());
    assert_eq!(flow.state(), FlowState::Showing(2));

    assert_eq!(
        flow.key(KeyCommand::from_code("ArrowLeft").unwrap()),
        Advance::Transitioning(PACING_DELAY)
    );
    assert!(flow.reveal());
    assert_eq!(flow.state(), FlowState::Showing(1));
}

#[test]
fn shortcuts_do_nothing_on_input_steps() {
    let mut flow = two_step_flow();

    assert_eq!(flow.key(KeyCommand::Next), Advance::Ignored);
    assert_eq!(flow.key(KeyCommand::Previous), Advance::Ignored);
    assert_eq!(flow.state(), FlowState::Showing(0));
    assert_eq!(KeyCommand::from_code("KeyA"), None);
}
