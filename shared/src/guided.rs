//! Step-by-step guided work: a fixed list of steps shown one at a time, with
//! answers collected along the way and echoed into a chat-like transcript.
//!
//! Advancing never blocks. It moves the flow into [`FlowState::Transitioning`]
//! and reports the pacing delay; the owner arms a timer and calls
//! [`GuidedFlow::reveal`] when it fires (or simply drops the timer on
//! teardown).

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::Message;

pub type Answers = BTreeMap<String, String>;

pub const PACING_DELAY: Duration = Duration::from_millis(800);

pub const DEFAULT_COMPLETION_MESSAGE: &str = "ワークお疲れ様でした。\n今の体感を大切にしてください。✨";

#[derive(Clone)]
pub enum StepText {
    Static(String),
    /// Rendered from the answers collected before the step is shown.
    Template(Rc<dyn Fn(&Answers) -> String>),
}

impl StepText {
    pub fn template(render: impl Fn(&Answers) -> String + 'static) -> Self {
        Self::Template(Rc::new(render))
    }

    pub fn render(&self, answers: &Answers) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Template(render) => render(answers),
        }
    }
}

impl fmt::Debug for StepText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Template(_) => f.write_str("Template(..)"),
        }
    }
}

impl From<&str> for StepText {
    fn from(text: &str) -> Self {
        Self::Static(text.to_owned())
    }
}

impl From<String> for StepText {
    fn from(text: String) -> Self {
        Self::Static(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepInput {
    Tap,
    Select(Vec<String>),
    Text { placeholder: Option<String> },
}

#[derive(Debug, Clone)]
pub struct Step {
    pub id: String,
    pub text: StepText,
    pub input: StepInput,
    /// Where the answer is recorded. Tap steps have none.
    pub key: Option<String>,
}

impl Step {
    pub fn tap(id: &str, text: impl Into<StepText>) -> Self {
        Self {
            id: id.to_owned(),
            text: text.into(),
            input: StepInput::Tap,
            key: None,
        }
    }

    pub fn select(id: &str, key: &str, text: impl Into<StepText>, options: &[&str]) -> Self {
        Self {
            id: id.to_owned(),
            text: text.into(),
            input: StepInput::Select(options.iter().map(|o| o.to_string()).collect()),
            key: Some(key.to_owned()),
        }
    }

    pub fn text(id: &str, key: &str, text: impl Into<StepText>) -> Self {
        Self {
            id: id.to_owned(),
            text: text.into(),
            input: StepInput::Text { placeholder: None },
            key: Some(key.to_owned()),
        }
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        if let StepInput::Text { placeholder: slot } = &mut self.input {
            *slot = Some(placeholder.to_owned());
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Showing(usize),
    Transitioning { to: usize },
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The input did not apply to the current state.
    Ignored,
    /// Call [`GuidedFlow::reveal`] after this delay.
    Transitioning(Duration),
    /// The flow just finished; carries the final answers.
    Completed(Answers),
}

/// Keyboard shortcuts, by `KeyboardEvent.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Next,
    Previous,
}

impl KeyCommand {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "Space" | "Enter" => Some(Self::Next),
            "ArrowLeft" | "Backspace" => Some(Self::Previous),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct GuidedFlow {
    steps: Vec<Step>,
    state: FlowState,
    answers: Answers,
    transcript: Vec<Message>,
    completion_message: String,
}

impl GuidedFlow {
    pub fn new(steps: Vec<Step>) -> Self {
        let mut flow = Self {
            steps,
            state: FlowState::Completed,
            answers: Answers::new(),
            transcript: Vec::new(),
            completion_message: DEFAULT_COMPLETION_MESSAGE.to_owned(),
        };
        flow.restart();
        flow
    }

    pub fn with_completion_message(mut self, message: impl Into<String>) -> Self {
        self.completion_message = message.into();
        self
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        self.state == FlowState::Completed
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the step being shown, or about to be shown.
    pub fn position(&self) -> usize {
        match self.state {
            FlowState::Showing(index) | FlowState::Transitioning { to: index } => index,
            FlowState::Completed => self.steps.len().saturating_sub(1),
        }
    }

    /// The step accepting input right now.
    pub fn current_step(&self) -> Option<&Step> {
        match self.state {
            FlowState::Showing(index) => self.steps.get(index),
            _ => None,
        }
    }

    pub fn current_text(&self) -> Option<String> {
        self.current_step()
            .map(|step| step.text.render(&self.answers))
    }

    pub fn tap(&mut self) -> Advance {
        match self.showing() {
            Some((index, StepInput::Tap)) => self.advance_from(index),
            _ => Advance::Ignored,
        }
    }

    pub fn select(&mut self, option: &str) -> Advance {
        let Some((index, StepInput::Select(options))) = self.showing() else {
            return Advance::Ignored;
        };
        if !options.iter().any(|o| o == option) {
            return Advance::Ignored;
        }

        self.record(index, option.to_owned());
        self.advance_from(index)
    }

    pub fn submit_text(&mut self, text: &str) -> Advance {
        let Some((index, StepInput::Text { .. })) = self.showing() else {
            return Advance::Ignored;
        };
        let text = text.trim();
        if text.is_empty() {
            return Advance::Ignored;
        }

        self.record(index, text.to_owned());
        self.advance_from(index)
    }

    /// Applies a keyboard shortcut. Shortcuts only act on tap steps, so
    /// typing into a text step is never taken as navigation.
    pub fn key(&mut self, command: KeyCommand) -> Advance {
        if !matches!(self.showing(), Some((_, StepInput::Tap))) {
            return Advance::Ignored;
        }

        match command {
            KeyCommand::Next => self.tap(),
            KeyCommand::Previous => self.back(),
        }
    }

    /// Returns to the previous step, through the same paced transition.
    pub fn back(&mut self) -> Advance {
        match self.state {
            FlowState::Showing(index) if index > 0 => {
                self.state = FlowState::Transitioning { to: index - 1 };
                Advance::Transitioning(PACING_DELAY)
            }
            _ => Advance::Ignored,
        }
    }

    /// Finishes a pending transition by showing the target step. Returns
    /// whether anything changed.
    pub fn reveal(&mut self) -> bool {
        let FlowState::Transitioning { to } = self.state else {
            return false;
        };

        self.state = FlowState::Showing(to);
        self.show(to);
        true
    }

    /// Back to the first step with no answers.
    pub fn restart(&mut self) {
        self.answers.clear();
        self.transcript.clear();

        if self.steps.is_empty() {
            self.state = FlowState::Completed;
        } else {
            self.state = FlowState::Showing(0);
            self.show(0);
        }
    }

    fn showing(&self) -> Option<(usize, StepInput)> {
        match self.state {
            FlowState::Showing(index) => Some((index, self.steps[index].input.clone())),
            _ => None,
        }
    }

    fn record(&mut self, index: usize, answer: String) {
        if let Some(key) = &self.steps[index].key {
            self.answers.insert(key.clone(), answer.clone());
        }
        self.transcript.push(Message::user(answer));
    }

    fn advance_from(&mut self, index: usize) -> Advance {
        let next = index + 1;
        if next >= self.steps.len() {
            self.state = FlowState::Completed;
            self.transcript
                .push(Message::assistant(self.completion_message.clone()));
            log::debug!("guided flow completed with {} answers", self.answers.len());
            return Advance::Completed(self.answers.clone());
        }

        self.state = FlowState::Transitioning { to: next };
        Advance::Transitioning(PACING_DELAY)
    }

    fn show(&mut self, index: usize) {
        let text = self.steps[index].text.render(&self.answers);
        self.transcript.push(Message::assistant(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps() -> Vec<Step> {
        vec![
            Step::tap("intro", "Close your eyes."),
            Step::text("feeling", "feeling", "What do you feel?"),
            Step::select("depth", "depth", "How strong is it?", &["light", "heavy"]),
            Step::tap(
                "outro",
                StepText::template(|answers| {
                    format!(
                        "You felt {} ({}).",
                        answers.get("feeling").map(String::as_str).unwrap_or("?"),
                        answers.get("depth").map(String::as_str).unwrap_or("?"),
                    )
                }),
            ),
        ]
    }

    fn settle(flow: &mut GuidedFlow, advance: Advance) {
        assert_eq!(advance, Advance::Transitioning(PACING_DELAY));
        assert!(flow.reveal());
    }

    #[test]
    fn inputs_must_match_the_step_kind() {
        let mut flow = GuidedFlow::new(steps());

        assert_eq!(flow.submit_text("nope"), Advance::Ignored);
        assert_eq!(flow.select("light"), Advance::Ignored);
        let advance = flow.tap();
        settle(&mut flow, advance);

        assert_eq!(flow.tap(), Advance::Ignored);
        assert_eq!(flow.submit_text("   "), Advance::Ignored);
        let advance = flow.submit_text("  warm  ");
        settle(&mut flow, advance);

        assert_eq!(flow.select("medium"), Advance::Ignored);
        assert_eq!(flow.answers().get("feeling").map(String::as_str), Some("warm"));
    }

    #[test]
    fn template_text_sees_prior_answers() {
        let mut flow = GuidedFlow::new(steps());
        let advance = flow.tap();
        settle(&mut flow, advance);
        let advance = flow.submit_text("warm");
        settle(&mut flow, advance);
        let advance = flow.select("heavy");
        settle(&mut flow, advance);

        assert_eq!(flow.current_text().as_deref(), Some("You felt warm (heavy)."));
        let transcript: Vec<_> = flow.transcript().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            transcript,
            vec![
                "Close your eyes.",
                "What do you feel?",
                "warm",
                "How strong is it?",
                "heavy",
                "You felt warm (heavy).",
            ]
        );
    }

    #[test]
    fn input_is_ignored_while_transitioning() {
        let mut flow = GuidedFlow::new(steps());

        assert!(matches!(flow.tap(), Advance::Transitioning(_)));
        assert_eq!(flow.tap(), Advance::Ignored);
        assert_eq!(flow.state(), FlowState::Transitioning { to: 1 });
        assert_eq!(flow.position(), 1);
        assert!(flow.current_step().is_none());
    }

    #[test]
    fn back_returns_to_previous_step() {
        let mut flow = GuidedFlow::new(steps());
        let advance = flow.tap();
        settle(&mut flow, advance);

        let advance = flow.back();
        settle(&mut flow, advance);

        assert_eq!(flow.state(), FlowState::Showing(0));
        assert_eq!(flow.back(), Advance::Ignored);
    }

    #[test]
    fn empty_flow_is_already_complete() {
        let flow = GuidedFlow::new(vec![]);

        assert!(flow.is_completed());
        assert!(flow.transcript().is_empty());
    }
}
