//! Client-side bookkeeping for one chat session.
//!
//! A [`Conversation`] is owned by exactly one view. It hands out a
//! [`TurnRequest`] whenever a request should be sent and expects the streamed
//! outcome back through [`Conversation::apply`], one [`TurnEvent`] at a time.
//! [`stream_turn`] is the async driver that produces those events from a
//! [`ChatTransport`].

use futures::StreamExt;

use crate::{ChatTransport, Message, Role, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingFirstReply,
    AwaitingReply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RateLimited,
    Other,
}

impl From<&TransportError> for FailureKind {
    fn from(err: &TransportError) -> Self {
        if err.is_rate_limited() {
            Self::RateLimited
        } else {
            Self::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Chunk(String),
    Finished,
    Failed(FailureKind),
}

/// A request the owner must send, tagged with the turn it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub turn: u64,
    pub messages: Vec<Message>,
}

/// Texts shown in place of a reply that could not be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallbacks {
    pub greeting: String,
    pub greeting_rate_limited: String,
    pub reply: String,
    pub reply_rate_limited: String,
}

impl Default for Fallbacks {
    fn default() -> Self {
        Self {
            greeting: "こんにちは。対話を始めましょう。今、あなたが一番気になっていることは何ですか？"
                .to_owned(),
            greeting_rate_limited: "現在APIの利用制限に達しています。しばらくお待ちいただくか、APIキーの設定をご確認ください。"
                .to_owned(),
            reply: "申し訳ございません。エラーが発生しました。もう一度お試しください。".to_owned(),
            reply_rate_limited:
                "APIの利用制限に達しています。しばらくお待ちいただいてから再度お試しください。"
                    .to_owned(),
        }
    }
}

#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    input: String,
    phase: Phase,
    greeting_prompt: String,
    bootstrapped: bool,
    turn: u64,
    placeholder: Option<usize>,
    last_failure: Option<FailureKind>,
    fallbacks: Fallbacks,
}

impl Conversation {
    pub fn new(greeting_prompt: impl Into<String>) -> Self {
        Self::with_fallbacks(greeting_prompt, Fallbacks::default())
    }

    pub fn with_fallbacks(greeting_prompt: impl Into<String>, fallbacks: Fallbacks) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            phase: Phase::Idle,
            greeting_prompt: greeting_prompt.into(),
            bootstrapped: false,
            turn: 0,
            placeholder: None,
            last_failure: None,
            fallbacks,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Appends finalized dictation after whatever was already typed.
    pub fn append_input(&mut self, text: &str) {
        self.input.push_str(text);
    }

    /// Role of the message currently receiving chunks, if any.
    pub fn pending_role(&self) -> Option<Role> {
        self.placeholder.map(|index| self.messages[index].role)
    }

    /// Index of the message currently receiving chunks. An empty message
    /// anywhere else is a finished, empty reply.
    pub fn pending_index(&self) -> Option<usize> {
        self.placeholder
    }

    pub fn can_submit(&self) -> bool {
        !self.is_busy() && !self.input.trim().is_empty()
    }

    /// The failure that produced the most recent fallback text, if the last
    /// turn failed.
    pub fn last_failure(&self) -> Option<FailureKind> {
        self.last_failure
    }

    /// Requests the greeting reply. Yields a request only the first time it is
    /// called; the greeting prompt itself never enters the visible history.
    pub fn bootstrap(&mut self) -> Option<TurnRequest> {
        if self.bootstrapped || self.is_busy() {
            return None;
        }
        self.bootstrapped = true;

        let request = self.begin_turn(vec![Message::user(self.greeting_prompt.clone())]);
        self.phase = Phase::AwaitingFirstReply;
        Some(request)
    }

    /// Commits the current input as a user message. Blank input and submits
    /// while a reply is pending are ignored.
    pub fn submit(&mut self) -> Option<TurnRequest> {
        if !self.can_submit() {
            return None;
        }

        let text = self.input.trim().to_owned();
        self.input.clear();
        self.messages.push(Message::user(text));

        let request = self.begin_turn(self.messages.clone());
        self.phase = Phase::AwaitingReply;
        Some(request)
    }

    fn begin_turn(&mut self, messages: Vec<Message>) -> TurnRequest {
        self.turn += 1;
        self.last_failure = None;
        self.messages.push(Message::assistant(String::new()));
        self.placeholder = Some(self.messages.len() - 1);

        TurnRequest {
            turn: self.turn,
            messages,
        }
    }

    /// Applies one streamed outcome. Returns whether anything visible changed;
    /// events for any turn other than the pending one are dropped.
    pub fn apply(&mut self, turn: u64, event: TurnEvent) -> bool {
        if turn != self.turn {
            return false;
        }
        let Some(index) = self.placeholder else {
            return false;
        };

        match event {
            TurnEvent::Chunk(chunk) => {
                if chunk.is_empty() {
                    return false;
                }
                self.messages[index].content.push_str(&chunk);
            }
            TurnEvent::Finished => {
                self.placeholder = None;
                self.phase = Phase::Idle;
            }
            TurnEvent::Failed(kind) => {
                let fallback = match (self.phase, kind) {
                    (Phase::AwaitingFirstReply, FailureKind::RateLimited) => {
                        &self.fallbacks.greeting_rate_limited
                    }
                    (Phase::AwaitingFirstReply, FailureKind::Other) => &self.fallbacks.greeting,
                    (_, FailureKind::RateLimited) => &self.fallbacks.reply_rate_limited,
                    (_, FailureKind::Other) => &self.fallbacks.reply,
                };
                self.messages[index].content = fallback.clone();
                self.placeholder = None;
                self.last_failure = Some(kind);
                self.phase = Phase::Idle;
            }
        }

        true
    }
}

/// Sends `request` through `transport` and reports the outcome through
/// `emit`: zero or more non-empty chunks in arrival order, then exactly one
/// terminal event.
pub async fn stream_turn<T, F>(transport: &T, request: &TurnRequest, mut emit: F)
where
    T: ChatTransport + ?Sized,
    F: FnMut(TurnEvent),
{
    let mut stream = match transport.send(&request.messages).await {
        Ok(stream) => stream,
        Err(err) => {
            report(&err);
            emit(TurnEvent::Failed(FailureKind::from(&err)));
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) if chunk.is_empty() => {}
            Ok(chunk) => emit(TurnEvent::Chunk(chunk)),
            Err(err) => {
                report(&err);
                emit(TurnEvent::Failed(FailureKind::from(&err)));
                return;
            }
        }
    }

    emit(TurnEvent::Finished);
}

fn report(err: &TransportError) {
    if err.is_rate_limited() {
        log::warn!("chat relay rate limited, showing fallback text");
    } else {
        log::error!("chat turn failed: {err}");
    }
}
