use std::rc::Rc;

use shared::flows::ChatFlow;
use shared::speech::SpeechCapture;
use shared::{stream_turn, Conversation, Role, TurnEvent, TurnRequest};
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlTextAreaElement, KeyboardEvent};
use yew::prelude::*;

use crate::speech::{SpeechEvent, WebSpeech};
use crate::transport::FetchTransport;

#[derive(Properties, PartialEq)]
pub struct ChatProps {
    pub flow: &'static ChatFlow,
}

pub enum Msg {
    Input(String),
    Submit,
    Turn(u64, TurnEvent),
    ToggleMic,
    Speech(SpeechEvent),
}

/// One streaming conversation with a persona, plus optional dictation.
pub struct ChatView {
    convo: Conversation,
    speech: SpeechCapture<WebSpeech>,
    transport: Rc<FetchTransport>,
}

impl ChatView {
    fn spawn_turn(&self, ctx: &Context<Self>, request: TurnRequest) {
        let transport = self.transport.clone();
        let link = ctx.link().clone();

        spawn_local(async move {
            let turn = request.turn;
            stream_turn(transport.as_ref(), &request, |event| {
                link.send_message(Msg::Turn(turn, event));
            })
            .await;
        });
    }

    fn submit(&mut self, ctx: &Context<Self>) -> bool {
        let Some(request) = self.convo.submit() else {
            return false;
        };
        self.speech.stop();
        self.spawn_turn(ctx, request);
        true
    }
}

impl Component for ChatView {
    type Message = Msg;
    type Properties = ChatProps;

    fn create(ctx: &Context<Self>) -> Self {
        let flow = ctx.props().flow;
        let provider = WebSpeech::probe(ctx.link().callback(Msg::Speech));

        let mut view = Self {
            convo: Conversation::new(flow.greeting),
            speech: SpeechCapture::new(provider),
            transport: Rc::new(FetchTransport::new(flow.endpoint())),
        };
        if let Some(request) = view.convo.bootstrap() {
            view.spawn_turn(ctx, request);
        }
        view
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Input(text) => {
                self.convo.set_input(text);
                true
            }
            Msg::Submit => self.submit(ctx),
            Msg::Turn(turn, event) => self.convo.apply(turn, event),
            Msg::ToggleMic => {
                if self.speech.is_stopping() || (self.convo.is_busy() && !self.speech.is_listening()) {
                    return false;
                }
                if let Err(err) = self.speech.toggle() {
                    log::warn!("could not toggle dictation: {err}");
                }
                true
            }
            Msg::Speech(SpeechEvent::Results(segments)) => {
                if let Some(text) = self.speech.on_results(&segments) {
                    self.convo.append_input(&text);
                }
                true
            }
            Msg::Speech(SpeechEvent::Error(code)) => {
                self.speech.on_error(&code);
                true
            }
            Msg::Speech(SpeechEvent::End) => {
                self.speech.on_end();
                true
            }
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.speech.release();
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let flow = ctx.props().flow;

        let oninput = link.callback(|e: InputEvent| {
            let textarea: HtmlTextAreaElement = e.target_unchecked_into();
            Msg::Input(textarea.value())
        });
        let onkeydown = link.batch_callback(|e: KeyboardEvent| {
            // Enter sends, Shift+Enter and IME composition insert a newline.
            if e.key() == "Enter" && !e.shift_key() && !e.is_composing() {
                e.prevent_default();
                Some(Msg::Submit)
            } else {
                None
            }
        });

        let pending = self.convo.pending_index();
        let messages = self.convo.messages().iter().enumerate().map(|(index, message)| {
            let class = match message.role {
                Role::User => "bubble user",
                Role::Assistant => "bubble assistant",
            };
            if message.content.is_empty() && pending == Some(index) {
                html! { <div class="bubble assistant typing">{ "…" }</div> }
            } else {
                html! { <div {class}>{ message.content.clone() }</div> }
            }
        });

        html! {
            <div class="chat">
                <header><a href="/">{ "←" }</a>{ " " }{ flow.name }</header>
                <div class="messages">{ for messages }</div>
                if !self.speech.interim().is_empty() {
                    <p class="interim">{ self.speech.interim() }</p>
                }
                <div class="composer">
                    <textarea
                        rows=2
                        value={self.convo.input().to_owned()}
                        disabled={self.convo.is_busy()}
                        {oninput}
                        {onkeydown}
                    />
                    if self.speech.is_supported() {
                        <button
                            class={classes!("mic", self.speech.is_listening().then_some("listening"))}
                            disabled={self.speech.is_stopping() || (self.convo.is_busy() && !self.speech.is_listening())}
                            onclick={link.callback(|_| Msg::ToggleMic)}
                        >
                            { if self.speech.is_listening() { "■" } else { "🎤" } }
                        </button>
                    }
                    <button
                        disabled={!self.convo.can_submit()}
                        onclick={link.callback(|_| Msg::Submit)}
                    >
                        { "送信" }
                    </button>
                </div>
            </div>
        }
    }
}
