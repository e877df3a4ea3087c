use std::cell::Cell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions};
use gloo_timers::callback::Timeout;
use shared::guided::{Advance, GuidedFlow, KeyCommand, StepInput};
use shared::Role;
use wasm_bindgen::JsCast;
use web_sys::{HtmlInputElement, KeyboardEvent};
use yew::html::Scope;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct GuidedProps {
    pub title: &'static str,
    pub build: fn() -> GuidedFlow,
}

pub enum Msg {
    Tap,
    Select(String),
    Draft(String),
    SubmitText,
    Back,
    Key(KeyCommand),
    Reveal,
    Restart,
}

pub struct GuidedView {
    flow: GuidedFlow,
    draft: String,
    /// Pending reveal. Dropping it cancels the callback.
    timer: Option<Timeout>,
    /// Whether the shown step is a tap step; read by the key listener.
    on_tap_step: Rc<Cell<bool>>,
    _keys: Option<EventListener>,
}

/// Space/Enter and ArrowLeft/Backspace anywhere on the page, while a tap
/// step is shown.
fn listen_for_keys(link: Scope<GuidedView>, on_tap_step: Rc<Cell<bool>>) -> Option<EventListener> {
    let window = web_sys::window()?;
    let options = EventListenerOptions::enable_prevent_default();

    Some(EventListener::new_with_options(&window, "keydown", options, move |event| {
        if !on_tap_step.get() {
            return;
        }
        let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        if let Some(command) = KeyCommand::from_code(&event.code()) {
            event.prevent_default();
            link.send_message(Msg::Key(command));
        }
    }))
}

impl GuidedView {
    fn advance(&mut self, ctx: &Context<Self>, advance: Advance) -> bool {
        match advance {
            Advance::Ignored => false,
            Advance::Transitioning(delay) => {
                let link = ctx.link().clone();
                self.timer = Some(Timeout::new(delay.as_millis() as u32, move || {
                    link.send_message(Msg::Reveal)
                }));
                true
            }
            Advance::Completed(answers) => {
                log::info!("{} completed with {} answers", ctx.props().title, answers.len());
                true
            }
        }
    }

    fn input_view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();
        let Some(step) = self.flow.current_step() else {
            return html! {};
        };

        match &step.input {
            StepInput::Tap => html! {
                <button class="tap" onclick={link.callback(|_| Msg::Tap)}>{ "タップして進む" }</button>
            },
            StepInput::Select(options) => {
                let buttons = options.iter().cloned().map(|option| {
                    let label = option.clone();
                    html! {
                        <button onclick={link.callback(move |_| Msg::Select(option.clone()))}>
                            { label }
                        </button>
                    }
                });
                html! { <div class="options">{ for buttons }</div> }
            }
            StepInput::Text { placeholder } => {
                let oninput = link.callback(|e: InputEvent| {
                    let input: HtmlInputElement = e.target_unchecked_into();
                    Msg::Draft(input.value())
                });
                let onkeydown = link.batch_callback(|e: KeyboardEvent| {
                    (e.key() == "Enter" && !e.is_composing()).then_some(Msg::SubmitText)
                });

                html! {
                    <div class="composer">
                        <input
                            value={self.draft.clone()}
                            placeholder={placeholder.clone().unwrap_or_default()}
                            {oninput}
                            {onkeydown}
                        />
                        <button
                            disabled={self.draft.trim().is_empty()}
                            onclick={link.callback(|_| Msg::SubmitText)}
                        >
                            { "送信" }
                        </button>
                    </div>
                }
            }
        }
    }
}

impl Component for GuidedView {
    type Message = Msg;
    type Properties = GuidedProps;

    fn create(ctx: &Context<Self>) -> Self {
        let on_tap_step = Rc::new(Cell::new(false));

        Self {
            flow: (ctx.props().build)(),
            draft: String::new(),
            timer: None,
            _keys: listen_for_keys(ctx.link().clone(), on_tap_step.clone()),
            on_tap_step,
        }
    }

    fn rendered(&mut self, _ctx: &Context<Self>, _first_render: bool) {
        let tap = matches!(
            self.flow.current_step().map(|step| &step.input),
            Some(StepInput::Tap)
        );
        self.on_tap_step.set(tap);
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            Msg::Tap => {
                let advance = self.flow.tap();
                self.advance(ctx, advance)
            }
            Msg::Select(option) => {
                let advance = self.flow.select(&option);
                self.advance(ctx, advance)
            }
            Msg::Draft(text) => {
                self.draft = text;
                true
            }
            Msg::SubmitText => {
                let advance = self.flow.submit_text(&self.draft);
                if advance != Advance::Ignored {
                    self.draft.clear();
                }
                self.advance(ctx, advance)
            }
            Msg::Back => {
                let advance = self.flow.back();
                self.advance(ctx, advance)
            }
            Msg::Key(command) => {
                let advance = self.flow.key(command);
                self.advance(ctx, advance)
            }
            Msg::Reveal => {
                self.timer = None;
                self.flow.reveal()
            }
            Msg::Restart => {
                self.timer = None;
                self.draft.clear();
                self.flow.restart();
                true
            }
        }
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.timer = None;
        self._keys = None;
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let link = ctx.link();

        let transcript = self.flow.transcript().iter().map(|message| {
            let class = match message.role {
                Role::User => "bubble user",
                Role::Assistant => "bubble assistant",
            };
            html! { <div {class}>{ message.content.clone() }</div> }
        });

        html! {
            <div class="guided">
                <header>
                    <a href="/">{ "←" }</a>{ " " }{ ctx.props().title }
                    <span class="progress">
                        { format!("{} / {}", self.flow.position() + 1, self.flow.len()) }
                    </span>
                </header>
                <div class="messages">
                    { for transcript }
                    if self.timer.is_some() {
                        <div class="bubble assistant typing">{ "…" }</div>
                    }
                </div>
                if self.flow.is_completed() {
                    <button onclick={link.callback(|_| Msg::Restart)}>{ "もう一度はじめる" }</button>
                } else {
                    { self.input_view(ctx) }
                    if self.flow.position() > 0 && self.timer.is_none() {
                        <button class="back" onclick={link.callback(|_| Msg::Back)}>{ "戻る" }</button>
                    }
                }
            </div>
        }
    }
}
