use shared::flows;
use shared::guided::GuidedFlow;
use yew::prelude::*;

mod chat;
mod guided;
mod speech;
mod steps;
mod transport;

use chat::ChatView;
use guided::GuidedView;

#[function_component]
fn Landing() -> Html {
    let links = flows::CHAT_FLOWS.iter().map(|flow| {
        html! { <li><a href={format!("/{}", flow.slug)}>{ flow.name }</a></li> }
    });

    html! {
        <main class="landing">
            <ul>
                <li><a href="/introduction">{ "はじまりのストーリー" }</a></li>
                { for links }
                <li><a href="/letting-go">{ "手放しシフトワーク" }</a></li>
            </ul>
        </main>
    }
}

#[function_component]
fn App() -> Html {
    let path = web_sys::window()
        .and_then(|window| window.location().pathname().ok())
        .unwrap_or_default();
    let slug = path.trim_matches('/');

    if let Some(flow) = flows::by_slug(slug) {
        return html! { <ChatView {flow} /> };
    }

    match slug {
        "introduction" => html! { <GuidedView title="はじまりのストーリー" build={steps::introduction as fn() -> GuidedFlow} /> },
        "letting-go" => html! { <GuidedView title="手放しシフトワーク" build={steps::letting_go as fn() -> GuidedFlow} /> },
        _ => html! { <Landing /> },
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
