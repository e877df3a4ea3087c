use std::io::Write;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use miette::{miette, IntoDiagnostic, Result};
use navi::client::HttpTransport;
use navi::relay::{self, IncomingMessage};
use navi::{personas, Config, Persona};
use shared::{stream_turn, ChatTransport, Conversation, TurnRequest};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal client for the guided reflection chats")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat with a flow through a running relay server
    Chat(ChatArgs),
    /// Send one message straight to the upstream model and print the reply
    Ask(AskArgs),
    /// List the available flows
    Personas,
}

#[derive(Args, Debug)]
struct ChatArgs {
    #[arg(long, default_value = "vision-navi")]
    flow: String,
    #[arg(long, env = "NAVI_SERVER", default_value = "http://localhost:3000")]
    server: String,
}

#[derive(Args, Debug)]
struct AskArgs {
    #[arg(long, default_value = "vision-navi")]
    flow: String,
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    navi::init_tracing("warn");

    match Cli::parse().command {
        Command::Chat(args) => chat(args).await,
        Command::Ask(args) => ask(args).await,
        Command::Personas => {
            for persona in personas::PERSONAS {
                println!("{}\t{}", persona.slug(), persona.flow.name);
            }
            Ok(())
        }
    }
}

fn find_persona(slug: &str) -> Result<&'static Persona> {
    personas::by_slug(slug).ok_or_else(|| miette!("Unknown flow `{slug}`"))
}

async fn chat(args: ChatArgs) -> Result<()> {
    let persona = find_persona(&args.flow)?;
    let url = format!(
        "{}{}",
        args.server.trim_end_matches('/'),
        persona.flow.endpoint()
    );
    let transport = HttpTransport::new(url)?;
    let mut convo = Conversation::new(persona.flow.greeting);

    println!("== {} ==", persona.flow.name);
    if let Some(request) = convo.bootstrap() {
        print_turn(&transport, &mut convo, request).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().into_diagnostic()?;

        let Some(line) = lines.next_line().await.into_diagnostic()? else {
            break;
        };

        convo.set_input(line);
        let Some(request) = convo.submit() else {
            continue;
        };
        print_turn(&transport, &mut convo, request).await;
    }

    Ok(())
}

/// Streams one reply to stdout as it grows.
async fn print_turn(transport: &dyn ChatTransport, convo: &mut Conversation, request: TurnRequest) {
    let mut printed = String::new();

    stream_turn(transport, &request, |event| {
        if !convo.apply(request.turn, event) {
            return;
        }
        let Some(reply) = convo.messages().last() else {
            return;
        };

        match reply.content.strip_prefix(printed.as_str()) {
            Some(rest) => print!("{rest}"),
            // Replaced by a fallback text rather than extended.
            None => print!("\n{}", reply.content),
        }
        let _ = std::io::stdout().flush();
        printed = reply.content.clone();
    })
    .await;

    println!();
}

async fn ask(args: AskArgs) -> Result<()> {
    let persona = find_persona(&args.flow)?;
    let client = Config::from_env()?.client()?;

    let chat = relay::prepare(vec![IncomingMessage {
        role: Some("user".to_owned()),
        content: args.message,
    }])?;

    let mut replies = relay::open_stream(&client, persona, chat).await?;
    while let Some(text) = replies.next().await {
        print!("{}", text?);
        std::io::stdout().flush().into_diagnostic()?;
    }
    println!();

    Ok(())
}
