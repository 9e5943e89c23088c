use std::io::{self, BufRead, Write as _};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use felichat::api::client::HttpBackend;
use felichat::core::config::Config;
use felichat::core::session::{run_turn, SessionState, TurnOutcome};
use felichat::ui::plain::render_blocks;
use felichat::ui::transcript::project;
use felichat::utils::logging::TranscriptLog;

#[derive(Parser)]
#[command(name = "felichat")]
#[command(about = "A terminal chat client for a thread-based conversational API")]
#[command(
    long_about = "Felichat is a line-oriented terminal chat client. Each submitted line is sent \
to the backend's messages endpoint; the reply is rendered from markdown and \
printed. Thread identity is established by the first successful exchange and \
carried on every request for the rest of the session.\n\n\
Endpoint resolution:\n\
  --endpoint flag, then the FELICHAT_BASE_URL environment variable, then the \
config file, then http://localhost:8000.\n\n\
Controls:\n\
  Type a message and press Enter to send it.\n\
  Ctrl+D quits."
)]
struct Args {
    /// Backend base URL
    #[arg(short = 'e', long, value_name = "URL")]
    endpoint: Option<String>,

    /// Append the conversation transcript to this markdown file
    #[arg(short = 'l', long, value_name = "FILE")]
    log: Option<String>,

    /// Display name used for your turns in the transcript log
    #[arg(short = 'n', long, value_name = "NAME")]
    name: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let base_url = config.resolve_base_url(args.endpoint.as_deref());
    let display_name = args
        .name
        .or_else(|| config.user_display_name.clone())
        .unwrap_or_else(|| "You".to_string());

    let log = TranscriptLog::new(args.log.or_else(|| config.log_file.clone()))?;
    log.log_session_start()?;

    let backend = HttpBackend::new(&base_url);
    let mut state = SessionState::new();

    println!("Connected to {}", backend.messages_url());
    println!("Type a message and press Enter; Ctrl+D quits.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let text = line.trim_end_matches(['\r', '\n']);

        println!("(waiting for a reply...)");
        match run_turn(&mut state, &backend, text).await {
            Ok(TurnOutcome::Completed) => {
                log.log_user_message(&display_name, text)?;
                let view = project(&state);
                if let Some(turn) = view.turns.last() {
                    println!("{}\n", render_blocks(&turn.content));
                }
                if let Some(reply) = state.transcript().last() {
                    log.log_assistant_message(&reply.content)?;
                }
            }
            Ok(TurnOutcome::Rejected) => {
                println!("(still waiting on the previous reply)");
            }
            Err(err) => {
                log.log_user_message(&display_name, text)?;
                eprintln!("{err}");
                eprintln!("The assistant turn did not complete; your message was kept. Try again.");
            }
        }
    }

    Ok(())
}
