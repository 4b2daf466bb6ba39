use std::io::Write as _;
use std::sync::Arc;

use coach_assist::config::CoachConfig;
use coach_assist::domain::StartMode;
use coach_assist::graph::{Engine, Graph, InMemoryCheckpointer, TurnInput};
use coach_assist::llm::{create_provider, LlmBackend, LlmConfig};
use coach_assist::nodes::NodeContext;
use coach_assist::retrieval::HttpRetriever;
use coach_assist::search::TavilyClient;
use coach_assist::store::CsvPlanStore;
use coach_assist::telemetry::HttpTelemetryClient;

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Read API key from environment
    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_else(|_| {
        eprintln!("Error: ANTHROPIC_API_KEY not set");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let config = CoachConfig::from_env()?;

    let llm_small = create_provider(&LlmConfig {
        backend: LlmBackend::Anthropic,
        api_key: secrecy::SecretString::from(api_key.clone()),
        model: config.model_small.clone(),
    })?;
    let llm_coach = create_provider(&LlmConfig {
        backend: LlmBackend::Anthropic,
        api_key: secrecy::SecretString::from(api_key),
        model: config.model_coach.clone(),
    })?;

    let tavily_key = std::env::var("TAVILY_API_KEY").unwrap_or_default();
    let telemetry_url = std::env::var("COACH_TELEMETRY_URL")
        .unwrap_or_else(|_| "http://localhost:8765".to_string());
    let retriever_url = std::env::var("COACH_RETRIEVER_URL")
        .unwrap_or_else(|_| "http://localhost:8766".to_string());

    let garmin_consent = env_flag("COACH_GARMIN_CONSENT");
    let search_consent = env_flag("COACH_SEARCH_CONSENT");

    eprintln!("🏃 Coach Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Models: {} / {}", config.model_small, config.model_coach);
    eprintln!("   Plan file: {}", config.save_path);
    eprintln!("   Garmin consent: {garmin_consent}, web search consent: {search_consent}");
    eprintln!("   Type a message and press Enter. /quit to exit.\n");

    let ctx = NodeContext {
        llm_small,
        llm_coach,
        telemetry: Arc::new(HttpTelemetryClient::new(telemetry_url)),
        search: Arc::new(TavilyClient::new(secrecy::SecretString::from(tavily_key))),
        retriever: Arc::new(HttpRetriever::new(retriever_url)),
        plan_store: Arc::new(CsvPlanStore::new(&config.save_path)),
        config,
    };

    let engine = Engine::new(Graph::standard()?, Arc::new(InMemoryCheckpointer::new()), ctx);
    let thread_id = uuid::Uuid::new_v4().to_string();

    let start_route = match std::env::var("COACH_START_ROUTE").as_deref() {
        Ok("make") => Some(StartMode::Make),
        Ok("discuss") => Some(StartMode::Discuss),
        _ => None,
    };

    // Kick-off turn: greet (or jump straight into the chosen flow).
    let opening = TurnInput {
        text: None,
        start_route,
        garmin_consent: Some(garmin_consent),
        search_consent: Some(search_consent),
    };
    run_and_print(&engine, &thread_id, opening).await;

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }
        run_and_print(&engine, &thread_id, TurnInput::say(line)).await;
    }

    Ok(())
}

async fn run_and_print(engine: &Engine, thread_id: &str, input: TurnInput) {
    match engine.run_turn(thread_id, input).await {
        Ok(output) => {
            for message in output.messages {
                println!("{message}\n");
            }
        }
        Err(e) => println!("⚠️ {e}\n"),
    }
}
