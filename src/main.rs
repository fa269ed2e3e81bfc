//! Persona Survey Simulator
//!
//! `serve` runs the WebSocket server, `run` executes a survey locally and
//! saves the results, `ask` submits a survey to a running server.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use persona_survey::agent::truncate;
use persona_survey::client::{ClientOutcome, SurveyClient};
use persona_survey::events::SubmitSurvey;
use persona_survey::orchestrator::{BatchSummary, JsonFileStore, Orchestrator, ResultStore, SessionHandler};
use persona_survey::server::{run_server, AppState};
use persona_survey::SurveyConfig;

#[derive(Parser)]
#[command(name = "persona_survey", version, about = "Simulate survey responses from synthetic personas")]
struct Cli {
    /// JSON Lines persona file (overrides SURVEY_PERSONA_FILE)
    #[arg(long, global = true)]
    personas_file: Option<PathBuf>,

    /// Where results are written (overrides SURVEY_RESULTS_PATH)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the WebSocket server
    Serve {
        /// Listen address (overrides SURVEY_BIND_ADDR)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run a survey locally and save the results
    Run {
        /// Survey question; repeat for several questions
        #[arg(short, long = "question", required = true)]
        questions: Vec<String>,
        #[arg(short = 'n', long, default_value_t = 2)]
        personas: usize,
    },
    /// Submit a survey to a running server and print the answers
    Ask {
        #[arg(short, long)]
        question: String,
        #[arg(short = 'n', long, default_value_t = 5)]
        personas: usize,
        #[arg(long, default_value = "ws://localhost:8000/ws")]
        url: String,
        /// Seconds to wait for the result
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let mut config = SurveyConfig::from_env()?;
    if let Some(path) = cli.personas_file {
        config.persona_file = Some(path);
    }
    if let Some(path) = cli.output {
        config.results_path = path;
    }

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind;
            }
            let addr = config.bind_addr.clone();
            run_server(AppState::new(session_handler(&config)), &addr).await
        }
        Command::Run { questions, personas } => run_batch(&config, &questions, personas).await,
        Command::Ask { question, personas, url, timeout } => ask(&url, question, personas, timeout).await,
    }
}

fn orchestrator(config: &SurveyConfig) -> Arc<Orchestrator> {
    if config.openai_api_key.is_none() && config.provider == persona_survey::config::ProviderKind::OpenAI {
        warn!("OPENAI_API_KEY is not set; completion calls will likely be rejected");
    }
    Arc::new(
        Orchestrator::new(config.build_provider(), config.build_persona_source(), config.model.clone())
            .with_max_concurrency(config.max_concurrency),
    )
}

fn session_handler(config: &SurveyConfig) -> SessionHandler {
    SessionHandler::new(orchestrator(config), Arc::new(JsonFileStore::new(config.results_path.clone())))
        .with_payload_options(config.payload)
        .with_default_personas(config.default_personas)
}

async fn run_batch(config: &SurveyConfig, questions: &[String], personas: usize) -> Result<()> {
    info!("Running persona simulations...");
    let batch = orchestrator(config).run(questions, personas).await?;

    let store = JsonFileStore::new(config.results_path.clone());
    if let Err(e) = store.save(&batch).await {
        warn!("Error saving results: {}", e);
    }

    println!("\n{}", BatchSummary::from_batch(&batch));
    println!("Complete results have been saved to '{}'", store.path().display());
    Ok(())
}

async fn ask(url: &str, question: String, personas: usize, timeout: u64) -> Result<()> {
    let client = SurveyClient::new(url).with_timeout(Duration::from_secs(timeout));

    match client.run_survey(SubmitSurvey::new(question, personas)).await? {
        ClientOutcome::Completed(responses) => {
            println!("\nResults received! Got {} responses.", responses.len());
            println!("\nSample responses:");
            for response in responses.iter().take(2) {
                println!("\nPersona: {}", response.persona);
                println!("Response: {}", truncate(&response.response, 150));
            }
        }
        ClientOutcome::Failed(message) => println!("\nError: {}", message),
        ClientOutcome::TimedOut => println!("\nTimeout waiting for results!"),
    }
    Ok(())
}
