use apicall::app::App;
use apicall::config::Config;
use apicall::errors::PipelineError;
use apicall::models::ApiCall;
use apicall::services::insights::{extract_insights, InsightContext};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Read;

#[derive(Parser)]
#[command(name = "apicall", version, about = "Resolve natural-language requests into REST calls")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered API definitions
    Apis,
    /// Execute a call given as JSON
    Run {
        /// API name as declared in its definition file
        #[arg(long)]
        api: String,
        /// Path to the call JSON, or "-" for stdin
        #[arg(long)]
        call: String,
    },
    /// Let the model propose a call for MESSAGE and execute it
    Chat {
        #[arg(long)]
        api: String,
        message: String,
    },
    /// Rank the list content of a JSON document
    Insights {
        /// Free text used for domain inference
        #[arg(long, default_value = "")]
        context: String,
        #[arg(long, default_value = "")]
        api: String,
        /// Path to the JSON document, or "-" for stdin
        file: String,
    },
}

fn read_source(source: &str) -> Result<String, PipelineError> {
    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(source)?)
}

fn read_json(source: &str) -> Result<Value, PipelineError> {
    let raw = read_source(source)?;
    serde_json::from_str(&raw)
        .map_err(|err| PipelineError::validation(format!("Invalid JSON in {}: {}", source, err)))
}

async fn execute(command: Commands) -> Result<Value, PipelineError> {
    match command {
        Commands::Apis => {
            let app = App::initialize(Config::from_env())?;
            Ok(serde_json::to_value(app.pipeline.registry().all())?)
        }
        Commands::Run { api, call } => {
            let call: ApiCall = serde_json::from_value(read_json(&call)?)
                .map_err(|err| PipelineError::validation(format!("Invalid call: {}", err)))?;
            let app = App::initialize(Config::from_env())?;
            let outcome = app.pipeline.run(&api, call).await?;
            Ok(serde_json::to_value(outcome)?)
        }
        Commands::Chat { api, message } => {
            let app = App::initialize(Config::from_env())?;
            let outcome = app.pipeline.chat(&api, &message).await?;
            Ok(serde_json::to_value(outcome)?)
        }
        Commands::Insights { context, api, file } => {
            let payload = read_json(&file)?;
            let insight = extract_insights(&payload, &InsightContext::new(context, api));
            Ok(serde_json::to_value(insight)?)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match execute(cli.command).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => println!("{}", text),
            Err(err) => {
                eprintln!("apicall: {}", err);
                std::process::exit(1);
            }
        },
        Err(err) => {
            println!("{}", err.to_value());
            std::process::exit(1);
        }
    }
}
