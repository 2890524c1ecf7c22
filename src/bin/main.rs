use ledger_agent::{
    analytics::TradeAnalytics, config::AgentConfig, conversational::ChatSession,
    llm::OpenAiCompatibleClient,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: ledger-agent <trades.csv>");
            std::process::exit(2);
        }
    };

    let config = AgentConfig::from_env()?;
    info!(base_url = %config.base_url, model = %config.model, "Trade ledger agent starting");

    let analytics = Arc::new(TradeAnalytics::from_path(&path)?);
    println!("{}", analytics.pnl_table().to_markdown());

    let client = OpenAiCompatibleClient::new(config)?;
    let mut session = ChatSession::new(analytics, Box::new(client));

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") {
            break;
        }

        match session.ask(question).await {
            Ok(answer) => println!("{}", answer),
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    info!(
        turns = session.transcript().len() / 2,
        "Session finished"
    );
    Ok(())
}
