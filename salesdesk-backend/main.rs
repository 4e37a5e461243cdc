mod api;
mod chat;
mod config;
mod metrics;
mod report;
mod session;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::Request;
use chrono::{Local, NaiveDate};
use clap::Parser;
use dotenvy::dotenv;
use sentry::integrations::tower::{NewSentryLayer, SentryHttpLayer};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::chat::client::{ChatClient, OpenAiChatClient};
use crate::metrics::MetricsDisplay;
use crate::report::interpreter::StatusCategory;
use crate::report::webhook::{HttpWebhookClient, WebhookClient};
use crate::report::{DealStatus, PeriodPreset, ReportRequest};
use crate::session::Session;

#[derive(Parser)]
#[command(name = "salesdesk", about = "Sales report trigger and report assistant")]
enum Cli {
    /// Start the HTTP server (default when no subcommand is given)
    #[command(alias = "run")]
    Serve,
    /// Generate one report from the command line and print the preview
    Report {
        #[arg(long, value_enum, default_value = "last-7-days")]
        period: PeriodPreset,
        /// Start date for a custom period (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date for a custom period (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long, default_value_t = 0.0)]
        min_deal_value: f64,
        /// Repeat for several statuses; defaults to won + closed
        #[arg(long = "status", value_enum)]
        statuses: Vec<DealStatus>,
        /// Target channel; defaults to DEFAULT_CHANNEL
        #[arg(long)]
        channel: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    // Parse CLI args: default to Serve when no subcommand is given,
    // but still allow --help and --version to work.
    let args: Vec<String> = std::env::args().collect();
    let cli = if args.len() <= 1 {
        Cli::Serve
    } else {
        Cli::parse()
    };

    let config = config::Config::from_env();

    match cli {
        Cli::Serve => run_server(config).await,
        Cli::Report {
            period,
            start,
            end,
            min_deal_value,
            statuses,
            channel,
        } => {
            let (start, end) = period.resolve(start, end, Local::now().date_naive());
            let statuses = if statuses.is_empty() {
                report::default_deal_statuses()
            } else {
                statuses
            };
            let channel = channel
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| config.default_channel.clone());
            let request = ReportRequest::new(start, end, min_deal_value, statuses, channel)?;
            run_report(config, request).await?;
            Ok(())
        }
    }
}

fn build_http_client() -> Result<Arc<reqwest::Client>> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .context("failed to build HTTP client")?;
    Ok(Arc::new(client))
}

async fn run_server(config: config::Config) -> Result<(), Box<dyn Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("salesdesk=info,tower_http=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true).with_bracketed_fields(false))
        .with(sentry::integrations::tracing::layer().event_filter(
            |metadata| match *metadata.level() {
                tracing::Level::ERROR => sentry::integrations::tracing::EventFilter::Event,
                tracing::Level::WARN | tracing::Level::INFO => {
                    sentry::integrations::tracing::EventFilter::Breadcrumb
                }
                _ => sentry::integrations::tracing::EventFilter::Ignore,
            },
        ))
        .init();

    let _guard = sentry::init((
        config.sentry_dsn.clone().unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some(config.environment.clone().into()),
            // Chat requests carry the user's API key.
            send_default_pii: false,
            traces_sample_rate: 0.2,
            enable_logs: true,
            ..Default::default()
        },
    ));

    let http_client = build_http_client()?;

    let webhook_client: Arc<dyn WebhookClient> = Arc::new(HttpWebhookClient::new(
        http_client.clone(),
        config.webhook_url.clone(),
        config.webhook_timeout,
    ));
    let chat_client: Arc<dyn ChatClient> = Arc::new(OpenAiChatClient::new(
        http_client.clone(),
        config.chat_api_base.clone(),
        config.chat_model.clone(),
        config.chat_timeout,
    ));

    tracing::info!(
        webhook = %config.webhook_url,
        chat_model = %config.chat_model,
        "starting salesdesk"
    );

    let port = config.port;
    let app_state = api::AppState::new(Arc::new(config), webhook_client, chat_client);

    let app = api::create_app(app_state)
        .layer(SentryHttpLayer::new().enable_transaction())
        .layer(NewSentryLayer::<Request<Body>>::new_from_top());

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("Listening on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_report(config: config::Config, request: ReportRequest) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("salesdesk=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let http_client = build_http_client()?;
    let webhook_client =
        HttpWebhookClient::new(http_client, config.webhook_url.clone(), config.webhook_timeout);

    println!("POST {}", webhook_client.endpoint());
    println!(
        "{}",
        serde_json::to_string_pretty(&request.payload()).context("failed to render payload")?
    );
    println!("Processing your request... this may take 15-30 seconds");

    let mut session = Session::new();
    let response = report::generate(&mut session, &webhook_client, &request).await;

    println!();
    match (&response.message_text, response.status_category) {
        (Some(text), _) => {
            println!("Message sent to {}:", response.channel_echo.as_deref().unwrap_or_default());
            println!("{text}");
            if let Some(ts) = &response.timestamp {
                println!("Timestamp: {ts}");
            }
            for insight in &response.insights {
                println!("  {}", insight.line);
            }
        }
        (None, StatusCategory::Success) => {
            println!("Report has been generated and sent.");
            if response.delivered {
                println!(
                    "Delivered to channel: {}",
                    response.channel_echo.as_deref().unwrap_or_default()
                );
            }
        }
        (None, category) => {
            println!("Report failed ({category:?}).");
            if let Some(err) = &response.error {
                println!("{err}");
            }
            if let Some(raw) = &response.raw_body {
                match raw {
                    serde_json::Value::String(text) => println!("{text}"),
                    other => println!(
                        "{}",
                        serde_json::to_string_pretty(other).context("failed to render body")?
                    ),
                }
            }
        }
    }
    println!();
    println!("{}", response.guidance());

    if let MetricsDisplay::Metrics { metrics, revenue_display, .. } = session.metrics_display() {
        println!();
        println!("Total deals closed: {}", metrics.deal_count_display());
        println!("Current revenue:    {revenue_display}");
        println!("Week-over-week:     {}", metrics.week_over_week);
    }

    if response.status_category != StatusCategory::Success {
        anyhow::bail!("report generation failed: {:?}", response.status_category);
    }
    Ok(())
}
