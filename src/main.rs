use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bgshops::config::load_app_config;
use bgshops::{RunOptions, RunRequest, Runner};
use chrono::Local;
use clap::Parser;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "bgshops")]
#[command(about = "Scrape a board game shop and publish its deals")]
struct Cli {
    /// Shop URL or name, e.g. https://www.board-game.co.uk
    shop: String,

    /// Two URL groups, two pages per group, two items per page; always headless
    #[arg(short = 't', long)]
    test_mode: bool,

    /// Keep the results local, skip the spreadsheet upload
    #[arg(short = 'p', long)]
    private: bool,

    /// Run date as YYYYMMDD instead of today
    #[arg(short = 'd', long)]
    date_override: Option<String>,

    /// Show the browser window (browser builds only)
    #[arg(long)]
    headed: bool,

    /// Keep running and repeat on a cron schedule, e.g. "0 0 6 * * *"
    #[arg(long)]
    schedule: Option<String>,
}

impl Cli {
    fn request(&self) -> RunRequest {
        let date = self
            .date_override
            .clone()
            .unwrap_or_else(|| Local::now().format("%Y%m%d").to_string());

        let options = if self.test_mode {
            RunOptions::test_mode(date)
        } else {
            RunOptions {
                headless: !self.headed,
                ..RunOptions::new(date)
            }
        };

        RunRequest {
            shop: self.shop.clone(),
            options,
            publish: !self.private,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    // fail on an unknown shop before anything is fetched
    bgshops::scrapers::resolve(&cli.shop)?;
    let runner = Runner::new(config)?;

    let Some(schedule) = cli.schedule.clone() else {
        runner.run(&cli.request()).await?;
        return Ok(());
    };

    let shop = cli.shop.clone();
    let sched = JobScheduler::new().await?;
    let cli = Arc::new(cli);
    sched
        .add(Job::new_async(schedule.as_str(), move |_uuid, _l| {
            let runner = runner.clone();
            let cli = Arc::clone(&cli);
            Box::pin(async move {
                if let Err(e) = runner.run(&cli.request()).await {
                    error!("Scheduled run of {} failed: {}", cli.shop, e);
                }
            })
        })?)
        .await?;

    info!("Scheduler started ({}) for {}", schedule, shop);
    sched.start().await?;

    loop {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
}
