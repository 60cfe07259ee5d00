//! Reel - latest-videos feed CLI.
//!
//! # Usage
//!
//! ```bash
//! # Prepare the database
//! reel migrate
//!
//! # Publish a video, then page through the feed
//! reel submit --name "Sunset timelapse"
//! reel latest --page-size 5
//! reel latest --page-size 5 --paging-state <state from previous page>
//!
//! # Try the feed without a database
//! reel --in-memory latest --all
//! ```

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use reel_core::metrics::init_metrics;
use reel_core::models::BucketId;
use reel_core::ports::LatestVideoStore;
use reel_core::services::{
    FeedConfig, LatestVideosPage, LatestVideosRequest, LatestVideosService, SubmitVideo,
};
use reel_storage::{Database, DatabaseConfig, InMemoryLatestVideoStore, PgLatestVideoStore};

/// Reel CLI - latest-videos feed.
#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(about = "Reel - page through the latest-videos feed")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/reel")]
    database_url: String,

    /// Use a process-local store preloaded with demo videos instead of PostgreSQL.
    #[arg(long, global = true)]
    in_memory: bool,

    /// Number of demo videos loaded in --in-memory mode.
    #[arg(long, global = true, default_value = "25")]
    demo_videos: usize,

    /// Number of days covered by the feed (overrides FEED_HORIZON_DAYS).
    #[arg(long, env = "FEED_HORIZON_DAYS", global = true)]
    horizon_days: Option<u32>,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS", global = true)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run database migrations and exit (other commands also migrate first).
    Migrate,

    /// Remove every video from the feed. Schema/migrations are preserved.
    Purge {
        /// Skip confirmation prompt.
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Publish a video in the feed.
    Submit {
        /// Display name.
        #[arg(long)]
        name: String,

        /// Uploader id (random when omitted).
        #[arg(long)]
        user_id: Option<Uuid>,

        /// Video id (random when omitted).
        #[arg(long)]
        video_id: Option<Uuid>,

        /// Thumbnail location.
        #[arg(long)]
        preview_image_location: Option<String>,

        /// RFC 3339 timestamp; defaults to now.
        #[arg(long)]
        added_date: Option<DateTime<Utc>>,
    },

    /// Print one page of the latest videos.
    Latest {
        /// Page size (0 uses the configured default).
        #[arg(long, default_value = "0")]
        page_size: i32,

        /// Paging state printed by the previous page.
        #[arg(long)]
        paging_state: Option<String>,

        /// Newest day of the feed as yyyyMMdd (defaults to the day the
        /// paging state was issued, or today, UTC).
        #[arg(long, value_parser = parse_anchor)]
        anchor: Option<NaiveDate>,

        /// Start at the video added at this RFC 3339 timestamp.
        #[arg(long, requires = "starting_video_id", conflicts_with = "paging_state")]
        starting_added_date: Option<DateTime<Utc>>,

        /// Id of the video to start at.
        #[arg(long, requires = "starting_added_date")]
        starting_video_id: Option<Uuid>,

        /// Keep following paging states until the feed is exhausted.
        #[arg(long)]
        all: bool,
    },

    /// Publish demo videos spread over the feed horizon.
    Seed {
        /// Number of videos to publish.
        #[arg(long, default_value = "25")]
        count: usize,
    },
}

/// Parse a `yyyyMMdd` day.
fn parse_anchor(s: &str) -> Result<NaiveDate, String> {
    BucketId::parse(s)
        .map(|bucket| bucket.date())
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);
    init_metrics();

    let mut feed_config = FeedConfig::from_env();
    if let Some(days) = cli.horizon_days {
        feed_config = feed_config.with_horizon_days(days);
    }
    debug!(
        horizon_days = feed_config.horizon_days,
        default_page_size = feed_config.default_page_size,
        max_page_size = feed_config.max_page_size,
        "Feed configuration"
    );

    if cli.in_memory {
        return run_in_memory(cli, feed_config).await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    let db = Database::connect(&DatabaseConfig::for_cli(&cli.database_url))
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    let outcome = match cli.command {
        Command::Migrate => {
            info!("🛑 migrate command, exiting");
            Ok(())
        }
        Command::Purge { yes } => handle_purge(&db, yes).await,
        command => {
            let store = Arc::new(PgLatestVideoStore::new(&db));
            let service = LatestVideosService::new(feed_config, store);
            run_feed_command(&service, command).await
        }
    };

    db.close().await;
    outcome
}

/// Run a command against a fresh in-memory store loaded with demo videos.
async fn run_in_memory(cli: Cli, feed_config: FeedConfig) -> Result<()> {
    let store = Arc::new(InMemoryLatestVideoStore::new());
    let service = LatestVideosService::new(feed_config, Arc::clone(&store));

    seed_demo(&service, cli.demo_videos).await?;
    info!(videos = store.len().await, "🧪 In-memory feed ready");

    match cli.command {
        Command::Migrate => {
            info!("🛑 Nothing to migrate in --in-memory mode");
            Ok(())
        }
        Command::Purge { .. } => {
            let removed = store.purge().await;
            info!("🗑️  Removed {} in-memory video(s)", removed);
            Ok(())
        }
        command => run_feed_command(&service, command).await,
    }
}

/// Commands that only need the feed service.
async fn run_feed_command<S: LatestVideoStore>(
    service: &LatestVideosService<S>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Submit {
            name,
            user_id,
            video_id,
            preview_image_location,
            added_date,
        } => {
            let latest = service
                .submit_video(SubmitVideo {
                    video_id: video_id.unwrap_or_else(Uuid::new_v4),
                    user_id: user_id.unwrap_or_else(Uuid::new_v4),
                    name,
                    preview_image_location,
                    added_date,
                })
                .await
                .context("Failed to submit video")?;

            println!("{}", latest.preview.video_id);
            Ok(())
        }

        Command::Latest {
            page_size,
            paging_state,
            anchor,
            starting_added_date,
            starting_video_id,
            all,
        } => {
            let mut request = LatestVideosRequest {
                page_size,
                paging_state,
                anchor,
                starting_added_date,
                starting_video_id,
            };

            let mut pages = 0usize;
            loop {
                let page = service
                    .latest_videos(&request)
                    .await
                    .context("Failed to load latest videos")?;
                pages += 1;
                print_page(pages, &page)?;

                match page.paging_state {
                    Some(state) if all => request = request.next(state),
                    _ => break,
                }
            }
            Ok(())
        }

        Command::Seed { count } => {
            seed_demo(service, count).await?;
            info!("🌱 Published {} demo video(s)", count);
            Ok(())
        }

        Command::Migrate | Command::Purge { .. } => {
            bail!("command needs a database connection")
        }
    }
}

fn print_page(number: usize, page: &LatestVideosPage) -> Result<()> {
    let mut out = io::stdout().lock();

    writeln!(out, "── page {} ({} video(s))", number, page.videos.len())?;
    for video in &page.videos {
        writeln!(
            out,
            "{}  {}  {}",
            video.added_date.format("%Y-%m-%d %H:%M:%S"),
            video.video_id,
            video.name
        )?;
    }
    match &page.paging_state {
        Some(state) => writeln!(out, "paging state: {}", state)?,
        None => writeln!(out, "end of feed")?,
    }

    Ok(())
}

/// Publish `count` demo videos spread evenly over the feed horizon, newest now.
///
/// The oldest one lands `horizon_days - 1` days back, so every demo video is
/// inside the horizon whatever the time of day.
async fn seed_demo<S: LatestVideoStore>(
    service: &LatestVideosService<S>,
    count: usize,
) -> Result<()> {
    if count == 0 {
        return Ok(());
    }

    const TITLES: [&str; 6] = [
        "Sunset timelapse",
        "Cooking pasta",
        "Trail run",
        "Guitar cover",
        "City at night",
        "Unboxing",
    ];

    let span_minutes = i64::from(service.config().horizon_days.saturating_sub(1)) * 24 * 60;
    let step = span_minutes / count as i64;
    let now = Utc::now();
    let uploader = Uuid::new_v4();

    for i in 0..count {
        let title = TITLES[i % TITLES.len()];
        service
            .submit_video(SubmitVideo {
                video_id: Uuid::new_v4(),
                user_id: uploader,
                name: format!("{} #{}", title, i + 1),
                preview_image_location: Some(format!("/images/demo/{}.jpg", i + 1)),
                added_date: Some(now - Duration::minutes(step * i as i64)),
            })
            .await
            .context("Failed to publish demo video")?;
    }

    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr; stdout carries the command output.
    if json {
        fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .json()
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Handle the `purge` command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL videos from the feed!");
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");
    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   🎬 Videos removed: {}", stats.videos_removed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_anchor_parsing() {
        assert_eq!(
            parse_anchor("20240229").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_anchor("20230229").is_err());
        assert!(parse_anchor("2024-02-29").is_err());
    }

    // Test critique: le mot de passe ne doit jamais apparaître dans les logs
    #[test]
    fn test_mask_password() {
        let masked = mask_password("postgres://reel:hunter2@db:5432/reel");
        assert!(!masked.contains("hunter2"));
        assert!(masked.contains("****"));
        assert_eq!(mask_password("not a url"), "not a url");
    }

    #[test]
    fn test_latest_flags_parse() {
        let cli = Cli::try_parse_from([
            "reel",
            "--in-memory",
            "latest",
            "--page-size",
            "3",
            "--anchor",
            "20240105",
            "--all",
        ])
        .unwrap();

        assert!(cli.in_memory);
        match cli.command {
            Command::Latest {
                page_size,
                anchor,
                all,
                paging_state,
                starting_added_date,
                starting_video_id,
            } => {
                assert_eq!(page_size, 3);
                assert_eq!(anchor, NaiveDate::from_ymd_opt(2024, 1, 5));
                assert!(all);
                assert!(paging_state.is_none());
                assert!(starting_added_date.is_none() && starting_video_id.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_starting_position_flags_go_together() {
        let cli = Cli::try_parse_from([
            "reel",
            "--in-memory",
            "latest",
            "--starting-added-date",
            "2024-01-05T10:00:00Z",
            "--starting-video-id",
            "00000000-0000-0000-0000-000000000007",
        ])
        .unwrap();
        match cli.command {
            Command::Latest {
                starting_added_date,
                starting_video_id,
                ..
            } => {
                assert_eq!(starting_video_id, Some(Uuid::from_u128(7)));
                assert_eq!(
                    starting_added_date.map(|d| d.date_naive()),
                    NaiveDate::from_ymd_opt(2024, 1, 5)
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }

        let half = Cli::try_parse_from([
            "reel",
            "--in-memory",
            "latest",
            "--starting-video-id",
            "00000000-0000-0000-0000-000000000007",
        ]);
        assert!(half.is_err());
    }

    #[tokio::test]
    async fn test_seed_demo_stays_inside_horizon() {
        let store = Arc::new(InMemoryLatestVideoStore::new());
        let service = LatestVideosService::new(FeedConfig::default(), Arc::clone(&store));

        seed_demo(&service, 12).await.unwrap();
        assert_eq!(store.len().await, 12);

        let page = service
            .latest_videos(&LatestVideosRequest::first_page(100))
            .await
            .unwrap();
        assert_eq!(page.videos.len(), 12);
    }
}
