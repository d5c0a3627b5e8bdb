use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tracing_subscriber::EnvFilter;

use kurs_core::{
    AbortHandle, AiConfig, CourseGenerator, GenerateRequest, ModelClient, ModelTier, NotesStore,
    RateLimiter, TranscriptSegment, default_notes_path, format_course_readable, get_cache_dir,
    get_course_path, get_transcript_path, load_course, load_transcript, recommend_videos,
    save_course, save_transcript,
    youtube::{YoutubeClient, parse_video_id},
};

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

/// CLI wrapper for ModelTier (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliTier {
    Fast,
    Default,
    #[default]
    Smart,
}

impl From<CliTier> for ModelTier {
    fn from(cli: CliTier) -> Self {
        match cli {
            CliTier::Fast => ModelTier::Fast,
            CliTier::Default => ModelTier::Default,
            CliTier::Smart => ModelTier::Smart,
        }
    }
}

#[derive(Parser)]
#[command(name = "kurs")]
#[command(about = "Turn YouTube videos into structured, AI-generated courses")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a course from a video URL or id
    Generate {
        /// Video URL or bare video id
        url: String,

        /// Model tier used for generation
        #[arg(short, long, default_value = "smart")]
        tier: CliTier,

        /// Transcript JSON file (array of segments); otherwise the cache is used
        #[arg(long)]
        transcript: Option<PathBuf>,

        /// Force re-generation even if a cached course exists
        #[arg(short, long)]
        force: bool,

        /// Disable incremental streaming generation
        #[arg(long)]
        no_stream: bool,
    },

    /// Discover and rank videos for a learning topic
    Discover {
        topic: String,

        /// Maximum number of candidates to consider
        #[arg(short, long, default_value_t = 5)]
        max: u32,
    },

    /// Manage per-lesson notes
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
}

#[derive(Subcommand)]
enum NotesAction {
    /// List all saved notes
    List,
    /// Print the note for one lesson
    Get { lesson_id: String },
    /// Save a note for one lesson (empty text deletes it)
    Set { lesson_id: String, text: String },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AiConfig::from_env();

    match cli.command {
        Command::Generate {
            url,
            tier,
            transcript,
            force,
            no_stream,
        } => generate(config, url, tier.into(), transcript, force, no_stream).await,
        Command::Discover { topic, max } => discover(config, &topic, max).await,
        Command::Notes { action } => notes(action).await,
    }
}

async fn generate(
    mut config: AiConfig,
    url: String,
    tier: ModelTier,
    transcript_file: Option<PathBuf>,
    force: bool,
    no_stream: bool,
) -> Result<()> {
    // Validate API key early
    if let Err(e) = config.provider.validate_api_key() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
    if no_stream {
        config.streaming_enabled = false;
    }

    let video_id = parse_video_id(&url)?;
    let cache_dir = get_cache_dir(&video_id);
    fs::create_dir_all(&cache_dir).await?;

    println!(
        "\n{}  {}\n",
        style("kurs").cyan().bold(),
        style("Course Generator").dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();

    // Step 1: Video metadata
    let step_start = Instant::now();
    let spinner = create_spinner("Fetching video metadata...");
    let youtube = YoutubeClient::from_env()?;
    let metadata = youtube.video_details(&video_id).await?;
    spinner.finish_with_message(format!(
        "{} Metadata: {} {}",
        style("✓").green().bold(),
        style(&metadata.title).yellow(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 2: Transcript (explicit file, then cache, then metadata only)
    let transcript_path = get_transcript_path(&cache_dir);
    let segments: Vec<TranscriptSegment> = if let Some(path) = transcript_file {
        let segments = load_transcript(&path).await?;
        save_transcript(&segments, &transcript_path).await?;
        println!(
            "{} Transcript: {} segments",
            style("✓").green().bold(),
            segments.len()
        );
        segments
    } else if transcript_path.exists() {
        let segments = load_transcript(&transcript_path).await?;
        println!(
            "{} Transcript: {} segments {}",
            style("✓").green().bold(),
            segments.len(),
            style("(cached)").dim()
        );
        segments
    } else {
        println!(
            "{} No transcript available - using video metadata only",
            style("!").yellow().bold()
        );
        Vec::new()
    };

    // Step 3: Generate course (check cache with tier)
    let step_start = Instant::now();
    let course_path = get_course_path(&cache_dir, tier);

    let course = if !force && course_path.exists() {
        let course = load_course(&course_path).await?;
        println!(
            "{} Course generated {}",
            style("✓").green().bold(),
            style("(cached)").dim()
        );
        course
    } else {
        let spinner = create_spinner("Generating course...");
        let limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));
        let client = ModelClient::new(config, limiter)?;
        let generator = CourseGenerator::new(client);

        let request = GenerateRequest {
            metadata: &metadata,
            segments: &segments,
            fallback_transcript: None,
        };

        let abort = AbortHandle::new();
        let ctrl_c_abort = abort.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c_abort.abort();
            }
        });

        let mut updates = 0usize;
        let course = generator
            .generate_course_streaming(&request, &abort, &mut |_| {
                updates += 1;
                spinner.set_message(format!("Generating course... ({updates} updates)"));
            })
            .await?;

        save_course(&course, &course_path).await?;
        spinner.finish_with_message(format!(
            "{} Course generated {}",
            style("✓").green().bold(),
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        ));
        course
    };

    if course.degraded {
        println!(
            "{} Generation ran in reduced-fidelity mode; the course was built from video metadata",
            style("!").yellow().bold()
        );
    }

    println!(
        "\n{} {}",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}\n",
        style("Saved:").dim(),
        style(course_path.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());

    // Human-readable output
    println!("{}", format_course_readable(&course));

    Ok(())
}

async fn discover(config: AiConfig, topic: &str, max: u32) -> Result<()> {
    if let Err(e) = config.provider.validate_api_key() {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    let spinner = create_spinner("Searching for videos...");
    let limiter = Arc::new(RateLimiter::new(config.rate_limits.clone()));
    let client = ModelClient::new(config, limiter)?;
    let youtube = YoutubeClient::from_env()?;

    let recommendations = recommend_videos(&client, &youtube, topic, max).await?;
    spinner.finish_and_clear();

    if recommendations.is_empty() {
        println!("{} No videos found for \"{topic}\"", style("!").yellow().bold());
        return Ok(());
    }

    println!(
        "\n{} {}\n",
        style("Recommendations for").dim(),
        style(topic).cyan().bold()
    );
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{}. {} {}",
            i + 1,
            style(&rec.title).bold(),
            style(format!("[{:.0}%]", rec.relevance_score * 100.0)).green()
        );
        println!(
            "   {} | {} | https://www.youtube.com/watch?v={}",
            style(&rec.channel_name).yellow(),
            rec.duration,
            rec.video_id
        );
        println!("   {}\n", style(&rec.justification).dim());
    }

    Ok(())
}

async fn notes(action: NotesAction) -> Result<()> {
    let path = default_notes_path();
    let mut store = NotesStore::load(&path).await?;

    match action {
        NotesAction::List => {
            if store.is_empty() {
                println!("{} No notes saved yet", style("!").yellow().bold());
            }
            for (lesson_id, text) in store.iter() {
                println!("{}  {}", style(lesson_id).cyan().bold(), text);
            }
        }
        NotesAction::Get { lesson_id } => match store.get(&lesson_id) {
            Some(text) => println!("{text}"),
            None => println!(
                "{} No note for lesson {}",
                style("!").yellow().bold(),
                style(lesson_id).cyan()
            ),
        },
        NotesAction::Set { lesson_id, text } => {
            store.set(&lesson_id, &text);
            store.save().await?;
            println!("{} Note saved", style("✓").green().bold());
        }
    }

    Ok(())
}
