// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use universalsub::app_config::{self, Config};
use universalsub::app_controller::Controller;
use universalsub::orchestrator::{ResumeMode, TaskOutcome, TaskRequest};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for ResumeMode to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliResumeMode {
    Fresh,
    UseAudio,
    UseTranscript,
}

impl From<CliResumeMode> for ResumeMode {
    fn from(mode: CliResumeMode) -> Self {
        match mode {
            CliResumeMode::Fresh => ResumeMode::Fresh,
            CliResumeMode::UseAudio => ResumeMode::UseAudio,
            CliResumeMode::UseTranscript => ResumeMode::UseTranscript,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe and translate a media file into an SRT file (default command)
    Run(RunArgs),

    /// Report which intermediate artifacts exist for a media file
    Sidecars {
        /// Media file to inspect
        #[arg(value_name = "MEDIA")]
        media: PathBuf,
    },

    /// Generate shell completions for universalsub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Media file to process
    #[arg(value_name = "MEDIA")]
    media: PathBuf,

    /// Target language name (e.g. 'Chinese', 'Spanish')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Where to resume from when intermediate artifacts exist
    #[arg(short, long, value_enum, default_value = "fresh")]
    resume: CliResumeMode,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// universalsub - turn media files into translated subtitles
#[derive(Parser, Debug)]
#[command(name = "universalsub")]
#[command(version)]
#[command(about = "Transcribe media and translate it into SRT subtitles")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "universalsub transcribes a media file with a whisper.cpp-compatible CLI, \
translates the transcript through an OpenAI-compatible chat endpoint and writes <media>.srt.

EXAMPLES:
    universalsub movie.mp4                              # Run with the default config
    universalsub run movie.mp4 -t Spanish               # Translate into Spanish
    universalsub run movie.mp4 --resume use-transcript  # Reuse movie.mp4.temp.json
    universalsub sidecars movie.mp4                     # Show available side-cars
    universalsub completions bash > universalsub.bash   # Generate bash completions")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Media file to process
    #[arg(value_name = "MEDIA")]
    media: Option<PathBuf>,

    /// Target language name (e.g. 'Chinese', 'Spanish')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Where to resume from when intermediate artifacts exist
    #[arg(short, long, value_enum, default_value = "fresh")]
    resume: CliResumeMode,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "universalsub", &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Sidecars { media }) => {
            if !media.exists() {
                return Err(anyhow!("Media file does not exist: {:?}", media));
            }
            let resume_point = universalsub::segment_store::check_resume_point(&media);
            println!("{}", serde_json::to_string_pretty(&resume_point)?);
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Run(args)) => run_task(args).await,
        None => {
            // Default behavior: top-level args act like `run`
            let media = cli
                .media
                .ok_or_else(|| anyhow!("MEDIA is required when no subcommand is specified"))?;
            run_task(RunArgs {
                media,
                target_language: cli.target_language,
                resume: cli.resume,
                config: cli.config,
                log_level: cli.log_level,
            })
            .await
        }
    }
}

async fn run_task(args: RunArgs) -> Result<ExitCode> {
    // A command line level wins over the config file
    if let Some(level) = &args.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = args.config.clone().unwrap_or_else(app_config::default_config_path);
    let mut config = Config::load_or_create(&config_path)?;

    if let Some(target_language) = &args.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    config.validate().context("Configuration validation failed")?;
    info!("Using config {}", config_path.display());

    let request = TaskRequest::new(args.media.clone(), config.target_language.clone())
        .with_resume_mode(args.resume.into());

    let controller = Controller::with_config(config)?;
    let outcome = controller.run(request).await?;

    Ok(match outcome {
        TaskOutcome::Completed { .. } => ExitCode::SUCCESS,
        TaskOutcome::Cancelled => ExitCode::from(130),
        TaskOutcome::Failed { .. } => ExitCode::FAILURE,
    })
}
