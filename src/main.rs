//! tikwm-downloader CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use tikwm_downloader::{
    api::{ContentApi, Post, TikwmApi},
    cli::{Args, DEFAULT_CLI_RETRIES},
    config::{
        parse_post_input, parse_until, parse_user_input, validate_config, Config, RunMode, UserRef,
    },
    download::{
        enumerate, max_size, while_after, DownloadConfig, DownloadGate, Downloader, FeedControl,
        FeedOptions, GlobalState, ProfileState,
    },
    error::{exit_codes, Error, Result},
    fs::ensure_dir,
    output::{
        create_item_bar, create_spinner, print_config_summary, print_downloaded, print_error,
        print_global_stats, print_info, print_profile_stats, print_usage_hint,
    },
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args);

    match run(args).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn init_logging(args: &Args) {
    let log_level = if args.quiet {
        "error"
    } else if args.debug {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: Args) -> Result<i32> {
    if args.inputs.is_empty() {
        print_usage_hint();
        return Ok(exit_codes::SUCCESS);
    }

    // Load configuration
    let mut config = match Config::locate(args.config.as_deref()) {
        Some(path) => {
            tracing::debug!("Using configuration {}", path.display());
            Config::load(&path)?
        }
        None => {
            let mut config = Config::default();
            config.download.retries = DEFAULT_CLI_RETRIES;
            config
        }
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config)?;

    // Validate configuration
    validate_config(&config)?;

    let mode = args.mode();
    let downloads = mode != RunMode::Info && !args.json;
    let session = Session::new(config, args.json, !args.quiet && !args.json, downloads)?;

    if session.ui && downloads {
        print_config_summary(
            &args.inputs,
            &mode.to_string(),
            &session.config.download.quality.to_string(),
            &session.config.download_directory().display().to_string(),
        );
    }

    let mut global = GlobalState::default();
    let mut last_error: Option<Error> = None;

    for input in &args.inputs {
        let result = match mode {
            RunMode::Info => session.info(input).await,
            RunMode::Post => session.post(input, &mut global).await,
            RunMode::Profile => session.profile(input, &mut global).await,
        };

        if let Err(e) = result {
            print_error(&format!("{}: {}", input, e));
            global.mark_input_failed();
            last_error = Some(e);
        }
    }

    if session.ui && downloads {
        print_global_stats(&global);
    }

    Ok(match last_error {
        None => exit_codes::SUCCESS,
        Some(e) if args.inputs.len() == 1 => e.exit_code(),
        Some(_) => exit_codes::SOME_INPUTS_FAILED,
    })
}

fn downloads_disabled() -> Error {
    Error::Config("Downloads are disabled in this mode".into())
}

/// Everything shared by the inputs of one run.
struct Session {
    config: Config,
    api: Arc<TikwmApi>,
    downloader: Downloader,
    download_config: Option<DownloadConfig>,
    json: bool,
    ui: bool,
}

impl Session {
    fn new(config: Config, json: bool, ui: bool, downloads: bool) -> Result<Self> {
        let api = Arc::new(TikwmApi::from_config(&config)?);
        let downloader = Downloader::new(api.clone(), Arc::new(DownloadGate::new()));

        let download_config = if downloads {
            ensure_dir(&config.download_directory())?;
            Some(DownloadConfig::from_config(&config)?)
        } else {
            None
        };

        Ok(Self {
            config,
            api,
            downloader,
            download_config,
            json,
            ui,
        })
    }

    fn download_config(&self) -> Result<&DownloadConfig> {
        self.download_config.as_ref().ok_or_else(downloads_disabled)
    }

    /// Print the profile of a user.
    async fn info(&self, input: &str) -> Result<()> {
        let handle = match parse_user_input(input)? {
            UserRef::Handle(handle) => handle,
            UserRef::Id(id) => {
                return Err(Error::InvalidInput(format!(
                    "--info needs a username, got numeric id {}",
                    id
                )))
            }
        };

        let detail = self.api.get_user_detail(&handle).await?;
        println!("{}", serde_json::to_string_pretty(&detail)?);
        Ok(())
    }

    /// Resolve and download (or print) one post.
    async fn post(&self, input: &str, global: &mut GlobalState) -> Result<()> {
        let input = parse_post_input(input)?;
        let quality = self.config.download.quality;

        let spinner = self.ui.then(|| create_spinner(&format!("Resolving {}", input)));
        let post = self.api.get_post(&input, quality).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let post = post?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&post)?);
            return Ok(());
        }

        let files = self.downloader.download(&post, self.download_config()?).await?;
        tracing::info!("Downloaded post {} ({} file(s))", post.id, files.len());
        if self.ui {
            print_downloaded(&post.id, &files);
        }
        global.add_post(&post, files.len());

        Ok(())
    }

    /// Download (or list) every post of a profile.
    async fn profile(&self, input: &str, global: &mut GlobalState) -> Result<()> {
        let mut state = ProfileState::new(input, 0);
        let mut listed = Vec::new();

        let result = self.walk_profile(input, &mut state, &mut listed).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&listed)?);
        } else {
            global.add_profile_stats(&state);
            if self.ui {
                print_profile_stats(&state);
            }
        }

        result
    }

    async fn walk_profile(
        &self,
        input: &str,
        state: &mut ProfileState,
        listed: &mut Vec<Post>,
    ) -> Result<()> {
        let profile = &self.config.profile;
        let quality = self.config.download.quality;
        let until = parse_until(&profile.until)?;

        tracing::info!("Starting profile download of {} ({})", input, quality);
        if until.timestamp() > 0 {
            tracing::info!("Ignoring posts before {}", profile.until);
        }

        let options = FeedOptions::new()
            .while_(while_after(until))
            .filter(max_size(self.config.max_size_bytes()))
            .quality(quality)
            .page_size(profile.page_size)
            .retry_delay(Duration::from_millis(self.config.download.retry_delay_ms))
            .on_error(|e| {
                if e.is_transport() {
                    FeedControl::Retry
                } else {
                    FeedControl::Abort
                }
            });

        // A configured fixed filename would be shared by every post.
        let download_config = self
            .download_config
            .as_ref()
            .map(DownloadConfig::without_filename);

        let api: Arc<dyn ContentApi> = self.api.clone();
        let mut feed = enumerate(api, input, options).await?;
        state.expected_count = feed.expected_count();
        if feed.count_is_total() {
            tracing::info!("Expecting {} posts", state.expected_count);
        } else {
            tracing::info!("Expecting at least {} posts", state.expected_count);
        }

        let bar = (self.ui && !self.json).then(|| create_item_bar(state.expected_count, "Posts"));

        while let Some(item) = feed.next().await {
            let post = item?;
            let position = state.next_post();

            if self.json {
                listed.push(post);
                continue;
            }

            let download_config = download_config.as_ref().ok_or_else(downloads_disabled)?;
            match self.downloader.download(&post, download_config).await {
                Ok(files) => {
                    tracing::info!(
                        "[{}/{}] Downloaded post {} ({} file(s))",
                        position,
                        state.expected_count,
                        post.id,
                        files.len()
                    );
                    state.record_download(&post, files.len());
                }
                Err(e) => {
                    tracing::error!("Could not download post {}: {}", post.id, e);
                    state.record_failure(&post.id);
                    if !profile.ignore_errors {
                        if let Some(bar) = &bar {
                            bar.abandon();
                        }
                        return Err(e);
                    }
                }
            }

            if let Some(bar) = &bar {
                bar.inc(1);
            }
        }

        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
        if self.ui {
            print_info(&format!("Profile {} complete", input));
        }

        Ok(())
    }
}
