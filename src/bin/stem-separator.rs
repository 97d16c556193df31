use clap::{Parser, Subcommand};
use stem_separator_client::{
    poll_until_terminal, registry, set_download_progress_callback, set_upload_progress_callback,
    ClientConfig, ClientError, JobDetail, JobQuery, JobState, PollOptions, SeparatorClient,
    StreamEvent, StreamState,
};
use std::{
    path::{Path, PathBuf},
    process, thread,
};

#[derive(Parser)]
#[command(name = "stem-separator")]
#[command(about = "Split songs into stems with the Stem Separator service", long_about = None)]
#[command(version)]
struct Cli {
    /// Backend base URL (overrides config file and STEM_SEPARATOR_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, process it, watch progress and download all stems
    Run {
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Upload a file without starting processing
    Upload {
        #[arg(short, long)]
        input: String,

        #[arg(short, long)]
        model: Option<String>,

        /// Also start processing right away
        #[arg(long)]
        process: bool,
    },

    /// Start processing an uploaded job
    Process { job_id: String },

    /// Show the status of a job
    Status {
        job_id: String,

        /// Keep polling until the job finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// List jobs
    Jobs {
        #[arg(long)]
        status: Option<JobState>,

        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show processing logs for a job
    Logs {
        job_id: String,

        /// Stream new entries live until the job finishes
        #[arg(short, long)]
        follow: bool,

        #[arg(long, default_value_t = 100)]
        limit: usize,

        /// Clear the server-side log buffer instead of printing
        #[arg(long)]
        clear: bool,
    },

    /// List the stems of a completed job
    Stems { job_id: String },

    /// Download stems of a completed job
    Download {
        job_id: String,

        /// Download a single stem (vocals, drums, bass, other)
        #[arg(long)]
        stem: Option<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Cancel a pending or processing job
    Cancel { job_id: String },

    /// Delete a job and its files on the backend
    Delete { job_id: String },

    /// List available separation models
    Models,

    /// Check backend health
    Health,
}

fn main() {
    setup_tracing();

    let cli = Cli::parse();

    let result = run_command(cli);

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::load()?;
    let base = cli
        .base_url
        .or_else(|| config.base_url().map(str::to_string));
    let client = SeparatorClient::new(base.as_deref())?;

    match cli.command {
        Commands::Run {
            input,
            model,
            output,
            quiet,
        } => handle_run(&client, &config, input, model, output, quiet),
        Commands::Upload {
            input,
            model,
            process,
        } => handle_upload(&client, &config, input, model, process),
        Commands::Process { job_id } => handle_process(&client, job_id),
        Commands::Status { job_id, watch } => handle_status(&client, job_id, watch),
        Commands::Jobs {
            status,
            limit,
            offset,
        } => handle_jobs(&client, status, limit, offset),
        Commands::Logs {
            job_id,
            follow,
            limit,
            clear,
        } => handle_logs(&client, job_id, follow, limit, clear),
        Commands::Stems { job_id } => handle_stems(&client, job_id),
        Commands::Download {
            job_id,
            stem,
            output,
        } => handle_download(&client, &config, job_id, stem, output),
        Commands::Cancel { job_id } => handle_cancel(&client, job_id),
        Commands::Delete { job_id } => handle_delete(&client, job_id),
        Commands::Models => handle_models(),
        Commands::Health => handle_health(&client),
    }
}

fn handle_run(
    client: &SeparatorClient,
    config: &ClientConfig,
    input: String,
    model: Option<String>,
    output: Option<String>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = model.unwrap_or_else(|| config.model().to_string());
    let output = output
        .map(PathBuf::from)
        .unwrap_or_else(|| config.download_dir().to_path_buf());

    if !Path::new(&input).exists() {
        return Err(format!("Input file not found: {}", input).into());
    }

    if !quiet {
        setup_progress_callbacks();

        eprintln!("🎵 Stem Separator");
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!("Input:  {}", input);
        eprintln!("Output: {}", output.display());
        eprintln!("Model:  {}", model);
        eprintln!("Server: {}", client.base_url());
        eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        eprintln!();
    }

    let receipt = client.upload(Path::new(&input), &model)?;
    if !quiet {
        eprintln!();
        eprintln!("📤 Uploaded as job {}", receipt.job_id);
    }

    client.start_processing(&receipt.job_id)?;

    // Status poller and log stream run side by side; each detects the
    // terminal state on its own.
    let poll_client = client.clone();
    let poll_id = receipt.job_id.clone();
    let poller = thread::spawn(move || {
        let mut last: Option<(JobState, i32)> = None;
        poll_until_terminal(
            &poll_client,
            &poll_id,
            &PollOptions::default(),
            None,
            |detail| {
                if quiet {
                    return;
                }
                let snapshot = (detail.status, detail.progress.round() as i32);
                if last != Some(snapshot) {
                    eprintln!("⏳ {} {:>3}% {}", detail.status, snapshot.1, detail.message);
                    last = Some(snapshot);
                }
            },
        )
    });

    match client.open_log_stream(&receipt.job_id) {
        Ok(mut stream) => {
            stream.run(|ev| {
                if quiet {
                    return;
                }
                if let StreamEvent::Log(entry) = ev {
                    eprintln!("📡 [{}] {}", entry.level, entry.message);
                }
            });
            if stream.state() == StreamState::ClosedError {
                if let Some(msg) = stream.error() {
                    eprintln!("⚠️  Log stream closed: {}", msg);
                }
            }
        }
        Err(e) => tracing::warn!("log stream unavailable: {e}"),
    }

    let final_detail = poller
        .join()
        .map_err(|_| "status poller panicked")??
        .ok_or("status poller stopped before the job finished")?;

    finish_run(client, &final_detail, &input, &output, quiet)
}

fn finish_run(
    client: &SeparatorClient,
    detail: &JobDetail,
    input: &str,
    output: &Path,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match detail.status {
        JobState::Completed => {}
        JobState::Failed => {
            let reason = detail
                .error
                .clone()
                .unwrap_or_else(|| detail.message.clone());
            return Err(format!("Processing failed: {}", reason).into());
        }
        other => return Err(format!("Job ended as {} before completing", other).into()),
    }

    if !quiet {
        eprintln!();
        eprintln!("✅ Separation completed!");
        eprintln!();
    }

    let base = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| detail.job_id.clone());

    let stems = client.stems(&detail.job_id)?;
    let mut saved = Vec::new();
    for stem in &stems {
        let dest = output.join(format!("{}_{}", base, stem.filename));
        let written = client.download_stem(&detail.job_id, &stem.name, &dest)?;
        if written != stem.size {
            tracing::warn!(
                stem = %stem.name,
                expected = stem.size,
                written,
                "downloaded size differs from listing"
            );
        }
        saved.push((stem.name.clone(), dest));
    }

    if !quiet {
        eprintln!();
        eprintln!("Output files:");
        for (name, path) in &saved {
            eprintln!("  {} {:<8} {}", stem_icon(name), format!("{}:", name), path.display());
        }
    } else {
        // Quiet mode: just print paths
        for (_, path) in &saved {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn handle_upload(
    client: &SeparatorClient,
    config: &ClientConfig,
    input: String,
    model: Option<String>,
    process: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let model = model.unwrap_or_else(|| config.model().to_string());

    if !Path::new(&input).exists() {
        return Err(format!("Input file not found: {}", input).into());
    }

    setup_progress_callbacks();

    let receipt = client.upload(Path::new(&input), &model)?;
    eprintln!();
    eprintln!("📤 Uploaded {} as job {}", receipt.filename, receipt.job_id);
    eprintln!("   {}", receipt.message);

    if process {
        let started = client.start_processing(&receipt.job_id)?;
        eprintln!("▶️  {}", started.message);
    }

    println!("{}", receipt.job_id);
    Ok(())
}

fn handle_process(
    client: &SeparatorClient,
    job_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let receipt = client.start_processing(&job_id)?;
    eprintln!("▶️  {} ({})", receipt.message, receipt.status);
    Ok(())
}

fn handle_status(
    client: &SeparatorClient,
    job_id: String,
    watch: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !watch {
        let detail = client.job(&job_id)?;
        print_status(&detail);
        return Ok(());
    }

    let final_detail = poll_until_terminal(
        client,
        &job_id,
        &PollOptions::default(),
        None,
        |detail| {
            eprintln!(
                "⏳ {} {:>3.0}% {}",
                detail.status, detail.progress, detail.message
            );
        },
    )?
    .ok_or("poller stopped before the job finished")?;

    print_status(&final_detail);
    Ok(())
}

fn print_status(detail: &JobDetail) {
    eprintln!("Job:      {}", detail.job_id);
    eprintln!("File:     {}", detail.filename);
    eprintln!("Status:   {}", detail.status);
    eprintln!("Progress: {:.0}%", detail.progress);
    if !detail.message.is_empty() {
        eprintln!("Message:  {}", detail.message);
    }
    if let Some(model) = &detail.model {
        eprintln!("Model:    {}", model);
    }
    if let Some(error) = &detail.error {
        eprintln!("Error:    {}", error);
    }
}

fn handle_jobs(
    client: &SeparatorClient,
    status: Option<JobState>,
    limit: u32,
    offset: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = client.jobs(&JobQuery {
        status,
        limit,
        offset,
    })?;

    if jobs.is_empty() {
        eprintln!("No jobs found");
        return Ok(());
    }

    for job in &jobs {
        eprintln!(
            "{}  {:<10}  {}  {}",
            job.job_id,
            job.status.to_string(),
            job.created_at.format("%Y-%m-%d %H:%M:%S"),
            job.filename
        );
    }
    Ok(())
}

fn handle_logs(
    client: &SeparatorClient,
    job_id: String,
    follow: bool,
    limit: usize,
    clear: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if clear {
        client.clear_logs(&job_id)?;
        eprintln!("🧹 Cleared logs for job {}", job_id);
        return Ok(());
    }

    let history = client.log_history(&job_id, limit)?;
    for entry in &history.logs {
        println!(
            "{} [{}] {}",
            entry.timestamp.format("%H:%M:%S"),
            entry.level,
            entry.message
        );
    }
    eprintln!(
        "Showing {} of {} log entries for job {}",
        history.logs.len(),
        history.total_logs,
        job_id
    );

    if !follow {
        return Ok(());
    }

    let mut stream = client.open_log_stream(&job_id)?;
    let state = stream.run(|ev| match ev {
        StreamEvent::Log(entry) => {
            println!(
                "{} [{}] {}",
                entry.timestamp.format("%H:%M:%S"),
                entry.level,
                entry.message
            );
        }
        StreamEvent::Status(status) => {
            eprintln!("— job is {} —", status);
        }
        _ => {}
    });

    match state {
        StreamState::ClosedError => Err(ClientError::Stream(
            stream
                .error()
                .unwrap_or("log stream closed unexpectedly")
                .to_string(),
        )
        .into()),
        _ => Ok(()),
    }
}

fn handle_stems(
    client: &SeparatorClient,
    job_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let stems = client.stems(&job_id)?;

    eprintln!("📋 Stems for job {}", job_id);
    for stem in &stems {
        eprintln!(
            "  {} {:<8} {} ({:.2} MB)",
            stem_icon(&stem.name),
            format!("{}:", stem.name),
            stem.filename,
            stem.size as f64 / 1_000_000.0
        );
    }
    Ok(())
}

fn handle_download(
    client: &SeparatorClient,
    config: &ClientConfig,
    job_id: String,
    stem: Option<String>,
    output: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = output
        .map(PathBuf::from)
        .unwrap_or_else(|| config.download_dir().to_path_buf());

    setup_progress_callbacks();

    let stems = client.stems(&job_id)?;
    let wanted: Vec<_> = match &stem {
        Some(name) => {
            let found = stems.iter().find(|s| &s.name == name);
            match found {
                Some(s) => vec![s.clone()],
                None => return Err(format!("Stem '{}' not found for job {}", name, job_id).into()),
            }
        }
        None => stems,
    };

    for stem in &wanted {
        let dest = output.join(&stem.filename);
        eprintln!("📥 Downloading {}...", stem.name);
        client.download_stem(&job_id, &stem.name, &dest)?;
        eprintln!();
        println!("{}", dest.display());
    }
    Ok(())
}

fn handle_cancel(
    client: &SeparatorClient,
    job_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    client.cancel_job(&job_id)?;
    eprintln!("🛑 Cancelled job {}", job_id);
    Ok(())
}

fn handle_delete(
    client: &SeparatorClient,
    job_id: String,
) -> Result<(), Box<dyn std::error::Error>> {
    client.delete_job(&job_id)?;
    eprintln!("🗑️  Deleted job {}", job_id);
    Ok(())
}

fn handle_models() -> Result<(), Box<dyn std::error::Error>> {
    let registry = registry::registry()?;

    eprintln!("📋 Available Models");
    eprintln!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for model in &registry.models {
        let marker = if model.name == registry.default {
            " (default)"
        } else {
            ""
        };
        eprintln!("  • {}{}: {}", model.name, marker, model.description);
    }

    eprintln!();
    eprintln!("Use --model <name> to specify a model");
    Ok(())
}

fn handle_health(client: &SeparatorClient) -> Result<(), Box<dyn std::error::Error>> {
    let body = client.health()?;
    let status = body
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown");
    eprintln!("💚 Backend at {} is {}", client.base_url(), status);
    Ok(())
}

fn stem_icon(name: &str) -> &'static str {
    match name {
        "vocals" => "🎤",
        "drums" => "🥁",
        "bass" => "🎸",
        _ => "🎹",
    }
}

fn setup_progress_callbacks() {
    set_upload_progress_callback(|sent, total| {
        if total > 0 {
            let percent = (sent as f64 / total as f64 * 100.0).round() as u64;
            eprint!(
                "\r📤 Uploading: {:>3}% ({:.2} MB / {:.2} MB)",
                percent,
                sent as f64 / 1_000_000.0,
                total as f64 / 1_000_000.0
            );
            if sent >= total {
                eprintln!();
            }
        } else {
            eprint!("\r📤 Uploading: {:.2} MB", sent as f64 / 1_000_000.0);
        }
    });

    set_download_progress_callback(|downloaded, total| {
        if total > 0 {
            let percent = (downloaded as f64 / total as f64 * 100.0).round() as u64;
            eprint!(
                "\r📥 Downloading: {:>3}% ({:.2} MB / {:.2} MB)",
                percent,
                downloaded as f64 / 1_000_000.0,
                total as f64 / 1_000_000.0
            );
            if downloaded >= total {
                eprintln!();
            }
        } else {
            eprint!("\r📥 Downloading: {:.2} MB", downloaded as f64 / 1_000_000.0);
        }
    });
}
