use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use catalog_mef::app::{App, GetOptions, ProgressSink, batch_size_from};
use catalog_mef::bucket::BucketManager;
use catalog_mef::config::{ConfigLoader, Overrides, ResolvedConfig};
use catalog_mef::domain::{ExportFormat, ImportMode, Query};
use catalog_mef::error::MefError;
use catalog_mef::output::{ConsoleOutput, JsonOutput, OutputMode};
use catalog_mef::session::{CatalogSession, SessionOptions};

#[derive(Parser)]
#[command(name = "mef")]
#[command(about = "Export and import catalog records as MEF archives")]
#[command(version)]
struct Cli {
    /// JSON settings file (url, username, password, bucket, bucket_batch_size, timeout_secs).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Print a JSON summary instead of progress lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Retrieve MEF archives for the records matching a query")]
    Get(GetArgs),
    #[command(about = "Import a MEF archive")]
    Put(PutArgs),
}

#[derive(Args)]
struct GetArgs {
    /// Catalog URL, up to and including the `/srv` portion.
    #[arg(long)]
    url: Option<String>,

    /// Additional query parameters, e.g. `isHarvested=n,type=dataset`.
    #[arg(long)]
    query: Option<String>,

    #[arg(long, value_enum, default_value_t = ExportFormat::Simple)]
    format: ExportFormat,

    /// Maximum number of records to retrieve (0 for all).
    #[arg(long, default_value_t = 0)]
    limit: usize,

    /// Records per archive; 0 or less writes a single archive.
    #[arg(long, default_value_t = 500, allow_negative_numbers = true)]
    batch: i64,

    /// Collect record ids through the magic `metadata` bucket (default).
    #[arg(long, overrides_with = "no_magic")]
    magic: bool,

    /// Page through the query results instead.
    #[arg(long = "no-magic", overrides_with = "magic")]
    no_magic: bool,

    /// Stage every batch but only report the archive names.
    #[arg(long, visible_alias = "dry-run")]
    dryrun: bool,

    #[arg(long, default_value = ".")]
    output_dir: Utf8PathBuf,

    /// Transfer bucket name.
    #[arg(long)]
    bucket: Option<String>,
}

impl GetArgs {
    /// `--magic` and `--no-magic` override each other; magic is the default.
    fn use_magic(&self) -> bool {
        self.magic || !self.no_magic
    }
}

#[derive(Args)]
struct PutArgs {
    /// MEF archive filename.
    filename: PathBuf,

    #[arg(long, value_enum, default_value_t = ImportMode::Record)]
    mode: ImportMode,

    #[arg(long)]
    url: Option<String>,

    #[arg(long)]
    username: Option<String>,

    #[arg(long)]
    password: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<MefError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MefError) -> u8 {
    match error {
        MefError::InvalidRecordId(_)
        | MefError::InvalidQuery(_)
        | MefError::ConfigRead(_)
        | MefError::ConfigParse(_) => 2,
        err if err.is_catalog_failure() => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    match cli.command {
        Command::Get(args) => run_get(args, cli.config.as_deref(), output_mode),
        Command::Put(args) => run_put(args, cli.config.as_deref(), output_mode),
    }
}

fn connect(config: &ResolvedConfig) -> Result<App<CatalogSession>, MefError> {
    let session = CatalogSession::connect(
        &config.url,
        SessionOptions {
            credentials: config.credentials.clone(),
            timeout: config.timeout,
        },
    )?;
    let bucket = BucketManager::new(config.bucket.clone()).with_batch_size(config.bucket_batch_size);
    Ok(App::new(session, bucket))
}

fn sink_for(output_mode: OutputMode) -> &'static dyn ProgressSink {
    match output_mode {
        OutputMode::Console => &ConsoleOutput,
        OutputMode::Json => &JsonOutput,
    }
}

fn run_get(args: GetArgs, config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    // validate everything local before the first request
    let query = Query::with_overrides(args.query.as_deref())?;
    let magic = args.use_magic();
    let config = ConfigLoader::resolve(
        config,
        Overrides {
            url: args.url,
            bucket: args.bucket,
            ..Overrides::default()
        },
    )?;

    let app = connect(&config)?;
    let options = GetOptions {
        query,
        format: args.format,
        limit: args.limit,
        batch_size: batch_size_from(args.batch),
        magic,
        dry_run: args.dryrun,
        output_dir: args.output_dir,
        timestamp: chrono::Utc::now().timestamp(),
    };
    let result = app.get(options, sink_for(output_mode))?;

    if matches!(output_mode, OutputMode::Json) {
        JsonOutput::print_export(&result).into_diagnostic()?;
    }
    Ok(())
}

fn run_put(args: PutArgs, config: Option<&str>, output_mode: OutputMode) -> miette::Result<()> {
    if !args.filename.is_file() {
        return Err(MefError::Filesystem(format!(
            "archive not found: {}",
            args.filename.display()
        ))
        .into());
    }
    let config = ConfigLoader::resolve(
        config,
        Overrides {
            url: args.url,
            username: args.username,
            password: args.password,
            ..Overrides::default()
        },
    )?;

    let app = connect(&config)?;
    let result = app.put(&args.filename, args.mode, sink_for(output_mode))?;

    if matches!(output_mode, OutputMode::Json) {
        JsonOutput::print_import(&result).into_diagnostic()?;
    }
    Ok(())
}
