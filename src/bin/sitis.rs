use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sitis_consulta::cache::CacheStore;
use sitis_consulta::config::SharePointConfig;
use sitis_consulta::domain::DatasetKey;
use sitis_consulta::error::SitisError;
use sitis_consulta::graph::{DisabledRemote, GraphSession, RemoteSource};
use sitis_consulta::loader::DatasetLoader;
use sitis_consulta::output::JsonOutput;
use sitis_consulta::query::{self, Datasets, PatientReport};

#[derive(Parser)]
#[command(name = "sitis")]
#[command(about = "Read-only lookup over SITIS patient-care records")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List care attendances for a patient document")]
    Patient(PatientArgs),
    #[command(about = "List patients who received an activity")]
    Activity(ActivityArgs),
    #[command(about = "List the activity catalog")]
    Activities,
    #[command(about = "Download datasets and warm the local cache")]
    Fetch(FetchArgs),
    #[command(about = "Manage the local download cache")]
    Cache(CacheArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Single dataset to load; all four when omitted
    key: Option<DatasetKey>,
}

#[derive(Args)]
struct PatientArgs {
    document: String,

    /// Restrict the history to one activity code
    #[arg(long)]
    activity: Option<i64>,
}

#[derive(Args)]
struct ActivityArgs {
    code: i64,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Delete all cached downloads")]
    Clear,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(sitis) = report.downcast_ref::<SitisError>() {
            return ExitCode::from(map_exit_code(sitis));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &SitisError) -> u8 {
    match error {
        SitisError::DatasetUnavailable(_)
        | SitisError::PatientNotFound(_)
        | SitisError::UnknownActivity(_)
        | SitisError::InvalidDatasetKey(_) => 2,
        SitisError::Authentication(_)
        | SitisError::Resolution(_)
        | SitisError::GraphHttp(_)
        | SitisError::GraphStatus { .. } => 3,
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
    let config = SharePointConfig::from_env();
    let cache = CacheStore::new(config.cache_dir.clone());

    match cli.command {
        Commands::Cache(args) => match args.command {
            CacheCommand::Clear => {
                cache.clear().into_diagnostic()?;
                JsonOutput::print_cache_cleared().into_diagnostic()?;
                Ok(())
            }
        },
        Commands::Fetch(args) => {
            let remote = build_remote(&config);
            let mut loader = DatasetLoader::new(remote, cache, config.data_dir.clone());
            let keys = match args.key {
                Some(key) => vec![key],
                None => DatasetKey::ALL.to_vec(),
            };
            let mut summaries = Vec::with_capacity(keys.len());
            for key in keys {
                summaries.push(loader.load_summary(key).into_diagnostic()?);
            }
            JsonOutput::print_fetch(&summaries).into_diagnostic()?;
            Ok(())
        }
        Commands::Patient(args) => {
            let datasets = load_datasets(&config, cache)?;
            let patient = query::find_patient(&datasets, &args.document)
                .ok_or_else(|| SitisError::PatientNotFound(args.document.clone()))
                .into_diagnostic()?;
            let attendances =
                query::patient_attendances(&datasets, patient.patient_id, args.activity);
            let distinct_activities = {
                let mut codes: Vec<i64> =
                    attendances.iter().map(|a| a.activity_code).collect();
                codes.sort_unstable();
                codes.dedup();
                codes.len()
            };
            let report = PatientReport {
                patient,
                total_attendances: attendances.len(),
                distinct_activities,
                attendances,
            };
            JsonOutput::print_patient(&report).into_diagnostic()?;
            Ok(())
        }
        Commands::Activity(args) => {
            let datasets = load_datasets(&config, cache)?;
            let report = query::patients_for_activity(&datasets, args.code).into_diagnostic()?;
            JsonOutput::print_activity(&report).into_diagnostic()?;
            Ok(())
        }
        Commands::Activities => {
            let datasets = load_datasets(&config, cache)?;
            let catalog = query::activity_catalog(&datasets);
            JsonOutput::print_catalog(&catalog).into_diagnostic()?;
            Ok(())
        }
    }
}

fn load_datasets(config: &SharePointConfig, cache: CacheStore) -> miette::Result<Datasets> {
    let remote = build_remote(config);
    let mut loader = DatasetLoader::new(remote, cache, config.data_dir.clone());
    Datasets::load(&mut loader).into_diagnostic()
}

fn build_remote(config: &SharePointConfig) -> Box<dyn RemoteSource> {
    match config.remote_settings() {
        Some((credentials, site)) => {
            match GraphSession::connect(&credentials, &site, &config.folder_path) {
                Ok(session) => Box::new(session),
                Err(err) => {
                    warn!(%err, "sharepoint unavailable, using cache and local files");
                    Box::new(DisabledRemote)
                }
            }
        }
        None => {
            info!("sharepoint credentials not configured, using cache and local files");
            Box::new(DisabledRemote)
        }
    }
}
