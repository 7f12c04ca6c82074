use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use csv_to_mongo::config::{CONNECTION_URI_VAR, TLS_CA_FILE_VAR};
use csv_to_mongo::helpers::profiling::RunProfile;
use csv_to_mongo::{
    ConfigError, CsvLoader, Inserter, LoadOptions, MongoConnector, MongoSettings, RecordSchema,
    Result, Source,
};

/// Import a CSV file into a MongoDB collection.
#[derive(Parser)]
#[command(name = "csv-to-mongo", version, long_about = None)]
struct Cli {
    /// CSV to import: a local path or s3://<bucket>/<key>.
    #[arg(long, default_value = "Network_Data/phisingData.csv")]
    file: Source,

    /// Target database.
    #[arg(long, default_value = "CHARUKAGUN")]
    database: String,

    /// Target collection.
    #[arg(long, default_value = "NetworkData")]
    collection: String,

    /// Connection URI (mongodb:// or mongodb+srv://).
    #[arg(long, env = CONNECTION_URI_VAR, hide_env_values = true)]
    mongo_url: Option<String>,

    /// CA bundle used instead of the bundled trust roots.
    #[arg(long, env = TLS_CA_FILE_VAR)]
    tls_ca_file: Option<PathBuf>,

    /// Field delimiter.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Keep every non-null cell as a string.
    #[arg(long)]
    no_infer_types: bool,

    /// JSON Schema each record must satisfy; failing rows are skipped.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Log format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "csv_to_mongo=info",
        1 => "csv_to_mongo=debug",
        _ => "csv_to_mongo=trace,mongodb=debug",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => fmt().with_env_filter(env_filter).with_target(false).init(),
        LogFormat::Json => fmt().json().with_env_filter(env_filter).init(),
    }
}

fn settings(cli: &Cli) -> std::result::Result<MongoSettings, ConfigError> {
    let uri = cli
        .mongo_url
        .clone()
        .ok_or_else(|| ConfigError::MissingVariable(CONNECTION_URI_VAR.to_string()))?;
    let settings = MongoSettings::new(uri)?;
    Ok(match &cli.tls_ca_file {
        Some(path) => settings.with_tls_ca_file(path),
        None => settings,
    })
}

fn delimiter(cli: &Cli) -> std::result::Result<u8, ConfigError> {
    u8::try_from(cli.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| ConfigError::InvalidDelimiter(cli.delimiter))
}

async fn run(cli: Cli) -> Result<()> {
    let profile = RunProfile::start();

    // Configuration is validated before touching the file or the network.
    let inserter = Inserter::new(settings(&cli)?, MongoConnector);
    let schema = match &cli.schema {
        Some(path) => Some(RecordSchema::from_file(path).await?),
        None => None,
    };
    let loader = CsvLoader::new(LoadOptions {
        delimiter: delimiter(&cli)?,
        infer_types: !cli.no_infer_types,
    });

    let mut records = loader.load_source(&cli.file).await?;
    println!("Loaded {} records from CSV", records.len());

    if let Some(schema) = &schema {
        let (valid, rejected) = schema.retain_valid(records);
        if rejected > 0 {
            warn!(rejected, "skipping records that failed schema validation");
        }
        records = valid;
    }

    let n = inserter
        .insert(&records, &cli.database, &cli.collection)
        .await?;
    println!("Inserted {n} records");

    let (elapsed, memory_kb) = profile.finish();
    info!(?elapsed, memory_kb, "import finished");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        eprintln!("{e}");
        return Err(e.into());
    }
    Ok(())
}
