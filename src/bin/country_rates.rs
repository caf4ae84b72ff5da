use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use country_rates::{CountryService, Settings, server, storage};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "country-rates",
    version,
    about = "Fetch, enrich, store & serve country data with USD exchange rates"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve(ServeArgs),
    /// Run one refresh against the upstream APIs and print the report.
    Refresh,
    /// Write the stored countries to a CSV or JSON file.
    Export(ExportArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// SQLite database file.
    #[arg(long, env = "COUNTRY_RATES_DB", default_value = "countries.db", global = true)]
    database: PathBuf,
    /// Where the summary PNG is cached.
    #[arg(long, env = "COUNTRY_RATES_CACHE", default_value = "cache/summary.png", global = true)]
    cache: PathBuf,
    /// Countries endpoint.
    #[arg(long, env = "COUNTRY_RATES_COUNTRIES_URL", global = true)]
    countries_url: Option<String>,
    /// Exchange-rate endpoint.
    #[arg(long, env = "COUNTRY_RATES_RATES_URL", global = true)]
    rates_url: Option<String>,
    /// Upstream request timeout in seconds.
    #[arg(long, env = "COUNTRY_RATES_TIMEOUT_SECS", default_value_t = 600, global = true)]
    timeout_secs: u64,
    /// TrueType font for the summary image (system fonts are searched when omitted).
    #[arg(long, env = "COUNTRY_RATES_FONT", global = true)]
    font: Option<PathBuf>,
    /// Seed for the GDP multiplier (random when omitted).
    #[arg(long, env = "COUNTRY_RATES_SEED", global = true)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "COUNTRY_RATES_BIND", default_value = "0.0.0.0:8080")]
    bind: String,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Output file (format inferred by --format or extension).
    #[arg(long)]
    out: PathBuf,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
}

impl CommonArgs {
    fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            database_path: self.database.clone(),
            cache_path: self.cache.clone(),
            countries_url: self
                .countries_url
                .clone()
                .unwrap_or(defaults.countries_url),
            rates_url: self.rates_url.clone().unwrap_or(defaults.rates_url),
            timeout_secs: self.timeout_secs,
            font_path: self.font.clone(),
            seed: self.seed,
            bind: defaults.bind,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut settings = cli.common.settings();
    match cli.cmd {
        Command::Serve(args) => {
            settings.bind = args.bind;
            cmd_serve(&settings)
        }
        Command::Refresh => cmd_refresh(&settings),
        Command::Export(args) => cmd_export(&settings, args),
    }
}

fn cmd_serve(settings: &Settings) -> Result<()> {
    let service = CountryService::from_settings(settings)?;
    let runtime = tokio::runtime::Runtime::new().context("start tokio runtime")?;
    // The service owns a blocking HTTP client; its last handle is dropped outside the runtime.
    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&settings.bind)
            .await
            .with_context(|| format!("bind {}", settings.bind))?;
        server::serve(listener, service.clone())
            .await
            .context("serve")
    });
    drop(runtime);
    drop(service);
    served
}

fn cmd_refresh(settings: &Settings) -> Result<()> {
    let service = CountryService::from_settings(settings)?;
    let report = service.refresh()?;
    println!(
        "upserted={} skipped={} failed={} total={}",
        report.upserted, report.skipped, report.failed, report.total
    );
    Ok(())
}

fn cmd_export(settings: &Settings, args: ExportArgs) -> Result<()> {
    let service = CountryService::from_settings(settings)?;
    let records = service.store().all()?;
    let fmt = match args.format {
        Some(OutFormat::Csv) => "csv",
        Some(OutFormat::Json) => "json",
        None => args.out.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
    }
    .to_ascii_lowercase();
    match fmt.as_str() {
        "csv" => storage::save_csv(&records, &args.out)?,
        "json" => storage::save_json(&records, &args.out)?,
        other => anyhow::bail!("unsupported format: {}", other),
    }
    eprintln!("Saved {} rows to {}", records.len(), args.out.display());
    Ok(())
}
