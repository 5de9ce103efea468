//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use semtab_core::{
    ExtendRequest, ExtensionParams, PassOutcome, ProgressReporter, RowWarning, ServiceCatalog,
    TableIdentity,
};
use semtab_services::ServiceClient;
use semtab_shared::{
    AppConfig, ExtensionResponse, ReconciliationEntry, ServiceConfig, ServiceDescriptor,
    TableDocument, init_config, load_config, validate_token,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// semtab: semantic enrichment of tables.
#[derive(Parser)]
#[command(
    name = "semtab",
    version,
    about = "Reconcile table columns against knowledge bases and extend tables with entity properties.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where the written table and backend payload go.
#[derive(clap::Args)]
pub(crate) struct OutputArgs {
    /// Write the new table here instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Also write the backend table-update payload to this file.
    #[arg(long)]
    pub backend_payload: Option<PathBuf>,

    /// Override the table id sent in the backend payload.
    #[arg(long)]
    pub table_id: Option<String>,

    /// Override the dataset id sent in the backend payload.
    #[arg(long)]
    pub dataset_id: Option<String>,

    /// Override the table name sent in the backend payload.
    #[arg(long)]
    pub table_name: Option<String>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Reconcile one column of a table.
    Reconcile {
        /// Table document (JSON).
        #[arg(short, long)]
        table: PathBuf,

        /// Column to reconcile.
        #[arg(short, long)]
        column: String,

        /// Reconciliator id, e.g. geonames.
        #[arg(short, long)]
        reconciliator: String,

        /// Reconciliator catalog (JSON) to use instead of fetching it.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Saved reconciliation response (JSON); skips the service call.
        #[arg(long, requires = "catalog")]
        response: Option<PathBuf>,

        /// Print the request body and exit.
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Add columns derived from a reconciled column.
    Extend {
        /// Table document (JSON).
        #[arg(short, long)]
        table: PathBuf,

        /// Reconciled column whose entities are extended.
        #[arg(short, long)]
        column: String,

        /// Extender id, e.g. meteoPropertiesOpenMeteo.
        #[arg(short, long)]
        extender: String,

        /// Property to extend (repeatable).
        #[arg(short, long = "property")]
        properties: Vec<String>,

        /// Name for each response column, in order (repeatable).
        #[arg(short = 'n', long = "new-column", required = true)]
        new_columns: Vec<String>,

        /// Column whose labels are sent as per-row dates.
        #[arg(long)]
        date_column: Option<String>,

        /// Weather parameter (repeatable). Defaults to the config value.
        #[arg(long = "weather-param")]
        weather_params: Vec<String>,

        /// Decimal format (repeatable). Defaults to the config value.
        #[arg(long = "decimal-format")]
        decimal_format: Vec<String>,

        /// Reconciliator catalog (JSON) to use instead of fetching it.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Saved extension response (JSON); skips the service call.
        #[arg(long, requires = "catalog")]
        response: Option<PathBuf>,

        /// Print the request body and exit.
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the services offered by the backend.
    Services {
        #[command(subcommand)]
        action: ServicesAction,

        /// Print the raw descriptors as JSON.
        #[arg(long, global = true)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Service catalog subcommands.
#[derive(Subcommand)]
pub(crate) enum ServicesAction {
    /// List reconciliators.
    Reconciliators,
    /// List extenders.
    Extenders,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "semtab=info",
        1 => "semtab=debug",
        _ => "semtab=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Reconcile {
            table,
            column,
            reconciliator,
            catalog,
            response,
            dry_run,
            output,
        } => {
            cmd_reconcile(
                &table,
                &column,
                &reconciliator,
                catalog.as_deref(),
                response.as_deref(),
                dry_run,
                &output,
            )
            .await
        }
        Command::Extend {
            table,
            column,
            extender,
            properties,
            new_columns,
            date_column,
            weather_params,
            decimal_format,
            catalog,
            response,
            dry_run,
            output,
        } => {
            let config = load_config()?;
            let params = ExtensionParams {
                column_name: column,
                service_id: extender,
                properties,
                date_column,
                weather_params: or_default(weather_params, &config.extension.weather_params),
                decimal_format: or_default(decimal_format, &config.extension.decimal_format),
            };
            let request = ExtendRequest {
                params,
                new_column_names: new_columns,
            };
            cmd_extend(
                &config,
                &table,
                &request,
                catalog.as_deref(),
                response.as_deref(),
                dry_run,
                &output,
            )
            .await
        }
        Command::Services { action, json } => cmd_services(action, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn or_default(given: Vec<String>, configured: &[String]) -> Vec<String> {
    if given.is_empty() {
        configured.to_vec()
    } else {
        given
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_reconcile(
    table_path: &Path,
    column: &str,
    reconciliator: &str,
    catalog_path: Option<&Path>,
    response_path: Option<&Path>,
    dry_run: bool,
    output: &OutputArgs,
) -> Result<()> {
    let doc: TableDocument = read_json(table_path)?;

    if dry_run {
        let request = semtab_core::reconciliation_payload(&doc, column, reconciliator)?;
        return print_json(&request);
    }

    info!(column, reconciliator, "reconciling column");

    let outcome = match response_path {
        Some(response_path) => {
            let catalog = read_catalog(catalog_path)?;
            let service = find_service(&catalog, reconciliator, "reconciliator")?;
            let entries: Vec<ReconciliationEntry> = read_json(response_path)?;
            semtab_core::apply_reconciliation(&doc, column, &entries, service)?
        }
        None => {
            let client = online_client()?;
            let reporter = CliProgress::new();
            semtab_core::reconcile(&client, &doc, column, reconciliator, &reporter).await?
        }
    };

    finish(outcome, column, output)
}

async fn cmd_extend(
    config: &AppConfig,
    table_path: &Path,
    request: &ExtendRequest,
    catalog_path: Option<&Path>,
    response_path: Option<&Path>,
    dry_run: bool,
    output: &OutputArgs,
) -> Result<()> {
    let doc: TableDocument = read_json(table_path)?;
    let column = request.params.column_name.as_str();

    if dry_run {
        let payload = semtab_core::extension_payload(&doc, &request.params)?;
        print_warnings(&payload.warnings);
        return print_json(&payload.output);
    }

    info!(
        column,
        extender = %request.params.service_id,
        new_columns = request.new_column_names.len(),
        "extending table"
    );

    let outcome = match response_path {
        Some(response_path) => {
            let reconciliators = ServiceCatalog::new(read_catalog(catalog_path)?);
            let response: ExtensionResponse = read_json(response_path)?;
            semtab_core::apply_extension(&doc, &response, &request.new_column_names, &reconciliators)?
        }
        None => {
            validate_token(config)?;
            let client = ServiceClient::new(&ServiceConfig::from(config))?;
            let reporter = CliProgress::new();
            semtab_core::extend(&client, &doc, request, &reporter).await?
        }
    };

    finish(outcome, column, output)
}

async fn cmd_services(action: ServicesAction, json: bool) -> Result<()> {
    let client = online_client()?;
    let services = match action {
        ServicesAction::Reconciliators => client.reconciliators().await?,
        ServicesAction::Extenders => client.extenders().await?,
    };

    if json {
        return print_json(&services);
    }

    let catalog = ServiceCatalog::new(services);
    println!();
    for summary in catalog.summaries() {
        println!("  {:<32} {:<28} {}", summary.id, summary.relative_url, summary.name);
    }
    println!();
    println!("  {} service(s)", catalog.len());
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn online_client() -> Result<ServiceClient> {
    let config = load_config()?;
    validate_token(&config)?;
    Ok(ServiceClient::new(&ServiceConfig::from(&config))?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).wrap_err_with(|| format!("failed to parse {}", path.display()))
}

fn read_catalog(path: Option<&Path>) -> Result<Vec<ServiceDescriptor>> {
    let path = path.ok_or_else(|| eyre!("--catalog is required with --response"))?;
    read_json(path)
}

fn find_service<'a>(
    services: &'a [ServiceDescriptor],
    id: &str,
    what: &str,
) -> Result<&'a ServiceDescriptor> {
    services
        .iter()
        .find(|s| s.id == id)
        .ok_or_else(|| eyre!("{what} '{id}' is not in the catalog"))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    std::fs::write(path, text).wrap_err_with(|| format!("failed to write {}", path.display()))
}

/// Stamp, write, and summarize the table produced by a pass.
fn finish(outcome: PassOutcome<TableDocument>, column: &str, output: &OutputArgs) -> Result<()> {
    let PassOutcome {
        output: mut doc,
        warnings,
    } = outcome;
    semtab_core::touch(&mut doc, Utc::now());

    if let Some(path) = &output.backend_payload {
        let identity = TableIdentity {
            id: output.table_id.clone(),
            id_dataset: output.dataset_id.clone(),
            name: output.table_name.clone(),
        };
        let payload = semtab_core::backend_update_payload(&doc, column, Some(identity));
        write_json(path, &payload)?;
        info!(path = %path.display(), "backend payload written");
    }

    match &output.out {
        Some(path) => {
            write_json(path, &doc)?;
            eprintln!();
            eprintln!("  Table written to {}", path.display());
            eprintln!("  Columns: {}", doc.table.n_cols);
            eprintln!("  Rows:    {}", doc.table.n_rows);
            eprintln!("  Annotated in {column}: {}", doc.annotated_cells(column));
        }
        None => print_json(&doc)?,
    }

    print_warnings(&warnings);
    Ok(())
}

fn print_warnings(warnings: &[RowWarning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("  {} warning(s):", warnings.len());
    for w in warnings {
        let row = w.row_id.as_deref().unwrap_or("-");
        eprintln!("    [{:?}] row {row}, column {}: {}", w.kind, w.column, w.message);
    }
    eprintln!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _warnings: &[RowWarning]) {
        self.spinner.finish_and_clear();
    }
}
