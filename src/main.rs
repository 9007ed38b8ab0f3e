use std::process::ExitCode;
use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::{error, info};
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

use payroll_pipeline::config::Config;
use payroll_pipeline::docs::ApiDoc;
use payroll_pipeline::model::agency::AgencyMaster;
use payroll_pipeline::model::employee::EmployeeMaster;
use payroll_pipeline::model::entity::SourceEntity;
use payroll_pipeline::model::payroll::PayrollRecord;
use payroll_pipeline::model::summary::{SUMMARY_TABLE, SummaryRecord};
use payroll_pipeline::model::title::TitleMaster;
use payroll_pipeline::pipeline::sink::{DualSinkWriter, SummarySink};
use payroll_pipeline::pipeline::{Pipeline, RunTrigger};
use payroll_pipeline::routes;
use payroll_pipeline::scheduler::run_schedule;
use payroll_pipeline::service::PipelineService;
use payroll_pipeline::store::{MySqlStore, StoreError};
use payroll_pipeline::utils::logging;
use payroll_pipeline::utils::summary_cache::SummaryCache;

#[derive(Parser)]
#[command(name = "payroll-pipeline", version, about = "Payroll ingestion and yearly agency summary")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run the pipeline once and exit
    Run {
        /// Overrides MIN_FISCAL_YEAR for this run
        #[arg(long)]
        min_fiscal_year: Option<String>,
    },
}

async fn ensure_staging_tables(store: &MySqlStore) -> Result<(), StoreError> {
    store
        .ensure_table::<EmployeeMaster>(SourceEntity::Employee.table())
        .await?;
    store
        .ensure_table::<AgencyMaster>(SourceEntity::Agency.table())
        .await?;
    store
        .ensure_table::<TitleMaster>(SourceEntity::Title.table())
        .await?;
    store
        .ensure_table::<PayrollRecord>(SourceEntity::Payroll2020.table())
        .await?;
    store
        .ensure_table::<PayrollRecord>(SourceEntity::Payroll2021.table())
        .await?;
    store.ensure_table::<SummaryRecord>(SUMMARY_TABLE).await
}

async fn build_service(config: &Config) -> anyhow::Result<Arc<PipelineService<MySqlStore>>> {
    let staging = MySqlStore::connect("primary", &config.database_url)
        .await
        .context("connecting to DATABASE_URL")?;
    let mirror = MySqlStore::connect("mirror", &config.mirror_database_url)
        .await
        .context("connecting to MIRROR_DATABASE_URL")?;

    ensure_staging_tables(&staging)
        .await
        .context("creating staging tables")?;
    mirror
        .ensure_table::<SummaryRecord>(SUMMARY_TABLE)
        .await
        .context("creating mirror summary table")?;

    let staging = Arc::new(staging);
    let sinks = DualSinkWriter::new(
        SummarySink::new("primary", staging.clone()),
        SummarySink::new("mirror", Arc::new(mirror)),
    );
    let pipeline = Pipeline::new(staging, sinks, config.pipeline_settings());

    Ok(Arc::new(PipelineService::new(
        pipeline,
        SummaryCache::new(config.summary_cache_ttl),
    )))
}

async fn serve(config: Config, service: Arc<PipelineService<MySqlStore>>) -> anyhow::Result<()> {
    let trigger_limit = routes::trigger_limit(config.rate_trigger_per_min)?;

    if let Some(period) = config.schedule {
        actix_web::rt::spawn(run_schedule(service.clone(), period));
    }

    info!(addr = %config.server_addr, "Server starting...");

    let service = Data::from(service);
    let api_prefix = config.api_prefix.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(service.clone())
            .configure(|cfg| routes::configure::<MySqlStore>(cfg, &api_prefix, &trigger_limit))
    })
    .bind(&config.server_addr)
    .with_context(|| format!("binding {}", config.server_addr))?
    .run()
    .await?;

    Ok(())
}

async fn run_once(
    service: Arc<PipelineService<MySqlStore>>,
    min_fiscal_year: Option<String>,
) -> anyhow::Result<ExitCode> {
    match service
        .trigger(RunTrigger::Cli, min_fiscal_year.as_deref())
        .await
    {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Pipeline run failed");
            if let Some(report) = service.latest_report() {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env().context("loading configuration")?;
    let _guard = logging::init(&config.log_dir)?;

    let service = build_service(&config).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            serve(config, service).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { min_fiscal_year } => run_once(service, min_fiscal_year).await,
    }
}
