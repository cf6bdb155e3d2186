use std::{fs, path::PathBuf, str::FromStr, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use inventory_api::{
    auth::{AuthConfig, AuthService},
    config, db,
    entities::{user, UserRole},
    handlers::AppServices,
    services::users::CreateUserRequest,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "inventory", about = "Administrative tasks for the inventory service", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a staff or manager account
    CreateUser(CreateUserArgs),
    /// Delete audit entries older than the retention period
    PurgeAudits(PurgeArgs),
    /// Raise reorder notifications for products at or below their reorder level
    ReorderScan,
    /// Write every product as CSV
    ExportCsv(ExportArgs),
    /// Upsert products from a CSV file
    ImportCsv(ImportArgs),
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value = "staff", value_parser = parse_role)]
    role: UserRole,
}

#[derive(Args)]
struct PurgeArgs {
    /// Defaults to the configured retention period
    #[arg(long)]
    older_than_days: Option<i64>,
}

#[derive(Args)]
struct ExportArgs {
    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ImportArgs {
    #[arg(long)]
    file: PathBuf,
    /// Account the stock changes are attributed to
    #[arg(long = "as")]
    username: String,
}

fn parse_role(value: &str) -> Result<UserRole, String> {
    UserRole::from_str(&value.to_ascii_lowercase())
        .map_err(|_| format!("unknown role '{value}' (expected staff or manager)"))
}

struct CliContext {
    config: config::AppConfig,
    db: Arc<db::DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&config)));
        let services = AppServices::new(db.clone(), auth_service, &config);

        Ok(Self {
            config,
            db,
            services,
        })
    }

    async fn user_id(&self, username: &str) -> Result<i32> {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(self.db.as_ref())
            .await?
            .map(|u| u.id)
            .ok_or_else(|| anyhow!("no account named '{username}'"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::CreateUser(args) => {
            let created = context
                .services
                .users
                .create_user(CreateUserRequest {
                    username: args.username,
                    email: args.email,
                    password: args.password,
                    role: Some(args.role),
                })
                .await
                .context("failed to create account")?;
            render(cli.json, &created, || {
                format!("Created {} account '{}' (id {})", created.role, created.username, created.id)
            })?;
        }
        Commands::PurgeAudits(args) => {
            let days = args
                .older_than_days
                .unwrap_or(context.config.audit_retention_days);
            let summary = context.services.audit.purge(days).await?;
            render(cli.json, &summary, || {
                format!(
                    "Deleted {} audit entries created before {}",
                    summary.deleted, summary.cutoff
                )
            })?;
        }
        Commands::ReorderScan => {
            let summary = context.services.notifications.reorder_scan().await?;
            render(cli.json, &summary, || {
                format!(
                    "{} products at or below reorder level, {} notifications created",
                    summary.products_below_reorder_level, summary.notifications_created
                )
            })?;
        }
        Commands::ExportCsv(args) => {
            let csv = context.services.bulk.export_csv().await?;
            match args.output {
                Some(path) => {
                    fs::write(&path, csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("Products exported to {}", path.display());
                }
                None => print!("{csv}"),
            }
        }
        Commands::ImportCsv(args) => {
            let data = fs::read(&args.file)
                .with_context(|| format!("failed to read {}", args.file.display()))?;
            let user_id = context.user_id(&args.username).await?;
            let summary = context.services.bulk.import_csv(&data, user_id).await?;
            render(cli.json, &summary, || {
                let mut out = format!(
                    "{} rows: {} created, {} updated, {} unchanged, {} failed",
                    summary.total_rows,
                    summary.created,
                    summary.updated,
                    summary.unchanged,
                    summary.failed
                );
                for error in &summary.errors {
                    out.push_str(&format!("\n- line {}: {}", error.line, error.message));
                }
                out
            })?;
        }
    }

    let CliContext {
        db: pool, services, ..
    } = context;
    drop(services);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        db::close_pool(pool).await?;
    }
    Ok(())
}

fn render<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}
