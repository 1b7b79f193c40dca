use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dwh_table_registrar::db::ddl::timestamp_suffix;
use dwh_table_registrar::{RegistrarArgsBuilder, TableRegistrar};

#[derive(Parser, Clone)]
struct Args {
    /// Connection URL of the SQL server (a `jdbc:` prefix is accepted)
    #[arg(long, env = "REGISTRAR_URL")]
    url: String,

    /// Database username
    #[arg(short, long, env = "REGISTRAR_USER")]
    user: Option<String>,

    /// Database password
    #[arg(long, env = "REGISTRAR_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Print the statements without connecting to the server
    #[arg(long)]
    dry_run: bool,

    /// Quiet mode - only warnings and errors are logged
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Subcommand)]
enum Command {
    /// Register snapshot and canonical tables for a pipeline run
    CreateTables {
        /// Comma separated resource types (e.g. Patient,Observation)
        #[arg(short, long, default_value = "")]
        resources: String,

        /// Snapshot table suffix (default: current time, e.g. 2023_01_24t18_42_54_302111z)
        #[arg(short, long)]
        timestamp: Option<String>,

        /// Run directory under the parquet root
        #[arg(short = 'p', long)]
        parquet_path_suffix: String,

        /// Directory hosting the pipeline's parquet output on the server
        #[arg(long, default_value = "/dwh")]
        parquet_root: String,
    },

    /// Register a single snapshot table over a full parquet path
    CreateTable {
        /// Resource type (e.g. Patient)
        #[arg(short, long)]
        resource: String,

        /// Snapshot table suffix
        #[arg(short, long)]
        timestamp: String,

        /// Full path of the resource's parquet files
        #[arg(short = 'p', long)]
        parquet_path: String,
    },

    /// Register the canonical table of a resource over a full parquet path
    CreateCanonicalTable {
        /// Resource type (e.g. Patient)
        #[arg(short, long)]
        resource: String,

        /// Full path of the resource's parquet files
        #[arg(short = 'p', long)]
        parquet_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing based on quiet mode
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let filter = if args.quiet {
        EnvFilter::new("dwh_table_registrar=warn,sqlx=off")
    } else {
        EnvFilter::new("dwh_table_registrar=info,sqlx=off")
    };
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let mut builder = RegistrarArgsBuilder::default();
    builder.url(args.url);
    if let Some(user) = args.user {
        builder.user(user);
    }
    if let Some(password) = args.password {
        builder.password(password);
    }
    if let Command::CreateTables { parquet_root, .. } = &args.command {
        builder.parquet_root(parquet_root.as_str());
    }
    let registrar = TableRegistrar::new(builder.build()?)
        .context("Failed to configure table registrar")?;

    match args.command {
        Command::CreateTables {
            resources,
            timestamp,
            parquet_path_suffix,
            ..
        } => {
            let timestamp = timestamp.unwrap_or_else(|| timestamp_suffix(&Utc::now()));
            if args.dry_run {
                let statements =
                    registrar.plan_resource_tables(&resources, &timestamp, &parquet_path_suffix)?;
                print_plan(&statements);
            } else {
                registrar
                    .create_resource_tables(&resources, &timestamp, &parquet_path_suffix)
                    .await
                    .with_context(|| {
                        format!("Failed to register tables for resources '{resources}'")
                    })?;
                if !args.quiet {
                    println!("Registered tables with suffix {timestamp}");
                }
            }
        }
        Command::CreateTable {
            resource,
            timestamp,
            parquet_path,
        } => {
            if args.dry_run {
                let sql = registrar.plan_resource_table(&resource, &timestamp, &parquet_path)?;
                print_plan(&[sql]);
            } else {
                registrar
                    .create_resource_table(&resource, &timestamp, &parquet_path)
                    .await
                    .with_context(|| format!("Failed to register snapshot table for {resource}"))?;
            }
        }
        Command::CreateCanonicalTable {
            resource,
            parquet_path,
        } => {
            if args.dry_run {
                let sql = registrar.plan_resource_canonical_table(&resource, &parquet_path)?;
                print_plan(&[sql]);
            } else {
                registrar
                    .create_resource_canonical_table(&resource, &parquet_path)
                    .await
                    .with_context(|| format!("Failed to register canonical table for {resource}"))?;
            }
        }
    }
    Ok(())
}

fn print_plan(statements: &[String]) {
    println!("DRY RUN MODE - No statements will be executed");
    println!();
    for sql in statements {
        println!("{sql};");
    }
}
