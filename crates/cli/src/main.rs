#![forbid(unsafe_code)]

use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use k8s_openapi::api::core::v1::Namespace;
use kard_dataselect::DataSelectQuery;
use kard_resource::{create_namespace, list_namespaces, KubeNamespaceClient, NamespaceList, NamespaceSpec};
use tracing::{error, info, warn};

mod settings;

use settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "kardctl", version, about = "Kard CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Namespaces on the control plane
    #[command(subcommand)]
    Ns(NsCommands),
}

#[derive(Subcommand, Debug)]
enum NsCommands {
    /// List namespaces, optionally filtered, sorted and paginated
    Ls(LsArgs),
    /// Create a namespace
    Create {
        name: String,
        /// Keep the namespace on the control plane only
        #[arg(long = "skip-auto-propagation", action = ArgAction::SetTrue)]
        skip_auto_propagation: bool,
    },
}

#[derive(Args, Debug, Default)]
struct LsArgs {
    /// Sort keys as direction,property pairs, e.g. "d,creationTimestamp,a,name"
    #[arg(long = "sort-by")]
    sort_by: Option<String>,
    /// Filters as property,value pairs, e.g. "name,team"
    #[arg(long = "filter-by")]
    filter_by: Option<String>,
    /// 1-based page number (with --items-per-page)
    #[arg(long = "page")]
    page: Option<usize>,
    #[arg(long = "items-per-page")]
    items_per_page: Option<usize>,
    #[arg(long = "offset")]
    offset: Option<usize>,
    #[arg(long = "limit")]
    limit: Option<usize>,
    /// Token printed by a previous page
    #[arg(long = "continue")]
    continue_token: Option<String>,
}

impl LsArgs {
    /// A page size or window was given; `--page` alone still needs the default size.
    fn has_window(&self) -> bool {
        self.items_per_page.is_some()
            || self.offset.is_some()
            || self.limit.is_some()
            || self.continue_token.is_some()
    }

    /// Query parameters in dashboard form; `default_page_size` applies only when no window flag is set.
    fn params(&self, default_page_size: usize) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(v) = value { params.push((key, v)); }
        };
        push("sortBy", self.sort_by.clone());
        push("filterBy", self.filter_by.clone());
        push("page", self.page.map(|p| p.to_string()));
        push("itemsPerPage", self.items_per_page.map(|n| n.to_string()));
        push("offset", self.offset.map(|n| n.to_string()));
        push("limit", self.limit.map(|n| n.to_string()));
        push("continue", self.continue_token.clone());
        if !self.has_window() && default_page_size > 0 {
            push("itemsPerPage", Some(default_page_size.to_string()));
        }
        params
    }
}

fn init_tracing() {
    let filter = std::env::var("KARD_LOG")
        .ok()
        .and_then(|env| tracing_subscriber::EnvFilter::from_str(&env).ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

/// Serve Prometheus metrics when `KARD_METRICS_ADDR` names a socket address.
fn init_metrics() {
    let Ok(addr) = std::env::var("KARD_METRICS_ADDR") else { return };
    let sock = match addr.parse::<std::net::SocketAddr>() {
        Ok(sock) => sock,
        Err(e) => {
            warn!(addr = %addr, error = %e, "KARD_METRICS_ADDR is not host:port; metrics disabled");
            return;
        }
    };
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(sock).install() {
        warn!(error = %e, "metrics exporter not installed");
        return;
    }
    info!(%sock, "serving metrics");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Ns(NsCommands::Ls(args)) => {
            let query = DataSelectQuery::from_params(args.params(settings.items_per_page))
                .context("invalid list query")?;
            info!(sort = ?query.sort(), filter = ?query.filter(), pagination = ?query.pagination(), "ns ls invoked");
            let client = KubeNamespaceClient::try_default().await.context("connect to control plane")?;
            let list = match list_namespaces(&client, &query).await {
                Ok(list) => list,
                Err(e) => {
                    error!(error = ?e, "namespace list failed");
                    return Err(e).context("list namespaces");
                }
            };
            match cli.output {
                Output::Human => print_namespaces(&list),
                Output::Json => println!("{}", serde_json::to_string_pretty(&list)?),
            }
        }
        Commands::Ns(NsCommands::Create { name, skip_auto_propagation }) => {
            let spec = NamespaceSpec::new(name).skip_auto_propagation(skip_auto_propagation);
            let labels = settings.namespace_labels();
            let client = KubeNamespaceClient::try_default().await.context("connect to control plane")?;
            if let Err(e) = create_namespace(&spec, &labels, &client).await {
                error!(error = ?e, name = %spec.name, "namespace create failed");
                return Err(e).with_context(|| format!("create namespace {}", spec.name));
            }
            match cli.output {
                Output::Human => println!("namespace/{} created", spec.name),
                Output::Json => println!("{}", serde_json::to_string_pretty(&spec)?),
            }
        }
    }

    Ok(())
}

fn print_namespaces(list: &NamespaceList) {
    println!("{:<32} {:<12} AGE", "NAME", "STATUS");
    for ns in &list.namespaces {
        let name = ns.metadata.name.as_deref().unwrap_or("");
        let status = ns.status.as_ref().and_then(|s| s.phase.as_deref()).unwrap_or("-");
        println!("{:<32} {:<12} {}", name, status, render_age(ns));
    }
    println!("total: {}", list.list_meta.total_items);
    if let Some(token) = &list.continue_token {
        println!("continue: {}", token.encode());
    }
    for w in &list.warnings {
        eprintln!("warning: {}", w);
    }
}

fn render_age(ns: &Namespace) -> String {
    match &ns.metadata.creation_timestamp {
        Some(created) => format_age(chrono::Utc::now() - created.0),
        None => "-".to_string(),
    }
}

/// Two most significant units, kubectl style: `3d4h`, `2h5m`, `7m`, `40s`.
fn format_age(age: chrono::Duration) -> String {
    let age = age.max(chrono::Duration::zero());
    if age.num_days() > 0 {
        format!("{}d{}h", age.num_days(), age.num_hours() % 24)
    } else if age.num_hours() > 0 {
        format!("{}h{}m", age.num_hours(), age.num_minutes() % 60)
    } else if age.num_minutes() > 0 {
        format!("{}m", age.num_minutes())
    } else {
        format!("{}s", age.num_seconds())
    }
}
