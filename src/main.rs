use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand, ValueEnum};
use kube::CustomResourceExt;
use routegroup_converter::{
    common::{RouteExpressionParser, RouteGroup},
    services::StaticDefaultFilters,
    ClusterState, ClusterStateSnapshot, Configuration, Converter, ConverterOptions,
};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

pub enum Guard {
    Appender(WorkerGuard),
    Console,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Converts the route groups of a cluster snapshot into routes
    Convert {
        #[arg(long)]
        snapshot_file: PathBuf,
        #[arg(long)]
        with_config_file: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Output::Routes)]
        output: Output,
    },
    /// Prints the RouteGroup custom resource definition
    Crd,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Routes,
    Json,
}

fn init_tracing_logging(configuration: &Configuration) -> Guard {
    let console_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()));
    let console_layer = fmt::layer()
        .event_format(fmt::format().compact())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::NONE)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|meta| !meta.is_span()))
        .with_filter(console_filter);

    let Some(log_file) = configuration.log_file.as_ref() else {
        Registry::default().with(console_layer).init();
        return Guard::Console;
    };

    let directory = log_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = log_file.file_name().unwrap_or(OsStr::new("routegroup-converter.log"));
    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
    let file_filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_FILE_LOG").unwrap_or_else(|_| "debug".to_owned()));
    let file_layer = fmt::layer()
        .with_writer(non_blocking_appender)
        .with_span_events(FmtSpan::NONE)
        .with_target(true)
        .with_ansi(false)
        .with_filter(filter::filter_fn(|meta| !meta.is_span()))
        .with_filter(file_filter);

    Registry::default().with(console_layer).with(file_layer).init();
    Guard::Appender(guard)
}

fn load_configuration(path: Option<&Path>) -> routegroup_converter::Result<Configuration> {
    match path {
        Some(path) => Ok(serde_yaml::from_str(&std::fs::read_to_string(path)?)?),
        None => Ok(Configuration::default()),
    }
}

#[allow(clippy::print_stdout)]
fn convert(snapshot_file: &Path, configuration: &Configuration, output: Output) -> routegroup_converter::Result<()> {
    let snapshot: ClusterStateSnapshot = serde_yaml::from_str(&std::fs::read_to_string(snapshot_file)?)?;
    let state = ClusterState::from(snapshot);

    let parser = Arc::new(RouteExpressionParser);
    let default_filters = StaticDefaultFilters::from_configuration(&configuration.default_filters, parser.as_ref())?;
    let converter = Converter::builder()
        .options(ConverterOptions::from(configuration))
        .parser(parser)
        .default_filters(Arc::new(default_filters))
        .build();

    let routes = converter.convert(&state);
    info!("Converted {} route groups into {} routes", state.route_groups().len(), routes.len());
    match output {
        Output::Routes => {
            for route in &routes {
                println!("{route}");
            }
        },
        Output::Json => println!("{}", serde_json::to_string_pretty(&routes)?),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn main() -> routegroup_converter::Result<()> {
    let args = CommandArgs::parse();
    match args.command {
        Command::Convert { snapshot_file, with_config_file, output } => {
            let configuration = load_configuration(with_config_file.as_deref())?;
            let _guard = init_tracing_logging(&configuration);
            configuration.validate()?;
            convert(&snapshot_file, &configuration, output)
        },
        Command::Crd => {
            print!("{}", serde_yaml::to_string(&RouteGroup::crd())?);
            Ok(())
        },
    }
}
