use anyhow::{Context, Result, bail};
use clap::Parser;
use openapi_grpc::incompat::{self, IncompatibilityClassification};
use openapi_grpc::{CompatibilityReport, Config, GeneratedFiles, ReportMode};
use protobuf::Message;
use protobuf::descriptor::FileDescriptorSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "openapi-grpc")]
#[command(about = "Generate gRPC descriptors from OpenAPI v3 documents and report incompatibilities")]
#[command(version)]
struct Args {
    #[arg(long, global = true, help = "Path to a YAML configuration file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, default_value = ".", help = "Directory for generated files")]
    output: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Generate a FileDescriptorSet for an OpenAPI document")]
    Generate {
        #[arg(help = "Path to the OpenAPI document")]
        file: PathBuf,
        #[arg(long, help = "Package name (defaults to the file name)")]
        package: Option<String>,
        #[arg(long, help = "Print the descriptor fingerprint")]
        fingerprint: bool,
    },
    #[command(about = "Scan an OpenAPI document for gRPC incompatibilities")]
    Report {
        #[arg(help = "Path to the OpenAPI document")]
        file: PathBuf,
        #[arg(long, help = "Include source positions and hints")]
        detailed: bool,
        #[arg(long, value_delimiter = ',', help = "Classifications to exclude (comma-separated)")]
        except: Vec<IncompatibilityClassification>,
    },
    #[command(about = "Aggregate incompatibilities of every document in a directory")]
    Analyze {
        #[arg(help = "Directory to scan")]
        dir: PathBuf,
    },
    #[command(about = "Run as a plugin: no parameters generates, 'report=1|2' scans")]
    Plugin {
        #[arg(help = "Path to the OpenAPI document")]
        file: PathBuf,
        #[arg(long = "param", help = "Plugin parameter as name=value")]
        params: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory '{}'", args.output.display()))?;

    match args.command {
        Commands::Generate {
            file,
            package,
            fingerprint,
        } => {
            if package.is_some() {
                config.generate.package = package;
            }
            let generated = openapi_grpc::generate_descriptors(&file, &config.generate)?;
            write_descriptors(&args.output, &generated)?;
            if fingerprint {
                println!("{}", openapi_grpc::descriptor_fingerprint(&generated.descriptor_set)?);
            }
        }
        Commands::Report { file, detailed, except } => {
            if detailed {
                config.report.mode = ReportMode::Detailed;
            }
            config.report.except_classifications.extend(except);
            let report = openapi_grpc::report_file(&file, &config.report)?;
            write_report(&args.output, &file, &report)?;
            if let CompatibilityReport::Base(report) = &report {
                if report.has_failures() {
                    std::process::exit(1);
                }
            }
        }
        Commands::Analyze { dir } => {
            let analysis = incompat::analyze_directory(&dir, &config.report.except_classifications)?;
            let name = dir
                .canonicalize()
                .ok()
                .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "root".to_string());
            let path = args.output.join(format!("{name}_analysis.json"));
            fs::write(&path, serde_json::to_string_pretty(&analysis)?)
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            info!(path = %path.display(), "wrote analysis");
        }
        Commands::Plugin { file, params } => match params.as_slice() {
            [] => {
                let generated = openapi_grpc::generate_descriptors(&file, &config.generate)?;
                write_descriptors(&args.output, &generated)?;
            }
            [param] => {
                let (name, value) = param
                    .split_once('=')
                    .with_context(|| format!("Malformed parameter '{param}', expected name=value"))?;
                config.report.mode = ReportMode::from_plugin_parameter(name, value)?;
                let report = openapi_grpc::report_file(&file, &config.report)?;
                write_report(&args.output, &file, &report)?;
            }
            _ => bail!("Expected at most one parameter, got {}", params.len()),
        },
    }

    Ok(())
}

/// Write the primary set and one set per symbolic reference, each named
/// after the package of its last file.
fn write_descriptors(output: &Path, generated: &GeneratedFiles) -> Result<()> {
    write_descriptor_set(output, &generated.descriptor_set)?;
    for set in &generated.symbolic_sets {
        write_descriptor_set(output, set)?;
    }
    Ok(())
}

fn write_descriptor_set(output: &Path, set: &FileDescriptorSet) -> Result<()> {
    let package = set.file.last().map(|f| f.package()).context("Empty descriptor set")?;
    let path = output.join(format!("{package}.descr"));
    let bytes = set.write_to_bytes().context("Failed to serialize descriptor set")?;
    fs::write(&path, bytes).with_context(|| format!("Failed to write '{}'", path.display()))?;
    info!(path = %path.display(), files = set.file.len(), "wrote descriptor set");
    Ok(())
}

fn write_report(output: &Path, source: &Path, report: &CompatibilityReport) -> Result<()> {
    let name = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .context("Input path has no file name")?;
    let path = output.join(format!("{name}_compatibility.json"));
    fs::write(&path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    info!(path = %path.display(), incompatibilities = report.len(), "wrote compatibility report");
    Ok(())
}
