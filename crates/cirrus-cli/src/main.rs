use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cirrus_cli::loader::parse_param;
use cirrus_cli::output::{emit, render_report};
use cirrus_cli::{commands, Format, Overrides, ProjectConfig};

#[derive(Parser)]
#[command(name = "cirrus")]
#[command(about = "Parse, resolve and validate CloudFormation-style templates", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    /// Project file (defaults to ./cirrus.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a template and list what it declares
    Parse {
        /// Template file (YAML)
        #[arg(env = "CIRRUS_TEMPLATE")]
        template: Option<PathBuf>,

        /// Print the canonical YAML form instead of a summary
        #[arg(long)]
        canonical: bool,

        /// Deepest nesting accepted by the parser
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Resolve a template against parameter values
    Resolve {
        #[command(flatten)]
        resolve: ResolveArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },

    /// Resolve a template and check it against a policy
    Validate {
        #[command(flatten)]
        resolve: ResolveArgs,

        /// Policy file (YAML or JSON)
        #[arg(short, long, env = "CIRRUS_POLICY")]
        policy: Option<PathBuf>,

        /// Output report file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ResolveArgs {
    /// Template file (YAML)
    #[arg(env = "CIRRUS_TEMPLATE")]
    template: Option<PathBuf>,

    /// Parameter value, repeatable
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, cirrus_core::Value)>,

    /// Value of AWS::Region
    #[arg(long, env = "CIRRUS_REGION")]
    region: Option<String>,

    /// Value of AWS::StackName
    #[arg(long)]
    stack_name: Option<String>,

    /// Deepest evaluation nesting
    #[arg(long)]
    max_depth: Option<usize>,
}

impl ResolveArgs {
    fn into_overrides(self, policy: Option<PathBuf>) -> Overrides {
        Overrides {
            template: self.template,
            policy,
            region: self.region,
            stack_name: self.stack_name,
            max_depth: self.max_depth,
            parameters: self.params,
        }
    }
}

fn project_config(path: Option<&PathBuf>) -> Result<ProjectConfig> {
    match path {
        Some(path) => ProjectConfig::load(path),
        None => Ok(ProjectConfig::discover(&std::env::current_dir()?)?.unwrap_or_default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug) // Show target module in debug mode
        .with_writer(std::io::stderr)
        .init();

    let project = project_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Parse {
            template,
            canonical,
            max_depth,
        } => {
            let config = project.apply(Overrides {
                template,
                max_depth,
                ..Default::default()
            });
            println!("{}", commands::parse(&config, canonical)?);
        }
        Commands::Resolve { resolve, format } => {
            let config = project.apply(resolve.into_overrides(None));
            println!("{}", commands::resolve(&config, format)?);
        }
        Commands::Validate {
            resolve,
            policy,
            output,
            json,
        } => {
            let config = project.apply(resolve.into_overrides(policy));
            let report = commands::validate(&config)?;
            emit(&render_report(&report, json)?, output.as_deref())?;

            if !report.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
