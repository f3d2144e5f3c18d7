//! pactum CLI - Contract testing, stubbing and backward-compatibility checks

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use pactum_core::{
    ContractManifest, ContractTest, EngineConfig, Feature, GeneratedRequest, HttpRequest, generate_schema,
    to_http_file,
};
use pactum_runner::{
    CompatibilityChecker, ContractTestRunner, ReqwestTransport, RunnerError, StubExpectation, StubResponder,
};

#[derive(Parser)]
#[command(name = "pactum")]
#[command(about = "Contract testing, stubbing and backward-compatibility checks for HTTP APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Config file (default: .pactum.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output (debug logging unless PACTUM_LOG/RUST_LOG is set)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the contract's tests against a live server
    Test {
        /// Contract manifest (default: `contract` from the config)
        #[arg(long)]
        contract: Option<PathBuf>,

        /// Server to test (overrides the config)
        #[arg(long)]
        base_url: Option<String>,

        /// Expand vanilla variants and generate negative tests
        #[arg(long)]
        generative: bool,

        /// With --generative, skip negative tests
        #[arg(long)]
        positive_only: bool,
    },

    /// Check that a newer contract is backward compatible with an older one
    Compat {
        /// The contract currently in use
        older: PathBuf,

        /// The candidate replacement
        newer: PathBuf,

        /// Worker threads (default: available cores)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Answer one request the way a stub server would
    Stub {
        /// Contract manifest (default: `contract` from the config)
        #[arg(long)]
        contract: Option<PathBuf>,

        /// Request as JSON (`-` for stdin)
        #[arg(long, default_value = "-")]
        request: String,

        /// JSON array of {request, response} expectations to register first
        #[arg(long)]
        expectations: Option<PathBuf>,
    },

    /// Write the generated contract tests as a .http file
    Generate {
        /// Contract manifest (default: `contract` from the config)
        #[arg(long)]
        contract: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short = 'O', long)]
        out: Option<PathBuf>,

        /// Expand vanilla variants and generate negative tests
        #[arg(long)]
        generative: bool,
    },

    /// Initialize config and a starter contract
    Init,

    /// Export JSON Schema for the contract manifest format
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("PACTUM_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::load_default()?,
    };
    let config = config.from_env()?;
    tracing::debug!(
        contract = %config.contract.display(),
        base_url = %config.base_url,
        generative = config.generative,
        "configuration loaded"
    );
    Ok(config)
}

fn load_feature(contract: Option<PathBuf>, config: &EngineConfig) -> Result<Feature> {
    let path = contract.unwrap_or_else(|| config.contract.clone());
    ContractManifest::load_feature(&path, config).with_context(|| format!("loading contract {}", path.display()))
}

fn run(cli: Cli) -> Result<i32> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Test {
            contract,
            base_url,
            generative,
            positive_only,
        } => {
            let mut config = load_config(config_path)?;
            if let Some(base_url) = base_url {
                config.base_url = base_url;
            }
            config.generative |= generative;
            config.positive_only |= positive_only;

            let feature = load_feature(contract, &config)?;
            if cli.output == OutputFormat::Terminal {
                eprintln!("Contract: {} ({} scenarios)", feature.name, feature.scenarios().len());
                eprintln!("Server:   {}", config.base_url);
                eprintln!();
            }

            let transport = ReqwestTransport::from_config(&config)?;
            let summary = ContractTestRunner::new(feature, transport).run();

            match cli.output {
                OutputFormat::Terminal => println!("{}", summary.to_text()),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Silent => {}
            }
            Ok(summary.exit_code())
        }

        Commands::Compat { older, newer, workers } => {
            let config = load_config(config_path)?;
            let older = load_feature(Some(older), &config)?;
            let newer = load_feature(Some(newer), &config)?;

            let mut checker = CompatibilityChecker::from_config(&config);
            if let Some(workers) = workers {
                checker = checker.with_workers(workers);
            }
            let report = checker.check(&older, &newer);

            match cli.output {
                OutputFormat::Terminal => println!("{}", report.to_text()),
                OutputFormat::Json => println!("{}", report.to_json()?),
                OutputFormat::Silent => {}
            }
            Ok(if report.is_compatible() { 0 } else { 1 })
        }

        Commands::Stub {
            contract,
            request,
            expectations,
        } => {
            let config = load_config(config_path)?;
            let mut stub = StubResponder::new(load_feature(contract, &config)?);

            if let Some(path) = expectations {
                let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
                let expectations: Vec<StubExpectation> = serde_json::from_str(&text)?;
                for expectation in expectations {
                    if let Err(e) = stub.register(expectation) {
                        match e {
                            RunnerError::StubRejected(_) => {
                                eprintln!("{e}");
                                return Ok(1);
                            }
                            other => return Err(other.into()),
                        }
                    }
                }
            }

            let text = if request == "-" {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                text
            } else {
                std::fs::read_to_string(&request).with_context(|| format!("reading {request}"))?
            };
            let request: HttpRequest = serde_json::from_str(&text).context("parsing request JSON")?;
            let response = stub.respond(&request);

            if cli.output != OutputFormat::Silent {
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
            Ok(if response.status == 400 { 1 } else { 0 })
        }

        Commands::Generate {
            contract,
            out,
            generative,
        } => {
            let mut config = load_config(config_path)?;
            config.generative |= generative;
            let feature = load_feature(contract, &config)?;

            let mut requests = Vec::new();
            let mut invalid = 0;
            for test in feature.generate_contract_tests() {
                let generated = match test {
                    ContractTest::Ready(scenario) => GeneratedRequest::from_scenario(&feature, &scenario)
                        .map_err(|e| (scenario.name.clone(), e)),
                    ContractTest::Invalid { scenario, error } => Err((scenario, error)),
                };
                match generated {
                    Ok(request) => requests.push(request),
                    Err((name, error)) => {
                        eprintln!("Skipped \"{name}\": {error}");
                        invalid += 1;
                    }
                }
            }

            let content = to_http_file(&requests, "base_url");
            match out {
                Some(path) => {
                    std::fs::write(&path, &content)?;
                    if cli.output != OutputFormat::Silent {
                        eprintln!("Wrote {} requests to {}", requests.len(), path.display());
                    }
                }
                None => print!("{content}"),
            }
            Ok(if invalid == 0 { 0 } else { 1 })
        }

        Commands::Init => {
            let config_file = ".pactum.toml";
            let contract_file = "contract.yaml";
            if Path::new(config_file).exists() {
                eprintln!("{config_file} already exists");
                return Ok(1);
            }

            std::fs::write(config_file, EngineConfig::example())?;
            println!("Created {config_file}");
            if Path::new(contract_file).exists() {
                println!("Kept existing {contract_file}");
            } else {
                std::fs::write(contract_file, ContractManifest::example())?;
                println!("Created {contract_file}");
            }
            println!("\nEdit the files to configure:");
            println!("  - contract: types and scenarios of your API");
            println!("  - base_url: server to test");
            println!("  - headers: auth tokens, API keys");
            Ok(0)
        }

        Commands::Schema => {
            println!("{}", generate_schema());
            Ok(0)
        }
    }
}
