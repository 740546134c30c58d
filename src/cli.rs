#[cfg(feature = "cli")]
use crate::bundle::{find_pem_certificates, read_bundle, WriteOptions};
#[cfg(feature = "cli")]
use crate::chain::Chain;
#[cfg(feature = "cli")]
use crate::error::{Error, Result};
#[cfg(feature = "cli")]
use crate::fingerprint::compute_fingerprint;
#[cfg(feature = "cli")]
use crate::fetch::{CaptureOptions, Target, DEFAULT_PORT};
#[cfg(feature = "cli")]
use crate::render::{display_chain, format_date, role, OutputFormat};
#[cfg(feature = "cli")]
use crate::review::{review, review_raw, Decision, Prompt, Review};
#[cfg(feature = "cli")]
use crate::types::{DigestAlgorithm, RawChain, ValidityStatus};
#[cfg(feature = "cli")]
use clap::{ArgAction, Parser, Subcommand};
#[cfg(feature = "cli")]
use colored::Colorize;
#[cfg(feature = "cli")]
use std::io::{self, BufRead, Write};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::time::Duration;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "certview")]
#[command(
    version,
    about = "Capture, inspect and trust the certificate chain of a TLS server",
    long_about = None
)]
pub struct Cli {
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (-v info, -vv debug)"
    )]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        value_name = "DIGEST",
        help = "Also list this fingerprint per certificate: sha1, sha256, sha384 or sha512"
    )]
    pub fingerprint: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Capture a server's certificate chain and optionally trust it")]
    Fetch {
        #[arg(help = "Target: host, host:port, [v6]:port or https://host[:port]/")]
        target: String,

        #[arg(short, long, help = "Port, overriding any port in the target")]
        port: Option<u16>,

        #[arg(short, long, default_value = "10", help = "Connect and handshake timeout in seconds")]
        timeout: u64,

        #[arg(long, help = "Server name to send in SNI instead of the target host")]
        sni: Option<String>,

        #[arg(short, long, help = "Write the accepted chain to this trust bundle")]
        output: Option<PathBuf>,

        #[arg(long, help = "Replace an existing trust bundle")]
        overwrite: bool,

        #[arg(short, long, help = "Accept the chain without prompting")]
        yes: bool,

        #[arg(long, help = "Do not restrict bundle permissions to the owner")]
        no_protect: bool,

        #[arg(
            short,
            long,
            default_value = "pretty",
            help = "Output format: pretty or json"
        )]
        format: String,
    },

    #[command(about = "Display a trust bundle or PEM file")]
    Show {
        #[arg(help = "Bundle, PEM or DER file")]
        path: PathBuf,

        #[arg(short, long, help = "Re-order the certificates leaf-to-root")]
        assemble: bool,

        #[arg(
            short,
            long,
            default_value = "pretty",
            help = "Output format: pretty or json"
        )]
        format: String,
    },
}

/// Interactive yes/no question on stderr, answer read from stdin.
#[cfg(feature = "cli")]
pub struct StdinPrompt {
    pub path: PathBuf,
}

#[cfg(feature = "cli")]
impl Prompt for StdinPrompt {
    fn confirm(&mut self, review: &Review) -> bool {
        if !review.chain.is_complete() {
            eprintln!(
                "{}",
                "Warning: the chain does not end in a self-signed root".yellow()
            );
        }
        eprint!(
            "Trust this chain from {} and write it to {}? [y/N] ",
            review.target,
            self.path.display()
        );
        if io::stderr().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[cfg(feature = "cli")]
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let digest = cli
        .fingerprint
        .as_deref()
        .map(str::parse::<DigestAlgorithm>)
        .transpose()?;

    match cli.command {
        Commands::Fetch {
            target,
            port,
            timeout,
            sni,
            output,
            overwrite,
            yes,
            no_protect,
            format,
        } => {
            let output_format = parse_format(&format)?;
            let mut target = Target::parse(&target, DEFAULT_PORT)?;
            if let Some(port) = port {
                target.port = port;
            }

            let mut options = CaptureOptions::new().with_timeout(Duration::from_secs(timeout));
            if let Some(name) = sni {
                options = options.with_server_name(name);
            }

            eprintln!(
                "{}",
                format!("Fetching certificate chain from {}...", target).cyan()
            );
            let review = review(&target, &options)?;

            match output_format {
                OutputFormat::Pretty => {
                    println!("{}", review.rendered);
                    print_validity(&review.chain, digest);
                }
                #[cfg(feature = "json")]
                OutputFormat::Json => println!("{}", display_chain(&review.chain, output_format)?),
            }

            if let Some(path) = output {
                let write_options = WriteOptions::new()
                    .with_overwrite(overwrite)
                    .with_protect(!no_protect);

                let decision = if yes {
                    review.decide(&mut |_: &Review| true, &path, &write_options)?
                } else {
                    review.decide(&mut StdinPrompt { path: path.clone() }, &path, &write_options)?
                };

                match decision {
                    Decision::Accepted(written) => eprintln!(
                        "{}",
                        format!("Trust bundle written to {}", written.display())
                            .green()
                            .bold()
                    ),
                    Decision::Rejected => {
                        eprintln!("{}", "Chain not trusted, nothing written".yellow())
                    }
                }
            }
        }

        Commands::Show {
            path,
            assemble,
            format,
        } => {
            let output_format = parse_format(&format)?;
            let chain = if assemble {
                review_raw(path.display().to_string(), &load_raw(&path)?)?.chain
            } else {
                read_bundle(&path)?
            };

            println!("{}", display_chain(&chain, output_format)?);
            if output_format == OutputFormat::Pretty {
                print_validity(&chain, digest);
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    // RUST_LOG, when set, takes precedence over -v.
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

#[cfg(feature = "cli")]
fn parse_format(format: &str) -> Result<OutputFormat> {
    match format.to_lowercase().as_str() {
        "pretty" => Ok(OutputFormat::Pretty),
        #[cfg(feature = "json")]
        "json" => Ok(OutputFormat::Json),
        _ => Err(Error::InvalidInput(format!("Invalid format: {}", format))),
    }
}

/// PEM blocks found anywhere in the file, or the whole file as one DER.
#[cfg(feature = "cli")]
fn load_raw(path: &Path) -> Result<RawChain> {
    let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
    let found = std::str::from_utf8(&bytes)
        .map(find_pem_certificates)
        .unwrap_or_default();
    if found.is_empty() {
        Ok(RawChain::new(vec![bytes]))
    } else {
        Ok(RawChain::new(found))
    }
}

#[cfg(feature = "cli")]
fn print_validity(chain: &Chain, digest: Option<DigestAlgorithm>) {
    let now = chrono::Utc::now();
    println!("{}", "Validity".bold().cyan());
    for (index, cert) in chain.iter().enumerate() {
        let status = cert.validity_status(now);
        let label = match status {
            ValidityStatus::Valid => status.label().green(),
            ValidityStatus::Expired => status.label().red(),
            ValidityStatus::NotYetValid => status.label().yellow(),
        };
        println!(
            "  [{}] {} {}: {} (until {})",
            index,
            role(chain, index),
            cert.subject.to_oneline().bold(),
            label,
            format_date(&cert.not_after).dimmed()
        );
        if let Some(algorithm) = digest {
            println!(
                "      {}: {}",
                algorithm.name().cyan(),
                compute_fingerprint(cert.raw_der(), algorithm)
            );
        }
    }
    if !chain.is_complete() {
        println!("{}", "Chain is incomplete".yellow().bold());
    }
}
