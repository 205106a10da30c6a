use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use ipa_agent::{ActivationCode, EimScheme, IpaConfig, IpaContext, PersistedState, PollOutcome};
use ipa_apdu_pcsc::{PcscConfig, PcscTransport};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "IoT Profile Assistant agent for SGP.32 eUICC management")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// eIM host name
    #[arg(long)]
    eim: String,

    /// Use plain HTTP towards the eIM instead of HTTPS
    #[arg(long)]
    http: bool,

    /// Skip TLS peer verification (honored in debug builds only)
    #[arg(long)]
    insecure: bool,

    /// eIM identifier to pin when reading association data
    #[arg(long)]
    eim_id: Option<String>,

    /// Logical channel to the ISD-R (0-3)
    #[arg(long, default_value_t = 0)]
    channel: u8,

    /// ISD-R AID override, as hex
    #[arg(long)]
    isdr_aid: Option<String>,

    /// Restrict server certificates to this CA key identifier, as hex
    #[arg(long)]
    allowed_ca: Option<String>,

    /// Emulate an IoT eUICC on top of a consumer eUICC
    #[arg(long)]
    emulate: bool,

    /// Path of the persisted agent state
    #[arg(long, default_value = "ipa-state.json")]
    state: PathBuf,

    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the EID of the connected eUICC
    Eid,

    /// Poll the eIM until it has no more work
    Poll,

    /// Poll the eIM forever with a fixed interval between idle cycles
    Run {
        /// Seconds to wait after an idle or unreachable cycle
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },

    /// Download a profile from an activation code
    Download {
        /// Activation code (LPA:1$... or 1$...)
        #[arg(required = true)]
        code: String,
    },

    /// Forward pending eUICC notifications to the eIM
    Notifications,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = build_config(&cli)?;

    let mut pcsc_config = PcscConfig::default();
    if let Some(reader) = &cli.reader {
        pcsc_config = pcsc_config.with_reader(reader.clone());
    }
    let transport = PcscTransport::connect(pcsc_config)?;

    let state = load_state(&cli.state)?;
    let mut context = IpaContext::new(transport, config, state)?;

    match &cli.command {
        Commands::Eid => {
            println!("{}", hex::encode_upper(context.eid()));
        }
        Commands::Poll => {
            let outcome = drain(&mut context, &cli.state)?;
            info!(?outcome, "poll finished");
        }
        Commands::Run { interval } => loop {
            let outcome = drain(&mut context, &cli.state)?;
            match outcome {
                PollOutcome::AwaitConnectivity => {
                    info!("profile switched, waiting for connectivity")
                }
                PollOutcome::Failed(origin) => warn!(?origin, "poll cycle failed"),
                _ => {}
            }
            std::thread::sleep(Duration::from_secs(*interval));
        },
        Commands::Download { code } => {
            let code = ActivationCode::parse(code)?;
            info!(smdp = %code.smdp_address, "starting profile download");
            context.download_profile(&code)?;
            save_state(&cli.state, &context)?;
            println!("profile installed");
        }
        Commands::Notifications => {
            let forwarded = context.process_notifications()?;
            save_state(&cli.state, &context)?;
            println!("{forwarded} notification(s) forwarded");
        }
    }

    context.close()?;
    Ok(())
}

/// Poll until the eIM runs out of queued work, persisting after each cycle
fn drain(context: &mut IpaContext, state_path: &Path) -> anyhow::Result<PollOutcome> {
    loop {
        let outcome = context.poll();
        save_state(state_path, context)?;
        if outcome != PollOutcome::ActionTaken {
            return Ok(outcome);
        }
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<IpaConfig> {
    if cli.channel > 3 {
        bail!("logical channel must be 0-3");
    }
    let mut config = IpaConfig::new(cli.eim.clone())
        .with_logical_channel(cli.channel)
        .with_tls_verify(!cli.insecure);
    if cli.http {
        config = config.with_scheme(EimScheme::Http);
    }
    if let Some(eim_id) = &cli.eim_id {
        config = config.with_eim_id(eim_id.clone());
    }
    if let Some(aid) = &cli.isdr_aid {
        config.isdr_aid = Some(hex::decode(aid).context("invalid --isdr-aid hex")?);
    }
    if let Some(ca) = &cli.allowed_ca {
        config = config.with_allowed_ca_id(hex::decode(ca).context("invalid --allowed-ca hex")?);
    }
    if cli.emulate {
        config = config.with_iot_emulation();
    }
    Ok(config)
}

fn load_state(path: &Path) -> anyhow::Result<PersistedState> {
    match std::fs::read_to_string(path) {
        Ok(json) => Ok(PersistedState::from_json(&json)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedState::new()),
        Err(e) => Err(e).with_context(|| format!("reading state file {}", path.display())),
    }
}

fn save_state(path: &Path, context: &IpaContext) -> anyhow::Result<()> {
    let json = context.state().to_json()?;
    std::fs::write(path, json).with_context(|| format!("writing state file {}", path.display()))
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    // RUST_LOG directives still win; the flag only sets the default
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
