use anyhow::Context;
use arm_probe::{Finding, ProbeConfig, Prober};
use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

#[derive(StructOpt)]
#[structopt(name = "arm-probe", about = "Tell leader and follower arms apart and check motor temperatures")]
struct Args {
    /// Serial port to probe, may be repeated. Replaces the default port list
    #[structopt(long = "port")]
    ports: Vec<String>,
    /// Baud rate of the servo bus
    #[structopt(long = "baud")]
    baud_rate: Option<u32>,
    #[structopt(subcommand)]
    check: Option<Check>,
}

#[derive(StructOpt)]
enum Check {
    /// Classify each arm by the supply voltage of its first motor
    Roles,
    /// Read the temperature of every motor
    Temps,
}

impl Args {
    fn config(&self) -> ProbeConfig {
        let mut config = ProbeConfig::default();
        if !self.ports.is_empty() {
            config = config.with_ports(self.ports.iter().cloned());
        }
        if let Some(baud_rate) = self.baud_rate {
            config = config.with_baud_rate(baud_rate);
        }
        config
    }
}

fn print(finding: Finding) {
    println!("{}", finding);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::from_args();
    let prober = Prober::new(args.config());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async {
        match args.check {
            Some(Check::Roles) => prober.check_roles(&mut print).await,
            Some(Check::Temps) => prober.check_temperatures(&mut print).await,
            None => {
                prober.check_roles(&mut print).await;
                println!();
                prober.check_temperatures(&mut print).await;
            }
        }
    });
    Ok(())
}
