//! Container launcher.
//!
//! Boots a container instance for the given profile: activates the
//! profile's component set, serves the remote management endpoint and
//! hosts the shutdown sequencer. The process runs until a remote
//! `shutdown` invocation terminates it.

use anyhow::Result;
use clap::Parser;
use rigbox::config::types::ContainerConfig;
use rigbox::container::component::{ManagedComponent, TickerComponent};
use rigbox::container::runtime::Container;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about = "Modular runtime container launcher", long_about = None)]
struct Cli {
    /// Profile selecting which components this instance activates
    profile: String,
    /// Root of the container installation
    #[arg(long, default_value = ".")]
    install_dir: PathBuf,
}

fn profile_components(profile: &str) -> Vec<Arc<dyn ManagedComponent>> {
    let ids: &[&str] = match profile {
        "common" => &["scheduler", "relay"],
        "minimal" => &["scheduler"],
        _ => &["scheduler"],
    };

    ids.iter()
        .map(|id| Arc::new(TickerComponent::new(*id)) as Arc<dyn ManagedComponent>)
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let components = profile_components(&cli.profile);
    let config = ContainerConfig::new(cli.install_dir, cli.profile);

    Container::new(config, components).run()?;
    Ok(())
}
