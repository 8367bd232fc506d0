//! nas-ip: operator CLI over the NAS IP tool library.
//!
//! Every subcommand maps onto one `IpTool` call. The exit status is 0 when
//! the call reports success and 1 otherwise.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use nas_ip_tool::{AddressFamily, InterfaceRecord, IpTool, DEFAULT_VRF};
use nas_ipd::{init_logging, link_local_from_mac, NasIpdConfig, DEFAULT_CONFIG_PATH};
use nas_os_common::SystemRunner;

/// NAS IP tool
#[derive(Parser, Debug)]
#[command(name = "nas-ip")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (only the [tools] section is used)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log filter, `warn` when omitted; takes precedence over RUST_LOG
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct VrfArg {
    /// VRF (network namespace)
    #[arg(long, default_value = DEFAULT_VRF)]
    vrf: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List interfaces and their addresses
    Show {
        /// Only this VRF; all namespaces when omitted
        #[arg(long)]
        vrf: Option<String>,
        /// Only this device
        #[arg(long)]
        dev: Option<String>,
        /// Use `ip -d` to report macvlan links (requires --vrf)
        #[arg(long, requires = "vrf")]
        details: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Bridge management (brctl)
    #[command(subcommand)]
    Bridge(BridgeCommand),
    /// Address management
    #[command(subcommand)]
    Addr(AddrCommand),
    /// Link management
    #[command(subcommand)]
    Link(LinkCommand),
    /// Flush the neighbor table
    NeighFlush {
        #[arg(long, default_value = "ipv4")]
        family: AddressFamily,
        #[arg(long)]
        dev: Option<String>,
        #[arg(long)]
        addr: Option<String>,
        #[command(flatten)]
        vrf: VrfArg,
    },
    /// Print the link-local address derived from a MAC
    Lla { mac: String },
}

#[derive(Subcommand, Debug)]
enum BridgeCommand {
    Create { bridge: String },
    Delete { bridge: String },
    AddIf { bridge: String, ifname: String },
    DelIf { bridge: String, ifname: String },
    List,
    Members { bridge: String },
    Id { bridge: String },
}

#[derive(Subcommand, Debug)]
enum AddrCommand {
    Add {
        prefix: String,
        dev: String,
        #[arg(long, default_value = "ipv4")]
        family: AddressFamily,
        #[command(flatten)]
        vrf: VrfArg,
    },
    Del {
        prefix: String,
        dev: String,
        #[command(flatten)]
        vrf: VrfArg,
    },
}

#[derive(Subcommand, Debug)]
enum LinkCommand {
    Delete {
        name: String,
        #[command(flatten)]
        vrf: VrfArg,
    },
    Mtu { name: String, mtu: u32 },
    Mac {
        name: String,
        mac: String,
        #[command(flatten)]
        vrf: VrfArg,
    },
    Up {
        name: String,
        #[command(flatten)]
        vrf: VrfArg,
    },
    Down {
        name: String,
        #[command(flatten)]
        vrf: VrfArg,
    },
    Exists {
        name: String,
        #[command(flatten)]
        vrf: VrfArg,
    },
}

fn print_records(records: &[InterfaceRecord], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    for record in records {
        println!(
            "{}: {} [{}] admin {:?} oper {:?} mtu {} mac {}{}",
            record.ifindex,
            record.name,
            record.vrf_name,
            record.admin_state,
            record.oper_state,
            record.mtu.map_or_else(|| "-".to_string(), |m| m.to_string()),
            record.mac.as_deref().unwrap_or("-"),
            if record.is_macvlan { " macvlan" } else { "" },
        );
        for addr in &record.addresses {
            println!("    {}", addr);
        }
    }
    Ok(())
}

fn print_list(items: Option<Vec<String>>) -> bool {
    match items {
        Some(items) => {
            for item in items {
                println!("{}", item);
            }
            true
        }
        None => false,
    }
}

async fn execute(tool: &IpTool<SystemRunner>, command: Command) -> anyhow::Result<bool> {
    let ok = match command {
        Command::Show {
            vrf,
            dev,
            details,
            json,
        } => {
            let records = match (vrf.as_deref(), details) {
                (Some(vrf), true) => tool.list_interface_details(vrf, dev.as_deref()).await?,
                (Some(vrf), false) => tool.try_list_interfaces_in(vrf, dev.as_deref()).await?,
                (None, _) => tool.list_interfaces(None, dev.as_deref()).await,
            };
            print_records(&records, json)?;
            true
        }

        Command::Bridge(cmd) => match cmd {
            BridgeCommand::Create { bridge } => tool.create_bridge(&bridge).await?,
            BridgeCommand::Delete { bridge } => tool.delete_bridge(&bridge).await?,
            BridgeCommand::AddIf { bridge, ifname } => {
                tool.add_bridge_member(&bridge, &ifname).await?
            }
            BridgeCommand::DelIf { bridge, ifname } => {
                tool.remove_bridge_member(&bridge, &ifname).await?
            }
            BridgeCommand::List => print_list(tool.list_bridges().await?),
            BridgeCommand::Members { bridge } => print_list(tool.bridge_members(&bridge).await?),
            BridgeCommand::Id { bridge } => {
                print_list(tool.bridge_id(&bridge).await?.map(|id| vec![id]))
            }
        },

        Command::Addr(cmd) => match cmd {
            AddrCommand::Add {
                prefix,
                dev,
                family,
                vrf,
            } => {
                tool.add_ip_address(&prefix, &dev, family, &vrf.vrf, true)
                    .await?
            }
            AddrCommand::Del { prefix, dev, vrf } => {
                tool.delete_ip_address(&prefix, &dev, &vrf.vrf).await?
            }
        },

        Command::Link(cmd) => match cmd {
            LinkCommand::Delete { name, vrf } => tool.delete_interface(&name, &vrf.vrf).await?,
            LinkCommand::Mtu { name, mtu } => tool.set_mtu(&name, mtu).await?,
            LinkCommand::Mac { name, mac, vrf } => tool.set_mac(&name, &mac, &vrf.vrf).await?,
            LinkCommand::Up { name, vrf } => tool.set_admin_state(&name, true, &vrf.vrf).await?,
            LinkCommand::Down { name, vrf } => tool.set_admin_state(&name, false, &vrf.vrf).await?,
            LinkCommand::Exists { name, vrf } => {
                let exists = tool.interface_exists(&vrf.vrf, &name).await?;
                println!("{}", exists);
                exists
            }
        },

        Command::NeighFlush {
            family,
            dev,
            addr,
            vrf,
        } => {
            tool.flush_neighbors(family, dev.as_deref(), addr.as_deref(), &vrf.vrf)
                .await?
        }

        Command::Lla { mac } => {
            println!("{}", link_local_from_mac(&mac)?);
            true
        }
    };
    Ok(ok)
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = NasIpdConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config.tools.validate().context("invalid [tools] configuration")?;
    let level = cli.log_level.as_deref().unwrap_or("warn");
    init_logging(level, cli.log_level.is_some())?;

    let tool = IpTool::new(SystemRunner, &config.tools);
    execute(&tool, cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("nas-ip: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
