//! nxvlan: show and change the access VLANs of an NX-OS switch's
//! physical interfaces over NETCONF.

use std::{process::exit, time::Duration};

use clap::{ArgAction, Parser, ValueEnum};
use nxvlan::{Device, Error, InterfaceRecord, InterfaceService, SortOrder, SshSessionFactory};

#[derive(Parser)]
#[command(name = "nxvlan")]
#[command(about = "Show and assign access VLANs on NX-OS interfaces")]
struct Cli {
    /// Shows the current interface to vlan mappings
    #[arg(long)]
    get_iface_vlans: bool,

    /// Shows a specific interface
    #[arg(long)]
    get_iface: bool,

    /// Assign a new VLAN ID to a specified interface
    #[arg(long)]
    update_iface_vlan: bool,

    /// Target IP
    #[arg(long)]
    ip: Option<String>,

    /// Device username
    #[arg(long)]
    username: Option<String>,

    /// Device password, prompted for when not given
    #[arg(long, env = "NXVLAN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Target interface
    #[arg(long)]
    iface: Option<String>,

    /// VLAN identifier, either `30` or `vlan-30`
    #[arg(long)]
    vlan: Option<String>,

    /// NETCONF port
    #[arg(long, default_value_t = nxvlan::NETCONF_PORT)]
    port: u16,

    /// Order of interfaces in listings
    #[arg(long, value_enum, default_value_t = Sort::Lexical)]
    sort: Sort,

    /// Connect and I/O timeout, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// More logging; repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Sort {
    Lexical,
    Natural,
}

impl From<Sort> for SortOrder {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Lexical => SortOrder::Lexical,
            Sort::Natural => SortOrder::Natural,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(username) = cli.username.as_deref().filter(|u| !u.is_empty()) else {
        println!("No username specified, Please specify --username");
        exit(1);
    };
    let Some(ip) = cli.ip.as_deref().filter(|ip| !ip.is_empty()) else {
        println!("No target specified, Please specify --ip");
        exit(1);
    };

    // validate before prompting for anything
    let update = if cli.update_iface_vlan {
        let Some(iface) = cli.iface.as_deref().filter(|i| !i.is_empty()) else {
            println!("Error: Wanted to Update Port But No Port Specified, Use --iface");
            exit(1);
        };
        let Some(vlan) = cli.vlan.as_deref().filter(|v| !v.is_empty()) else {
            println!("Error: Wanted to Update Port But No VLAN Specified, Use --vlan");
            exit(1);
        };
        Some((iface, vlan))
    } else {
        None
    };

    if !(cli.get_iface_vlans || cli.get_iface || update.is_some()) {
        return;
    }

    let password = match cli.password.clone() {
        Some(password) => password,
        None => match rpassword::prompt_password(format!("Password for {}@{}: ", username, ip)) {
            Ok(password) => password,
            Err(err) => {
                println!("Error: failed to read password: {}", err);
                return;
            }
        },
    };

    let device = Device::new(ip, username, password).with_port(cli.port);
    let mut factory = SshSessionFactory::new();
    if let Some(secs) = cli.timeout {
        factory = factory.with_timeout(Duration::from_secs(secs));
    }
    let service = InterfaceService::new(factory).with_sort_order(cli.sort.into());

    if cli.get_iface_vlans {
        println!("Interface Details");
        match service.list_interfaces(&device) {
            Ok(records) => records.iter().for_each(print_record),
            Err(err) => print_error(&err),
        }
    }

    if cli.get_iface {
        println!("Interface Details");
        let iface = cli.iface.as_deref().unwrap_or_default();
        match service.get_interface(&device, iface) {
            Ok(Some(record)) => print_record(&record),
            Ok(None) => println!("No Such Interface, Please Check Input"),
            Err(err) => print_error(&err),
        }
    }

    if let Some((iface, vlan)) = update {
        println!("Updating Access VLAN");
        match service.update_vlan(&device, iface, vlan) {
            Ok(record) => {
                println!("Interface Updated!");
                println!("Interface Details");
                print_record(&record);
            }
            Err(Error::ProtocolError(err)) => {
                println!("Unable to update VLAN, Error Message Below: ");
                println!("{}", err.message());
            }
            Err(Error::Unconfirmed(err)) => {
                println!("Interface Updated, but reading it back failed: {}", err);
            }
            Err(err) => print_error(&err),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_record(record: &InterfaceRecord) {
    println!("{}\t\tVLAN: {} ", record.id(), record.access_vlan());
}

fn print_error(err: &Error) {
    match err {
        Error::ParseError { reply, .. } => {
            println!("Error: {}", err);
            log::debug!("raw reply: {}", reply);
        }
        _ => println!("Error: {}", err),
    }
}
