use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, Command};

use cloudsweep_config::Service;

pub fn build_cli() -> Command {
    let services: Vec<&'static str> = Service::SELECTABLE.iter().map(|s| s.as_str()).collect();

    Command::new("cloudsweep")
        .about("Find and delete unused cloud resources, dry run by default")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .help("Write logs to stderr as JSON lines")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file (default: ./cloudsweep.toml or $CLOUDSWEEP_CONFIG)")
                .value_name("PATH")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("clean")
                .about("Discover, filter and delete unused resources")
                .arg(
                    Arg::new("inventory")
                        .long("inventory")
                        .help("Account inventory snapshot (JSON) to clean")
                        .value_name("PATH")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .required(true),
                )
                .arg(
                    Arg::new("service")
                        .short('s')
                        .long("service")
                        .help("Service to clean (repeatable)")
                        .value_parser(PossibleValuesParser::new(services))
                        .action(ArgAction::Append)
                        .default_value("all"),
                )
                .arg(
                    Arg::new("apply")
                        .long("apply")
                        .help("Actually delete resources (default is a dry run)")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("plan")
                        .long("plan")
                        .help("Dry run that lists every resource with its decision")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("apply"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the run summary as JSON")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("target")
                        .long("target")
                        .visible_alias("include")
                        .help("Only consider this resource id (repeatable)")
                        .value_name("ID")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .help("Never touch this resource id (repeatable)")
                        .value_name("ID")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("delete-all")
                        .long("delete-all")
                        .help("Ignore retention age and delete every matching resource")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force-zero-retention")
                        .long("force-zero-retention")
                        .help("Allow --apply with a retention of zero or fewer days")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force-delete-all")
                        .long("force-delete-all")
                        .help("Allow --apply together with delete-all")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("interactive")
                        .short('i')
                        .long("interactive")
                        .help("Confirm each deletion on stdin")
                        .action(ArgAction::SetTrue)
                        .requires("apply"),
                )
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .help("Items per bulk delete call (1-1000)")
                        .value_name("N")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("live")
                        .long("live")
                        .help("Print progress lines while deleting (default on a terminal)")
                        .action(ArgAction::SetTrue)
                        .overrides_with("no-live"),
                )
                .arg(
                    Arg::new("no-live")
                        .long("no-live")
                        .help("Do not print progress lines")
                        .action(ArgAction::SetTrue)
                        .overrides_with("live"),
                ),
        )
        .subcommand(
            Command::new("services")
                .about("List the services and resource classes cloudsweep can clean")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Output in JSON format")
                        .action(ArgAction::SetTrue),
                ),
        )
}
