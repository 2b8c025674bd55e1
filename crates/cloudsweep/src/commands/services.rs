use clap::ArgMatches;
use tracing::info;

use cloudsweep_config::{
    ConfigError, ConfigSource, RuleOverrides, Service, SweepConfig, resolve_config_path,
};
use cloudsweep_core::log_app_error;

use super::json_types::{ClassInfo, ServiceInfo};
use crate::color;
use crate::table::Table;

pub(crate) fn handle_services_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = matches.get_flag("json");
    info!(event = "cli.services_started", json_output = json_output);

    let source =
        resolve_config_path(matches.get_one::<std::path::PathBuf>("config").map(|p| p.as_path()));
    let services = match collect_services(&source) {
        Ok(services) => services,
        Err(e) => {
            eprintln!("{}", color::error(&e.to_string()));
            log_app_error(&e);
            return Err(e.into());
        }
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&services)?);
    } else {
        print_services_table(&services);
    }

    info!(event = "cli.services_completed", count = services.len());
    Ok(())
}

fn collect_services(source: &ConfigSource) -> Result<Vec<ServiceInfo>, ConfigError> {
    let config = SweepConfig::load(source)?;
    let overrides = RuleOverrides::default();

    Service::SELECTABLE
        .into_iter()
        .filter(|service| *service != Service::All)
        .map(|service| {
            let classes = service
                .classes()
                .into_iter()
                .map(|class| {
                    let rules = config.rule_set(class, &overrides)?;
                    Ok::<_, ConfigError>(ClassInfo {
                        class,
                        children: class.child_noun(),
                        retention_days: rules.retention_days(),
                        policy: rules.policy_summary(),
                    })
                })
                .collect::<Result<Vec<ClassInfo>, ConfigError>>()?;
            Ok::<_, ConfigError>(ServiceInfo {
                service,
                description: service.description(),
                classes,
            })
        })
        .collect()
}

fn print_services_table(services: &[ServiceInfo]) {
    let mut table = Table::new(&["Service", "Class", "Children", "Policy"])
        .max_width(3, 60)
        .style(1, color::ice);
    for service in services {
        for (i, class) in service.classes.iter().enumerate() {
            let label = if i == 0 {
                format!("{} ({})", service.service, service.description)
            } else {
                String::new()
            };
            table.add_row(vec![
                label,
                class.class.to_string(),
                class.children.map_or_else(|| "-".to_string(), |c| format!("{}s", c)),
                class.policy.clone(),
            ]);
        }
    }
    table.print();
}
