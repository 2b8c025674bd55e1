use cloudsweep_core::init_logging;

mod app;
mod approve;
mod color;
mod commands;
mod live;
mod table;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = app::build_cli();
    let matches = app.get_matches();

    // Default (no flag) = quiet mode, -v/--verbose = verbose mode
    let verbose = matches.get_flag("verbose");
    let json_logs = matches.get_flag("log-json");
    init_logging(!verbose, json_logs);

    if matches.get_flag("no-color") {
        color::set_no_color();
    }

    let status = commands::run_command(&matches)?;
    if let Some(code) = status.exit_code() {
        std::process::exit(code);
    }

    Ok(())
}
