use tracing::debug;
use tracing::warn;

use oneterm::commands::parse_lenient;
use oneterm::telemetry;
use oneterm::Application;
use oneterm_session::AppConfig;

fn main() {
    let parsed = match parse_lenient(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(e) => e.exit(),
    };

    let code = {
        let _telemetry = telemetry::init_tracing(parsed.cli.default_log_level());
        if !parsed.ignored.is_empty() {
            warn!(ignored = ?parsed.ignored, "Ignoring unrecognized arguments");
        }

        let config = AppConfig::from_env();
        debug!(
            shell = %config.shell.program,
            capture = ?config.capture,
            log_dir = %config.archive.log_dir.display(),
            "Starting oneterm"
        );
        Application::new(config).run()
    };

    std::process::exit(code);
}
