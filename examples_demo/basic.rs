use std::error::Error;
use wslogger::init::init_tracing;
use wslogger::{Logger, RotationConfig};

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing()?;

    let log = Logger::builder().app_name("DemoApp").build()?;
    log.info("starting up");
    log.warn(("disk almost full", "mount", "/var", "used_pct", 93));
    log.errorf(format_args!("failed to reach {} after {} attempts", "db-primary", 3));

    let custom = Logger::builder()
        .app_name("Custom")
        .format("{level} | {time} | {message} | {extra}")
        .color(false)
        .build()?;
    custom.debug(("custom layout", "user", "ada lovelace"));

    let json = Logger::builder()
        .app_name("JsonLogger")
        .json(true)
        .rotating_file(RotationConfig::new("logs/json_log.txt", 1, 5, 7, false))
        .build()?;
    json.info(("written to logs/json_log.txt", "format", "json"));

    let both = Logger::builder()
        .app_name("MultiWriter")
        .multi_writer(RotationConfig::new("logs/multi.log", 10, 3, 28, true))
        .build()?;
    both.info("goes to stdout and logs/multi.log");

    let span = tracing::info_span!("checkout", order_id = 1234);
    let _entered = span.enter();
    log.info_ctx(&span, ("inside a span", "step", "payment"));
    log.infof_ctx(&span, format_args!("order {} confirmed", 1234));

    log.flush();
    json.flush();
    both.flush();
    Ok(())
}
