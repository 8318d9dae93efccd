use std::time::Instant;

use wslogger::noop_sink::NoopSink;
use wslogger::Logger;

fn run(label: &str, log: &Logger, n: u64) {
    let start = Instant::now();
    for i in 0..n {
        log.error(("default load test error", "iteration", i));
    }
    let elapsed = start.elapsed();
    println!(
        "{}: wrote {} lines in {:?} (~{:.0} lines/s)",
        label,
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
}

fn main() -> Result<(), wslogger::BuildError> {
    let n: u64 = 100_000;

    let text = Logger::builder().sink(NoopSink).build()?;
    run("text", &text, n);

    let json = Logger::builder().sink(NoopSink).json(true).build()?;
    run("json", &json, n);

    let handle = json.capture_spawn_site();
    let start = Instant::now();
    std::thread::spawn(move || {
        for i in 0..n {
            handle.info(("spawned load test", "iteration", i));
        }
    })
    .join()
    .ok();
    println!("spawned: wrote {} lines in {:?}", n, start.elapsed());
    Ok(())
}
