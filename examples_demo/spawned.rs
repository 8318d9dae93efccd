use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use wslogger::Logger;

fn start_worker(log: &Logger, id: usize) -> thread::JoinHandle<()> {
    let handle = log.wrap_task();
    thread::spawn(move || handle.info(("worker started", "id", id)))
}

fn main() -> Result<(), wslogger::BuildError> {
    let log = Logger::builder().app_name("Spawned").build()?;

    let (done_tx, done_rx) = mpsc::channel();
    for i in 0..5 {
        let g = log.capture_spawn_site();
        let done = done_tx.clone();
        thread::spawn(move || {
            g.info(("hello from thread", "i", i));
            done.send(()).ok();
        });
    }
    for _ in 0..5 {
        if done_rx.recv_timeout(Duration::from_secs(2)).is_err() {
            log.error("timed out waiting for threads");
            break;
        }
    }

    let workers: Vec<_> = (0..2).map(|id| start_worker(&log, id)).collect();
    for worker in workers {
        worker.join().ok();
    }

    let helper = log.spawn_thread(|handle| handle.warn("spawned through the logger"));
    helper.join().ok();

    // explicit attribution overrides the resolved caller
    log.info(("explicit caller", "spawn_caller", "spawned.rs:main"));
    log.flush();
    Ok(())
}
