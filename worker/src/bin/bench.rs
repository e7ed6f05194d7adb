use std::{
    env, fs, io, mem,
    time::{Duration, Instant},
};

use log::info;
use worker::WorkerOptions;

const DEFAULT_URI: &str = "tcp://127.0.0.1:3042";
const DEFAULT_CALLS: usize = 1000;
const TOTAL_VALUES: usize = 3_000_000_000;

/// Formats `elapsed` as micro, milli or plain seconds with two decimals.
fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();

    if secs < 1e-3 {
        format!("{:.2} microseconds", secs * 1e6)
    } else if secs < 1.0 {
        format!("{:.2} milliseconds", secs * 1e3)
    } else {
        format!("{secs:.2} seconds")
    }
}

/// Mean time of one call out of `calls` taking `elapsed` in total.
fn per_call(elapsed: Duration, calls: usize) -> Duration {
    elapsed.div_f64(calls as f64)
}

fn read_options() -> io::Result<WorkerOptions> {
    match env::var("OPTIONS") {
        Ok(path) => WorkerOptions::from_json(&fs::read_to_string(path)?),
        Err(_) => Ok(WorkerOptions::default()),
    }
}

fn main() -> io::Result<()> {
    env_logger::init();

    let uri = env::var("URI").unwrap_or_else(|_| DEFAULT_URI.to_string());
    let calls = match env::var("CALLS") {
        Ok(calls) => calls.parse().map_err(io::Error::other)?,
        Err(_) => DEFAULT_CALLS,
    };

    let worker = worker::create_worker_with(&uri, read_options()?)?;
    info!("benchmarking {uri}");

    let mut prev = Vec::new();
    let mut params = Vec::new();

    let start = Instant::now();
    worker.get_parameters_into(&mut prev)?;
    println!("Time for first call: {}", format_duration(start.elapsed()));
    println!("Buffer length: {}", prev.len());

    let mut diverged = 0;
    let start = Instant::now();
    for _ in 0..calls {
        worker.get_parameters_into(&mut params)?;
        if params != prev {
            diverged += 1;
        }
        mem::swap(&mut params, &mut prev);
    }

    if calls > 0 {
        let mean = per_call(start.elapsed(), calls);
        println!("Time per call: {}", format_duration(mean));
    }

    if diverged > 0 {
        println!("Parameters diverged {diverged} times over {calls} calls");
    }

    if prev.is_empty() {
        return Ok(());
    }

    let fetches = TOTAL_VALUES.div_ceil(prev.len());
    println!("Fetching 3 billion values in {fetches} calls");

    let start = Instant::now();
    for _ in 0..fetches {
        worker.get_parameters_into(&mut params)?;
    }
    println!("Time for 3 billion values: {}", format_duration(start.elapsed()));

    worker.close();
    Ok(())
}
