use std::env;
use std::process::ExitCode;

use scheduling_simulator::error::ConfigError;
use scheduling_simulator::io::{self, SimulationConfig};
use scheduling_simulator::kernel::{ConcurrentRunner, Driver, SchedulingAlgorithm};
use scheduling_simulator::monitor;

struct Arguments {
    config_path: Option<String>,
    algorithm: Option<u8>,
    concurrent: bool,
}

fn parse_arguments() -> Result<Arguments, String> {
    let mut arguments = Arguments {
        config_path: None,
        algorithm: None,
        concurrent: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--concurrent" => arguments.concurrent = true,
            "--algorithm" => {
                let value = args.next().ok_or("--algorithm needs a value (1-6)")?;
                let id = value
                    .parse()
                    .map_err(|_| format!("invalid algorithm id: {}", value))?;
                arguments.algorithm = Some(id);
            }
            _ if arg.starts_with("--") => return Err(format!("unknown option: {}", arg)),
            _ => arguments.config_path = Some(arg),
        }
    }

    Ok(arguments)
}

fn load(arguments: &Arguments) -> Result<SimulationConfig, ConfigError> {
    let mut config = match &arguments.config_path {
        Some(path) => io::load_config(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(id) = arguments.algorithm {
        config.algorithm = SchedulingAlgorithm::try_from(id)?;
    }
    Ok(config)
}

fn run_cycle_stepped(config: &SimulationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut driver = Driver::new(config)?;

    println!("Scheduling with {}.", config.algorithm);
    println!(
        "Memory: {} KB, {} KB per process, {} eviction.",
        config.total_memory,
        config.memory_per_process,
        config.eviction_policy.name()
    );

    let report = driver.run()?;
    let metrics = driver.get_metrics();

    println!("Stats for executed processes ({}):", driver.get_scheduler_name());
    println!("... ID | Priority | Turnaround | Waiting | Response");
    println!("...----|----------|------------|---------|---------");
    for (id, times) in metrics.iter() {
        println!(
            "... {:02} | {:02}       | {:>10} | {:>7} | {:>8}",
            id,
            times.priority,
            times.turnaround().unwrap_or_default(),
            times.waiting().unwrap_or_default(),
            times.response().unwrap_or_default()
        );
    }

    let summary = metrics.summary();
    println!(
        "Averages: turnaround {:.2}, waiting {:.2}, response {:.2}; throughput {:.3} per cycle",
        summary.avg_turnaround, summary.avg_waiting, summary.avg_response, summary.throughput
    );
    println!(
        "Finished at cycle {} after {} dispatches ({} idle cycles, {} swap-outs, {} swap-ins).",
        report.final_cycle,
        report.dispatches,
        report.idle_cycles,
        report.swap_outs,
        report.swap_ins
    );
    println!("Completion order: {:?}", report.terminated);

    Ok(())
}

fn run_concurrent(config: &SimulationConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut runner = ConcurrentRunner::new(config)?;

    println!(
        "Running on {} workers with {} resource permits.",
        config.concurrent.workers, config.concurrent.resource_permits
    );

    let report = runner.run()?;

    println!(
        "Finished after {} ticks: {} dispatches, {} I/O blocks, {} resource waits.",
        report.ticks, report.dispatches, report.io_blocks, report.resource_waits
    );
    println!("Completion order: {:?}", report.terminated);

    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = monitor::console::init() {
        eprintln!("Failed to install logger: {}", err);
    }

    let arguments = match parse_arguments() {
        Ok(arguments) => arguments,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!("usage: scheduling-simulator [config.toml] [--algorithm 1-6] [--concurrent]");
            return ExitCode::FAILURE;
        }
    };

    let config = match load(&arguments) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let result = if arguments.concurrent {
        run_concurrent(&config)
    } else {
        run_cycle_stepped(&config)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Simulation failed: {}", err);
            ExitCode::FAILURE
        }
    }
}
