use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};
use structopt::StructOpt;

use smoker_controller::config::{load_config, ControllerConfig};
use smoker_controller::visualization::plot_series;
use smoker_controller::{
    run_sweep, ControlError, ControlLoop, LoopRunner, ProcessSimulator, Shared,
    SimulationOptions, Smoker, Thermometer,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "smoker_controller",
    about = "Proportional band PID controller for a pellet smoker"
)]
struct Opt {
    /// TOML config file; a missing file means built-in defaults
    #[structopt(short = "c", long = "config", parse(from_os_str), default_value = "config/controller.toml")]
    config: PathBuf,

    #[structopt(flatten)]
    overrides: Overrides,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, StructOpt)]
struct Overrides {
    /// Temperature band over which output sweeps from 0 to 1
    #[structopt(long = "tb")]
    proportional_band: Option<f64>,

    /// Temperature set point (goal)
    #[structopt(long = "sp")]
    setpoint: Option<f64>,

    /// Integration time to remove past error, in seconds
    #[structopt(long = "it")]
    integral_time: Option<f64>,

    /// Derivative time to remove future error, in seconds
    #[structopt(long = "dt")]
    derivative_time: Option<f64>,

    /// Sample / cycle time, in seconds
    #[structopt(short = "t", long = "sample-time")]
    sample_time: Option<f64>,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Run the controller in real time against the simulated smoker
    Run {
        /// Seconds to run before stopping
        #[structopt(long, default_value = "60")]
        duration: u64,

        /// Probe temperature at start
        #[structopt(long, default_value = "200")]
        initial_temperature: f64,

        #[structopt(long, default_value = "42")]
        seed: u64,
    },
    /// Sweep integral and derivative times on a virtual clock
    Simulate {
        /// Integral times to try, comma separated (default: configured value)
        #[structopt(long = "its", use_delimiter = true)]
        integral_times: Vec<f64>,

        /// Derivative times to try, comma separated (default: configured value)
        #[structopt(long = "dts", use_delimiter = true)]
        derivative_times: Vec<f64>,

        #[structopt(long, default_value = "1000")]
        iterations: u32,

        #[structopt(long, default_value = "42")]
        seed: u64,

        /// Write a PNG of the temperature curves here
        #[structopt(long, parse(from_os_str))]
        plot: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::from_args();
    if let Err(e) = run(opt) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&opt.config)?;
    apply_overrides(&mut config, &opt.overrides)?;
    config.validate()?;

    match opt.command {
        Command::Run {
            duration,
            initial_temperature,
            seed,
        } => run_live(&config, Duration::from_secs(duration), initial_temperature, seed),
        Command::Simulate {
            integral_times,
            derivative_times,
            iterations,
            seed,
            plot,
        } => run_simulations(&config, integral_times, derivative_times, iterations, seed, plot),
    }
}

fn apply_overrides(config: &mut ControllerConfig, overrides: &Overrides) -> Result<(), ControlError> {
    if let Some(band) = overrides.proportional_band {
        config.proportional_band = band;
    }
    if let Some(setpoint) = overrides.setpoint {
        config.setpoint = setpoint;
    }
    if let Some(integral_time) = overrides.integral_time {
        config.integral_time = integral_time;
    }
    if let Some(derivative_time) = overrides.derivative_time {
        config.derivative_time = derivative_time;
    }
    if let Some(seconds) = overrides.sample_time {
        config.set_sample_time(seconds)?;
    }
    Ok(())
}

fn run_live(
    config: &ControllerConfig,
    duration: Duration,
    initial_temperature: f64,
    seed: u64,
) -> Result<(), Box<dyn Error>> {
    println!("===========================================");
    println!("Starting Smoker Controller");
    println!("===========================================\n");

    let thermometer = Shared::new(Thermometer::new(initial_temperature));
    let smoker = Shared::new(Smoker::new());
    let control = ControlLoop::with_tuning(
        thermometer.clone(),
        smoker.clone(),
        &config.tuning()?,
        config.setpoint,
    )?;

    let mut runner = LoopRunner::new(control);
    runner.start(config.sample_period())?;

    // The pit reacts once a second, independent of the controller cadence.
    let mut simulator = ProcessSimulator::new(seed);
    let deadline = Instant::now() + duration;
    info!("System running for {:?}", duration);
    while Instant::now() < deadline {
        let drive = smoker.lock().auger;
        thermometer.update(|probe| probe.value = simulator.advance(probe.value, drive));
        thread::sleep(Duration::from_secs(1));
    }

    runner.stop()?;

    let report = runner.metrics().report();
    println!("\n===========================================");
    println!("FINAL CONTROLLER RESULTS");
    println!("===========================================");
    println!("Final temperature: {:.2} (setpoint {:.2})", thermometer.lock().value, config.setpoint);
    println!("Iterations: {}", report.iterations);
    println!("Elapsed-time fallbacks: {}", report.elapsed_fallbacks);
    println!("Non-finite errors: {}", report.non_finite_errors);
    println!("Saturated proportional: {}", report.saturated_iterations);
    println!("Output outside [0,1]: {}", report.out_of_range_outputs);
    println!("Evaluation P50: {:?}, P99: {:?}", report.evaluation_p50, report.evaluation_p99);
    println!("Tick jitter P50: {:?}, P99: {:?}", report.jitter_p50, report.jitter_p99);
    Ok(())
}

fn run_simulations(
    config: &ControllerConfig,
    mut integral_times: Vec<f64>,
    mut derivative_times: Vec<f64>,
    iterations: u32,
    seed: u64,
    plot: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    if integral_times.is_empty() {
        integral_times.push(config.integral_time);
    }
    if derivative_times.is_empty() {
        derivative_times.push(config.derivative_time);
    }

    let options = SimulationOptions {
        setpoint: config.setpoint,
        iterations,
        step: config.sample_period(),
        seed,
        ..SimulationOptions::default()
    };
    let series = run_sweep(config.proportional_band, &integral_times, &derivative_times, &options)?;

    println!("=== Simulation Results (PB={}) ===", config.proportional_band);
    for s in &series {
        println!(
            "{}: final {:.2}, max overshoot {:.2}",
            s.name,
            s.final_temperature().unwrap_or(options.initial_temperature),
            s.max_overshoot(options.setpoint)
        );
    }

    if let Some(path) = plot {
        let title = format!("PB={}", config.proportional_band);
        plot_series(&path, &title, &series)?;
        info!("Wrote plot to {}", path.display());
    }
    Ok(())
}
