/*!
osim binary: loads the configuration, drives the tick loop at the configured
real-time speed, and feeds interactive commands from stdin to the model.

The throttle lives entirely here; the engine itself never sleeps. Commands
are read on a separate thread and applied between ticks, so the model is
only ever touched from this thread.
*/

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use osim::control;
use osim::{OsConfig, OsModel};

#[derive(Parser, Debug)]
#[command(name = "osim", about = "Discrete-event simulator of a multiprogrammed OS")]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Stop after this many ticks (default: run until terminated).
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the configured random seed (negative for OS entropy).
    #[arg(long)]
    seed: Option<i64>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = OsConfig::load(&args.config);
    if let Some(seed) = args.seed {
        config.random.random_seed = seed;
    }
    let mut model = OsModel::new(config);

    let commands = spawn_stdin_reader();
    let mut ticks: u64 = 0;

    while model.running() {
        while let Ok(line) = commands.try_recv() {
            match control::parse(&line) {
                Ok(Some(command)) => println!("{}", control::execute(command, &mut model)),
                Ok(None) => {}
                Err(err) => println!("{err}"),
            }
        }
        if !model.running() {
            break;
        }

        model.step();
        ticks += 1;
        if args.ticks.is_some_and(|limit| ticks >= limit) {
            model.terminate();
            break;
        }

        let speed = model.speed();
        let delay = if speed > 0.0 { 1.0 / speed } else { 0.01 };
        thread::sleep(Duration::from_secs_f64(delay));
    }

    print_report(&model, ticks);
}

/// Forward stdin lines into a channel; the reader thread dies with the
/// process.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if sender.send(line).is_err() {
                break;
            }
        }
    });
    receiver
}

fn print_report(model: &OsModel, ticks: u64) {
    let os = model.stats().os_stats();
    let avg = model.stats().avg_process_stats();
    println!("--- run summary ({ticks} ticks driven) ---");
    println!("tasks loaded:              {}", os.tasks_loaded);
    println!("tasks completed (m_multi): {}", os.m_multi);
    println!("system time (t_multi):     {:.0}", os.t_multi);
    println!("os overhead (t_sys_multi): {:.0}", os.t_sys_multi);
    println!("uniprogrammed time:        {:.0}", os.t_mono);
    println!("avg turnaround multi:      {:.2}", os.t_proc_avg_multi);
    println!("avg turnaround mono:       {:.2}", os.t_proc_avg_mono);
    println!("throughput vs mono:        {:.1}%", os.d_multi);
    println!("overhead share:            {:.1}%", os.d_system);
    println!("avg slowdown (d_exe):      {:.1}%", avg.d_exe_avg);
    println!("avg queue share (d_ready): {:.1}%", avg.d_ready_avg);
}
