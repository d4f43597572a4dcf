/*!
Interactive control surface: a line-oriented command parser and executor.

The shell (or any other front end) feeds lines in, gets a `ControlCommand`
out, and applies it to the model through `execute`, which returns a
single-line human-readable reply. The engine itself produces no text;
everything user-facing lives here.

Grammar:
  help | terminate | speed+ | speed- | speed <value>
  stop loading | continue loading | load task
  stop task <pid> | continue task <pid>
  kill <pid> | finish | seed <value>
*/

use thiserror::Error;

use crate::os::OsModel;
use crate::process::Pid;

#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    Help,
    Terminate,
    SpeedUp,
    SpeedDown,
    SetSpeed(f64),
    StopLoading,
    ContinueLoading,
    LoadTask,
    StopTask(Pid),
    ResumeTask(Pid),
    Kill(Pid),
    Finish,
    Seed(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized command: {0}")]
pub struct ParseError(String);

/// Parse one input line. Blank lines parse to `None`.
pub fn parse(line: &str) -> Result<Option<ControlCommand>, ParseError> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&head) = parts.first() else {
        return Ok(None);
    };
    let err = || ParseError(line.trim().to_string());

    let command = match head.to_ascii_lowercase().as_str() {
        "help" => ControlCommand::Help,
        "terminate" => ControlCommand::Terminate,
        "speed+" => ControlCommand::SpeedUp,
        "speed-" => ControlCommand::SpeedDown,
        "speed" => {
            let value = parts.get(1).and_then(|v| v.parse().ok()).ok_or_else(err)?;
            ControlCommand::SetSpeed(value)
        }
        "stop" => match parts.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("loading") => ControlCommand::StopLoading,
            Some("task") => {
                let pid = parts.get(2).and_then(|v| v.parse().ok()).ok_or_else(err)?;
                ControlCommand::StopTask(pid)
            }
            _ => return Err(err()),
        },
        "continue" => match parts.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("loading") => ControlCommand::ContinueLoading,
            Some("task") => {
                let pid = parts.get(2).and_then(|v| v.parse().ok()).ok_or_else(err)?;
                ControlCommand::ResumeTask(pid)
            }
            _ => return Err(err()),
        },
        "load" => match parts.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("task") => ControlCommand::LoadTask,
            _ => return Err(err()),
        },
        "kill" => {
            let pid = parts.get(1).and_then(|v| v.parse().ok()).ok_or_else(err)?;
            ControlCommand::Kill(pid)
        }
        "finish" => ControlCommand::Finish,
        "seed" => {
            let seed = parts.get(1).and_then(|v| v.parse().ok()).ok_or_else(err)?;
            ControlCommand::Seed(seed)
        }
        _ => return Err(err()),
    };
    Ok(Some(command))
}

/// Apply a parsed command to the model and report the outcome.
pub fn execute(command: ControlCommand, model: &mut OsModel) -> String {
    match command {
        ControlCommand::Help => HELP.to_string(),
        ControlCommand::Terminate => {
            model.terminate();
            "model terminated".to_string()
        }
        ControlCommand::SpeedUp => format!("speed is {:.3}", model.change_speed(true)),
        ControlCommand::SpeedDown => format!("speed is {:.3}", model.change_speed(false)),
        ControlCommand::SetSpeed(value) => format!("speed is {:.3}", model.set_speed(value)),
        ControlCommand::StopLoading => {
            model.set_loading_enabled(false);
            "loading of new tasks suspended".to_string()
        }
        ControlCommand::ContinueLoading => {
            model.set_loading_enabled(true);
            "loading of new tasks resumed".to_string()
        }
        ControlCommand::LoadTask => {
            let process = model.generate_process();
            match model.load_new_task(process) {
                Ok(pid) => format!("loaded new task with PID {pid}"),
                Err(err) => format!("cannot load a new task: {err}"),
            }
        }
        ControlCommand::StopTask(pid) => match model.stop_process(pid) {
            Ok(()) => format!("process {pid} stopped"),
            Err(err) => err.to_string(),
        },
        ControlCommand::ResumeTask(pid) => match model.resume_process(pid) {
            Ok(()) => format!("process {pid} resumed"),
            Err(err) => err.to_string(),
        },
        ControlCommand::Kill(pid) => match model.kill_process(pid) {
            Ok(()) => format!("process {pid} killed"),
            Err(err) => err.to_string(),
        },
        ControlCommand::Finish => {
            model.finish_after_drain();
            "loading suspended; the model will stop once current tasks finish".to_string()
        }
        ControlCommand::Seed(seed) => {
            model.reseed(seed);
            format!("random generator seeded with {seed}")
        }
    }
}

const HELP: &str = "\
available commands:
  terminate            stop the model immediately
  speed+ / speed-      step the simulation speed up or down
  speed <value>        set the simulation speed
  stop loading         suspend automatic task admission
  continue loading     resume automatic task admission
  load task            admit one new task manually
  stop task <pid>      suspend an executing process
  continue task <pid>  resume a suspended process
  kill <pid>           destroy a process
  finish               stop admission and halt once current tasks finish
  seed <value>         reseed the random generator (negative: entropy)
  help                 show this help";
