/*!
End-to-end scenarios for the tick loop, plus the invariants asserted after
every tick of every scenario.

The invariants cover the memory partition (tiling, coalescing, accounting),
process location (each live PID in exactly one place), device binding/state
agreement, and counter monotonicity. Scenario expectations follow the frozen
semantics: the last tick of a quantum executes no command, and IO completion
re-enqueues the process on the tick after the countdown finishes.
*/

use crate::devices::DeviceState;
use crate::os::OsModel;
use crate::process::ProcessState;
use crate::test_utils::{alu_only, inject, io_only, manual_model, small_config};

/// Assert every cross-tick invariant on the model.
fn check_invariants(model: &OsModel) {
    let manager = model.memory_manager();
    let segments = manager.segments();

    // Memory partition: starts tile [0, total) with no gap or overlap.
    let mut expected_start = 0;
    let mut free_total = 0;
    let mut previous_free = false;
    for (&start, segment) in segments {
        assert_eq!(start, expected_start, "segment map has a gap or overlap");
        expected_start += segment.len;
        if segment.owner.is_none() {
            assert!(!previous_free, "two adjacent free segments survived");
            free_total += segment.len;
            previous_free = true;
        } else {
            previous_free = false;
        }
    }
    assert_eq!(expected_start, manager.total_memory(), "partition is short");
    assert_eq!(free_total, manager.available_memory(), "free accounting drifted");

    // Every live PID owns exactly one segment and sits in exactly one place.
    for (&pid, process) in model.proc_table() {
        let owned = segments
            .values()
            .filter(|s| s.owner == Some(pid))
            .count();
        assert_eq!(owned, 1, "pid {pid} owns {owned} segments");

        let on_cpu = model
            .cpus()
            .iter()
            .filter(|cpu| cpu.current_process() == Some(pid))
            .count();
        let on_io = model
            .ios()
            .iter()
            .filter(|io| io.current_process() == Some(pid))
            .count();
        let in_cpu_queue = model
            .scheduler()
            .cpu_queue()
            .iter()
            .filter(|&&p| p == pid)
            .count();
        let in_io_queue = model
            .scheduler()
            .io_queue()
            .iter()
            .filter(|&&p| p == pid)
            .count();
        let stopped = matches!(
            process.state(),
            ProcessState::StoppedCpu | ProcessState::StoppedIo
        ) as usize;
        assert_eq!(
            on_cpu + on_io + in_cpu_queue + in_io_queue + stopped,
            1,
            "pid {pid} (state {:?}) is not in exactly one place",
            process.state()
        );
    }

    // Device binding/state agreement and quantum bounds.
    for cpu in model.cpus() {
        assert_eq!(
            cpu.state() == DeviceState::Running,
            cpu.current_process().is_some()
        );
        assert!(cpu.ticks_executed() <= cpu.quantum_size());
    }
    for io in model.ios() {
        assert_eq!(
            io.state() == DeviceState::Running,
            io.current_process().is_some()
        );
    }
}

/// Step once and re-assert the invariants plus counter monotonicity.
fn checked_step(model: &mut OsModel) {
    let t_multi_before = model.stats().os_stats().t_multi;
    let m_multi_before = model.stats().os_stats().m_multi;
    model.perform_tick().expect("tick must not fail");
    let os = model.stats().os_stats();
    assert!(os.t_multi >= t_multi_before + 1.0, "t_multi must advance");
    assert!(os.m_multi >= m_multi_before, "m_multi must not decrease");
    check_invariants(model);
}

fn run_until_drained(model: &mut OsModel, max_ticks: usize) -> usize {
    for tick in 1..=max_ticks {
        checked_step(model);
        if model.proc_table().is_empty() {
            return tick;
        }
    }
    panic!("workload did not drain within {max_ticks} ticks");
}

// -------------- Scenarios --------------

#[test]
fn single_cpu_only_process_runs_to_completion() {
    let mut model = manual_model(small_config(1, 0, 2, 16, 1));
    let pid = inject(&mut model, alu_only(3), 4);

    let mut max_commands = 0;
    let mut ticks = 0;
    for tick in 1..=32 {
        checked_step(&mut model);
        if let Some(process) = model.proc_table().get(&pid) {
            assert_eq!(process.counters.io_commands, 0);
            max_commands = max_commands.max(process.counters.total_commands);
        }
        if model.proc_table().is_empty() {
            ticks = tick;
            break;
        }
    }

    // With a quantum of 2 each quantum delivers one command: three ALU
    // quanta plus the exit tick, with a dispatch tick up front.
    assert_eq!(ticks, 8);
    assert_eq!(max_commands, 3);
    assert_eq!(model.stats().os_stats().m_multi, 1.0);
    assert_eq!(model.available_memory(), 16);
    assert_eq!(model.memory_manager().segments().len(), 1);
    assert_eq!(model.cpus()[0].state(), DeviceState::Idle);
}

#[test]
fn quantum_round_robin_alternates_two_processes() {
    let mut model = manual_model(small_config(1, 0, 2, 32, 2));
    let a = inject(&mut model, alu_only(4), 4);
    let b = inject(&mut model, alu_only(4), 4);

    let mut bound_trace = Vec::new();
    for _ in 0..64 {
        checked_step(&mut model);
        bound_trace.push(model.cpus()[0].current_process());
        if model.proc_table().is_empty() {
            break;
        }
    }

    assert!(model.proc_table().is_empty(), "both processes must finish");
    assert_eq!(model.stats().os_stats().m_multi, 2.0);

    // While both are live the binding alternates A, B, A, B per quantum.
    // Compress the per-tick trace into one entry per occupancy stretch.
    let mut occupancy: Vec<u32> = Vec::new();
    for pid in bound_trace.iter().filter_map(|&p| p) {
        if occupancy.last() != Some(&pid) {
            occupancy.push(pid);
        }
    }
    assert!(occupancy.len() >= 6);
    assert_eq!(&occupancy[..6], &[a, b, a, b, a, b]);
}

#[test]
fn io_round_trip_blocks_and_resumes() {
    let mut model = manual_model(small_config(1, 1, 100, 16, 1));
    let pid = inject(&mut model, io_only(1, 3), 4);

    // Tick 1: dispatched onto the CPU.
    checked_step(&mut model);
    assert_eq!(model.cpus()[0].current_process(), Some(pid));

    // Tick 2: the CPU issues the IO command; the handler blocks the process
    // and the dispatcher hands it to the idle controller the same tick.
    checked_step(&mut model);
    assert_eq!(model.cpus()[0].current_process(), None);
    assert_eq!(model.ios()[0].current_process(), Some(pid));
    assert_eq!(model.proc_table()[&pid].state(), ProcessState::IoRunning);

    // Ticks 3-5: the transfer counts down for exactly its duration.
    for _ in 0..3 {
        checked_step(&mut model);
        assert_eq!(model.ios()[0].current_process(), Some(pid));
    }
    assert_eq!(model.ios()[0].current_ticks_executed(), 3);

    // Tick 6: completion; back through the CPU queue onto the CPU.
    checked_step(&mut model);
    assert_eq!(model.ios()[0].state(), DeviceState::Idle);
    assert_eq!(model.cpus()[0].current_process(), Some(pid));
    assert_eq!(model.proc_table()[&pid].state(), ProcessState::Running);
    assert_eq!(model.ios()[0].total_ticks_executed(), 3);

    // Tick 7: the command budget is spent, so the process exits.
    checked_step(&mut model);
    assert!(model.proc_table().is_empty());
    assert_eq!(model.stats().os_stats().m_multi, 1.0);
    assert_eq!(model.available_memory(), 16);
}

#[test]
fn kill_while_bound_reclaims_within_the_tick() {
    let mut model = manual_model(small_config(1, 0, 10, 16, 1));
    let pid = inject(&mut model, alu_only(100), 4);

    checked_step(&mut model); // dispatch
    checked_step(&mut model); // mid-quantum
    assert_eq!(model.proc_table()[&pid].state(), ProcessState::Running);
    let used_before = model.used_memory();
    assert!(used_before > 0);

    model.kill_process(pid).unwrap();
    checked_step(&mut model);

    assert_eq!(model.cpus()[0].state(), DeviceState::Idle);
    assert!(model.proc_table().is_empty());
    assert_eq!(model.available_memory(), 16);
    assert_eq!(model.stats().os_stats().m_multi, 1.0);
}

#[test]
fn freeing_processes_coalesces_their_blocks() {
    // Three admitted processes tile memory back to back as
    // [P1:10][P2:10][P3:10]; killing them middle-first exercises the full
    // reclaim path (handler, deferred free, table removal) and must merge
    // the freed blocks with both neighbours.
    let mut model = manual_model(small_config(1, 0, 100, 30, 3));
    let p1 = inject(&mut model, alu_only(100), 10);
    let p2 = inject(&mut model, alu_only(100), 10);
    let p3 = inject(&mut model, alu_only(100), 10);

    let block_start = |model: &OsModel, pid| {
        model.proc_table()[&pid].memory_config.block_start.unwrap()
    };
    assert_eq!(block_start(&model, p1), 0);
    assert_eq!(block_start(&model, p2), 10);
    assert_eq!(block_start(&model, p3), 20);
    assert_eq!(model.available_memory(), 0);

    let free_segments = |model: &OsModel| -> Vec<(usize, usize)> {
        model
            .memory_manager()
            .segments()
            .iter()
            .filter(|(_, s)| s.owner.is_none())
            .map(|(&start, s)| (start, s.len))
            .collect()
    };

    // Free the middle block: a single free hole, neighbours untouched.
    model.kill_process(p2).unwrap();
    checked_step(&mut model);
    assert_eq!(free_segments(&model), vec![(10, 10)]);
    assert_eq!(block_start(&model, p1), 0);
    assert_eq!(block_start(&model, p3), 20);

    // Free the left neighbour: it merges with the hole.
    model.kill_process(p1).unwrap();
    checked_step(&mut model);
    assert_eq!(free_segments(&model), vec![(0, 20)]);

    // Free the last block: memory collapses to one free segment.
    model.kill_process(p3).unwrap();
    checked_step(&mut model);
    assert_eq!(free_segments(&model), vec![(0, 30)]);
    assert_eq!(model.memory_manager().segments().len(), 1);
    assert_eq!(model.available_memory(), 30);
    assert!(model.proc_table().is_empty());
    assert_eq!(model.stats().os_stats().m_multi, 3.0);
}

#[test]
fn kill_of_a_queued_process_also_reclaims() {
    let mut model = manual_model(small_config(1, 0, 10, 32, 2));
    let running = inject(&mut model, alu_only(100), 4);
    let queued = inject(&mut model, alu_only(100), 4);

    checked_step(&mut model);
    assert_eq!(model.cpus()[0].current_process(), Some(running));
    assert!(model.scheduler().cpu_queue().contains(&queued));

    model.kill_process(queued).unwrap();
    checked_step(&mut model);

    assert!(!model.proc_table().contains_key(&queued));
    assert!(!model.scheduler().cpu_queue().contains(&queued));
    assert_eq!(model.cpus()[0].current_process(), Some(running));
}

#[test]
fn stop_and_resume_round_trip() {
    let mut model = manual_model(small_config(1, 0, 10, 16, 1));
    let pid = inject(&mut model, alu_only(100), 4);

    checked_step(&mut model);
    assert_eq!(model.proc_table()[&pid].state(), ProcessState::Running);

    model.stop_process(pid).unwrap();
    checked_step(&mut model);
    assert_eq!(model.proc_table()[&pid].state(), ProcessState::StoppedCpu);
    assert_eq!(model.cpus()[0].state(), DeviceState::Idle);

    // A stopped process accrues nothing and stays off the queues.
    let passive_before = model.stats().process_stats(pid).unwrap().t_passive;
    checked_step(&mut model);
    assert_eq!(
        model.stats().process_stats(pid).unwrap().t_passive,
        passive_before
    );

    model.resume_process(pid).unwrap();
    checked_step(&mut model);
    // Back through READY; the same-tick dispatch may already have loaded it.
    assert!(matches!(
        model.proc_table()[&pid].state(),
        ProcessState::Ready | ProcessState::Running
    ));
    let mut regained_cpu = false;
    for _ in 0..3 {
        checked_step(&mut model);
        regained_cpu |= model.cpus()[0].current_process() == Some(pid);
    }
    assert!(regained_cpu);
}

#[test]
fn statistics_identities_hold_on_completion() {
    let mut model = manual_model(small_config(2, 1, 3, 64, 4));
    let pids = [
        inject(&mut model, alu_only(5), 6),
        inject(&mut model, io_only(2, 2), 6),
        inject(&mut model, alu_only(3), 6),
    ];

    run_until_drained(&mut model, 256);

    for pid in pids {
        let s = *model.stats().process_stats(pid).unwrap();
        assert!(s.t_end > s.t_start, "pid {pid} never completed");
        assert_eq!(s.t_multi, s.t_end - s.t_start);
        assert_eq!(s.t_multi, s.t_active + s.t_passive + s.t_sys_multi);
        assert_eq!(s.t_mono, s.t_active + s.t_sys_mono);
        assert!(s.t_active > 0.0);
    }

    let os = model.stats().os_stats();
    assert_eq!(os.m_multi, 3.0);
    assert!(os.t_proc_avg_multi > 0.0);
    assert!(os.t_proc_avg_mono > 0.0);
    assert!(os.m_mono > 0.0);
    assert!(os.d_multi > 0.0);
    assert!(os.d_system > 0.0);
}

#[test]
fn automatic_admission_soak_holds_invariants() {
    // Default generation parameters over a small machine, automatic
    // admission left on: a dense mixed workload for several hundred ticks.
    let mut config = small_config(2, 2, 4, 64, 6);
    config.process_generation.io_percentage_max = 0.6;
    let mut model = OsModel::new(config);

    for _ in 0..400 {
        checked_step(&mut model);
    }

    let os = model.stats().os_stats();
    assert!(os.tasks_loaded > 6, "admission should recycle table slots");
    assert!(os.m_multi > 0.0, "some processes must have completed");
}

#[test]
fn terminate_clears_every_structure() {
    let mut model = manual_model(small_config(2, 1, 4, 32, 3));
    inject(&mut model, alu_only(50), 4);
    inject(&mut model, io_only(4, 2), 4);
    for _ in 0..5 {
        checked_step(&mut model);
    }

    model.terminate();
    assert!(!model.running());
    assert!(model.proc_table().is_empty());
    assert!(model.scheduler().cpu_queue().is_empty());
    assert!(model.scheduler().io_queue().is_empty());
    assert_eq!(model.available_memory(), 32);
    assert_eq!(model.memory_manager().segments().len(), 1);
    assert!(model.memory().cells().iter().all(|c| c.is_none()));
    for cpu in model.cpus() {
        assert_eq!(cpu.state(), DeviceState::Idle);
        assert_eq!(cpu.total_commands_executed(), 0);
    }

    // Idempotent, and a stopped model ignores step().
    model.terminate();
    model.step();
    assert!(!model.running());
}

#[test]
fn finish_after_drain_stops_the_model() {
    let mut model = manual_model(small_config(1, 0, 4, 16, 1));
    inject(&mut model, alu_only(2), 4);
    model.finish_after_drain();

    for _ in 0..32 {
        if !model.running() {
            break;
        }
        model.step();
    }
    assert!(!model.running());
    assert!(model.proc_table().is_empty());
}

#[test]
fn fatal_errors_halt_the_model_via_step() {
    // A result shift outside the block makes the first ALU write land out
    // of memory: a corrupt-run fatal, caught by step().
    let mut config = small_config(1, 0, 10, 8, 1);
    config.command_generation.result_block_shift = 100;
    let mut model = manual_model(config);
    inject(&mut model, alu_only(5), 8);

    for _ in 0..4 {
        model.step();
    }
    assert!(!model.running());
}

#[test]
fn alu_results_round_trip_through_memory() {
    let mut model = manual_model(small_config(1, 0, 100, 16, 1));
    let pid = inject(&mut model, alu_only(20), 8);

    let (operands_addr, result_addr) = {
        let config = model.proc_table()[&pid].memory_config;
        (
            config.operands_addr.unwrap(),
            config.result_addr.unwrap(),
        )
    };

    for _ in 0..12 {
        checked_step(&mut model);
        let Some(process) = model.proc_table().get(&pid) else {
            break;
        };
        if let Some(crate::command::Command::Alu { addr1, addr2, op }) =
            process.current_command()
        {
            assert_eq!((addr1, addr2), (operands_addr, operands_addr + 1));
            let a = model.memory().read(addr1).unwrap().unwrap();
            let b = model.memory().read(addr2).unwrap().unwrap();
            let expected = crate::alu::execute(op, a, b).unwrap();
            assert_eq!(model.memory().read(result_addr).unwrap(), Some(expected));
        }
    }
}
