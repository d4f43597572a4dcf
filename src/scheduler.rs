/*!
Scheduler: the two FIFO queues feeding the devices.

`cpu_queue` holds READY processes waiting for a CPU; `io_queue` holds
IO_BLOCKED processes waiting for a controller. A PID sits in at most one
queue, and never while bound to a device. Queue operations bill their cost to
the OS ledgers at the moment they happen; the scheduler never touches device
or process state.
*/

use std::collections::VecDeque;

use crate::config::TimeCosts;
use crate::process::Pid;
use crate::stats::Statistics;

#[derive(Debug, Default)]
pub struct Scheduler {
    cpu_queue: VecDeque<Pid>,
    io_queue: VecDeque<Pid>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------- CPU queue --------------

    pub fn enqueue_cpu(&mut self, pid: Pid, stats: &mut Statistics, costs: &TimeCosts) {
        stats.bill_os_multi(costs.t_global);
        stats.bill_os_sys_multi(costs.t_global);
        self.cpu_queue.push_back(pid);
    }

    /// Pop the head of the CPU queue. Selection of the next process costs
    /// `t_next` on top of the shared-structure cost; an empty queue costs
    /// nothing.
    pub fn dequeue_cpu(&mut self, stats: &mut Statistics, costs: &TimeCosts) -> Option<Pid> {
        let pid = self.cpu_queue.pop_front()?;
        stats.bill_os_multi(costs.t_next + costs.t_global);
        stats.bill_os_sys_multi(costs.t_next + costs.t_global);
        Some(pid)
    }

    // -------------- IO queue --------------

    pub fn enqueue_io(&mut self, pid: Pid, stats: &mut Statistics, costs: &TimeCosts) {
        stats.bill_os_multi(costs.t_global);
        stats.bill_os_sys_multi(costs.t_global);
        self.io_queue.push_back(pid);
    }

    pub fn dequeue_io(&mut self, stats: &mut Statistics, costs: &TimeCosts) -> Option<Pid> {
        let pid = self.io_queue.pop_front()?;
        stats.bill_os_multi(costs.t_global);
        stats.bill_os_sys_multi(costs.t_global);
        Some(pid)
    }

    // -------------- Maintenance --------------

    /// Remove every occurrence of `pid` from both queues, without billing.
    /// Used to roll back a failed admission.
    pub(crate) fn forget(&mut self, pid: Pid) {
        self.cpu_queue.retain(|&p| p != pid);
        self.io_queue.retain(|&p| p != pid);
    }

    pub fn clear(&mut self) {
        self.cpu_queue.clear();
        self.io_queue.clear();
    }

    pub fn cpu_queue(&self) -> &VecDeque<Pid> {
        &self.cpu_queue
    }

    pub fn io_queue(&self) -> &VecDeque<Pid> {
        &self.io_queue
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.cpu_queue.contains(&pid) || self.io_queue.contains(&pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_are_fifo() {
        let mut scheduler = Scheduler::new();
        let mut stats = Statistics::new();
        let costs = TimeCosts::default();

        for pid in [3, 1, 2] {
            scheduler.enqueue_cpu(pid, &mut stats, &costs);
        }
        assert_eq!(scheduler.dequeue_cpu(&mut stats, &costs), Some(3));
        assert_eq!(scheduler.dequeue_cpu(&mut stats, &costs), Some(1));
        assert_eq!(scheduler.dequeue_cpu(&mut stats, &costs), Some(2));
        assert_eq!(scheduler.dequeue_cpu(&mut stats, &costs), None);
    }

    #[test]
    fn queue_ops_bill_the_os_ledgers() {
        let mut scheduler = Scheduler::new();
        let mut stats = Statistics::new();
        let costs = TimeCosts {
            t_global: 2.0,
            t_next: 3.0,
            ..TimeCosts::default()
        };

        scheduler.enqueue_cpu(1, &mut stats, &costs);
        assert_eq!(stats.os_stats().t_multi, 2.0);
        assert_eq!(stats.os_stats().t_sys_multi, 2.0);

        scheduler.dequeue_cpu(&mut stats, &costs);
        assert_eq!(stats.os_stats().t_multi, 2.0 + 5.0);
        assert_eq!(stats.os_stats().t_sys_multi, 2.0 + 5.0);

        // IO queue ops cost only the shared-structure access.
        scheduler.enqueue_io(2, &mut stats, &costs);
        scheduler.dequeue_io(&mut stats, &costs);
        assert_eq!(stats.os_stats().t_multi, 7.0 + 4.0);
    }

    #[test]
    fn empty_dequeue_bills_nothing() {
        let mut scheduler = Scheduler::new();
        let mut stats = Statistics::new();
        let costs = TimeCosts::default();
        assert_eq!(scheduler.dequeue_io(&mut stats, &costs), None);
        assert_eq!(stats.os_stats().t_multi, 0.0);
    }

    #[test]
    fn forget_drops_only_the_given_pid() {
        let mut scheduler = Scheduler::new();
        let mut stats = Statistics::new();
        let costs = TimeCosts::default();
        scheduler.enqueue_cpu(1, &mut stats, &costs);
        scheduler.enqueue_cpu(2, &mut stats, &costs);
        scheduler.forget(1);
        assert!(!scheduler.contains(1));
        assert_eq!(scheduler.dequeue_cpu(&mut stats, &costs), Some(2));
    }
}
