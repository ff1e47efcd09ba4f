use core::fmt;
use std::time::Duration;

use txhandoff::engine::PortCounters;
use txhandoff::Stats;

/// The result of a generator run.
#[derive(Clone, Debug)]
pub struct Score {
    /// What the operator did with the bursts.
    pub(crate) stats: Stats,
    /// Bursts never built since no packet buffer was free.
    pub(crate) starved: u64,
    /// What the device transmitted, per interface in configuration order.
    pub(crate) ports: Vec<(String, PortCounters)>,
    /// From the first burst until the engine drained the channel.
    pub(crate) time: Duration,
}

impl Score {
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn starved(&self) -> u64 {
        self.starved
    }

    pub fn ports(&self) -> &[(String, PortCounters)] {
        &self.ports
    }

    /// Totals over all interfaces.
    pub fn transmitted(&self) -> PortCounters {
        self.ports.iter().fold(PortCounters::default(), |acc, (_, port)| PortCounters {
            bursts: acc.bursts + port.bursts,
            packets: acc.packets + port.packets,
            bytes: acc.bytes + port.bytes,
        })
    }

    fn elapsed_secs(&self) -> f32 {
        self.time.as_secs_f32()
    }

    fn packet_rate(&self) -> f32 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            self.transmitted().packets as f32 / secs
        } else {
            0.0
        }
    }

    fn lost(&self) -> u64 {
        self.stats.dropped() + self.stats.deferred + self.starved
    }

    fn loss_rate(&self) -> f32 {
        let total = self.stats.total() + self.starved;
        if total == 0 {
            return 0.0;
        }
        self.lost() as f32 / total as f32
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // Same layout as an iperf interval report:
        //
        // ```text
        // [ tx]  0.0- 1.0 sec   131 KBytes  90112.0 Packets/sec    0/   91 (0%)
        // ```
        write!(
            f,
            "[ tx] {begin}-{end} sec\t{total} KBytes\t{rate} Packets/sec\t\
            {lost}/\t{bursts} ({loss_percent}%)",
            begin = 0.0,
            end = self.elapsed_secs(),
            total = self.transmitted().bytes / 1024,
            rate = self.packet_rate(),
            lost = self.lost(),
            bursts = self.stats.total() + self.starved,
            loss_percent = self.loss_rate() * 100.0,
        )
    }
}
