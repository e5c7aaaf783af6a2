use regen_protocol::MetricsView;

/// Per-session counters. These survive a reset; only the simulation state is cleared.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMetrics {
    pub activations: u64,
    pub rejected_activations: u64,
    pub runs: u64,
    pub successes: u64,
    pub resets: u64,
}

impl SessionMetrics {
    pub fn record_activation(&mut self, accepted: bool) {
        if accepted {
            self.activations += 1;
        } else {
            self.rejected_activations += 1;
        }
    }

    pub fn record_run(&mut self, success: bool) {
        self.runs += 1;
        if success {
            self.successes += 1;
        }
    }

    pub fn record_reset(&mut self) {
        self.resets += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.successes as f64 / self.runs as f64
        }
    }

    pub fn view(&self) -> MetricsView {
        MetricsView {
            activations: self.activations,
            rejected_activations: self.rejected_activations,
            runs: self.runs,
            successes: self.successes,
            resets: self.resets,
        }
    }
}
