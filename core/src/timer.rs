#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed,
    Running { started_at: u64 },
    Stopped,
}

/// Attempt timer. It never schedules anything itself; the host polls
/// [`Timer::tick`] on whatever cadence it renders at.
#[derive(Clone, Debug)]
pub struct Timer {
    state: TimerState,
    elapsed_ms: u64,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            elapsed_ms: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, TimerState::Running { .. })
    }

    pub fn reset(&mut self) {
        self.state = TimerState::Armed;
        self.elapsed_ms = 0;
    }

    /// First-interaction signal. Only an armed timer starts.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.state != TimerState::Armed {
            return false;
        }
        self.state = TimerState::Running { started_at: now_ms };
        self.elapsed_ms = 0;
        true
    }

    pub fn tick(&mut self, now_ms: u64) -> u64 {
        if let TimerState::Running { started_at } = self.state {
            let elapsed = now_ms.saturating_sub(started_at);
            self.elapsed_ms = self.elapsed_ms.max(elapsed);
        }
        self.elapsed_ms
    }

    /// Solved signal. Freezes elapsed time at `now_ms`.
    pub fn stop(&mut self, now_ms: u64) -> Option<u64> {
        if !self.is_running() {
            return None;
        }
        self.tick(now_ms);
        self.state = TimerState::Stopped;
        Some(self.elapsed_ms)
    }

    /// Last computed value; the authoritative result once stopped.
    pub fn elapsed(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn current_elapsed(&self, now_ms: u64) -> u64 {
        match self.state {
            TimerState::Running { started_at } => {
                self.elapsed_ms.max(now_ms.saturating_sub(started_at))
            }
            _ => self.elapsed_ms,
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_elapsed(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
