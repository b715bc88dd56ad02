/// Consecutive-frame persistence counter for one signal kind.
///
/// Fires once when a run of positive readings reaches the threshold, then starts
/// over from zero so another full stretch is needed before it fires again.
#[derive(Debug, Clone)]
pub struct DebounceCounter {
    count: u32,
    threshold: u32,
    latch_until_clear: bool,
    latched: bool,
}

impl DebounceCounter {
    /// A threshold of 0 behaves like 1: the first positive reading fires.
    pub fn new(threshold: u32, latch_until_clear: bool) -> Self {
        Self {
            count: 0,
            threshold,
            latch_until_clear,
            latched: false,
        }
    }

    /// Feed one verdict. Returns true only on the call that crosses the threshold.
    pub fn update(&mut self, positive: bool) -> bool {
        if !positive {
            self.count = 0;
            self.latched = false;
            return false;
        }

        if self.latched {
            return false;
        }

        self.count = self.count.saturating_add(1);
        if self.count >= self.threshold.max(1) {
            self.count = 0;
            self.latched = self.latch_until_clear;
            return true;
        }

        false
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
