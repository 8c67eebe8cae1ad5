use super::luby::luby;


/// Exponential moving average with a warm-up calibrator; `get` is
/// unbiased even before `window` samples have been seen.
pub struct Ema {
    val: f64,
    cal: f64,
    sca: f64,
}

impl Ema {
    pub fn new(window: usize) -> Ema {
        Ema {
            val: 0.0,
            cal: 0.0,
            sca: 1.0 / (window as f64),
        }
    }

    pub fn update(&mut self, x: f64) {
        self.val = self.sca * x + (1.0 - self.sca) * self.val;
        self.cal = self.sca + (1.0 - self.sca) * self.cal;
    }

    pub fn get(&self) -> f64 {
        if self.cal > 0.0 {
            self.val / self.cal
        } else {
            0.0
        }
    }

    // Snaps the average to `x`, keeping the calibrator.
    pub fn force(&mut self, x: f64) {
        self.val = x * self.cal;
    }
}


#[derive(Clone, Copy, Debug)]
pub struct RestartSettings {
    pub luby_restart: bool, // Use the Luby schedule exclusively instead of the moving averages.
    pub restart_first: f64, // The initial restart limit of the Luby schedule.
    pub restart_inc: f64,   // The factor with which the restart limit is multiplied in each restart.
    pub lbd_fast_window: usize,
    pub lbd_slow_window: usize,
    pub trail_window: usize,
    pub restart_margin: f64,  // Restart when fast * margin exceeds slow.
    pub blocking_factor: f64, // Block when the trail exceeds its average by this factor.
    pub blocking_floor: u64,  // No blocking before this many conflicts.
    pub luby_until: u64,      // Conflicts driven by the Luby fallback at the start of the search.
}

impl Default for RestartSettings {
    fn default() -> Self {
        RestartSettings {
            luby_restart: false,
            restart_first: 100.0,
            restart_inc: 2.0,
            lbd_fast_window: 50,
            lbd_slow_window: 10000,
            trail_window: 5000,
            restart_margin: 0.8,
            blocking_factor: 1.4,
            blocking_floor: 10000,
            luby_until: 2000,
        }
    }
}


/// Decides when the search should restart. Two moving averages over the
/// LBD of freshly learnt clauses detect phases where recent clauses are
/// worse than the long-term average; a trail average blocks restarts
/// while the solver keeps extending its assignment. A Luby schedule
/// covers the early conflicts, before the averages mean anything.
pub struct RestartControl {
    settings: RestartSettings,
    lbd_fast: Ema,
    lbd_slow: Ema,
    trail_avg: Ema,
    conflicts: u64,
    conflicts_at_restart: u64,
    restarts: u32,
    pub blocked: u64,
}

impl RestartControl {
    pub fn new(settings: RestartSettings) -> Self {
        RestartControl {
            lbd_fast: Ema::new(settings.lbd_fast_window),
            lbd_slow: Ema::new(settings.lbd_slow_window),
            trail_avg: Ema::new(settings.trail_window),
            settings,
            conflicts: 0,
            conflicts_at_restart: 0,
            restarts: 0,
            blocked: 0,
        }
    }

    // Fresh averages for a new solve; the blocked counter survives.
    pub fn reset(&mut self, settings: RestartSettings) {
        self.lbd_fast = Ema::new(settings.lbd_fast_window);
        self.lbd_slow = Ema::new(settings.lbd_slow_window);
        self.trail_avg = Ema::new(settings.trail_window);
        self.settings = settings;
        self.conflicts = 0;
        self.conflicts_at_restart = 0;
        self.restarts = 0;
    }

    pub fn on_conflict(&mut self, lbd: u32, trail: usize) {
        self.conflicts += 1;
        self.lbd_fast.update(lbd as f64);
        self.lbd_slow.update(lbd as f64);
        self.trail_avg.update(trail as f64);
    }

    pub fn should_restart(&mut self, trail: usize) -> bool {
        if self.settings.luby_restart || self.conflicts < self.settings.luby_until {
            let bound = luby(self.settings.restart_inc, self.restarts) * self.settings.restart_first;
            return self.conflicts - self.conflicts_at_restart >= bound as u64;
        }

        if self.lbd_fast.get() * self.settings.restart_margin <= self.lbd_slow.get() {
            return false;
        }

        // Recent clause quality is poor, but the trail keeps growing past
        // its average: the solver is making assignment progress, hold the
        // restart back.
        if self.conflicts > self.settings.blocking_floor
            && (trail as f64) > self.settings.blocking_factor * self.trail_avg.get()
        {
            self.blocked += 1;
            self.lbd_fast.force(self.lbd_slow.get());
            return false;
        }

        true
    }

    pub fn on_restart(&mut self) {
        self.restarts += 1;
        self.conflicts_at_restart = self.conflicts;
        self.lbd_fast.force(self.lbd_slow.get());
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ema_converges() {
        let mut ema = Ema::new(8);
        for _ in 0..100 {
            ema.update(5.0);
        }
        assert!((ema.get() - 5.0).abs() < 1e-9);

        // early samples are unbiased thanks to the calibrator
        let mut young = Ema::new(1000);
        young.update(3.0);
        assert!((young.get() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_luby_fallback_drives_early_restarts() {
        let mut ctl = RestartControl::new(RestartSettings::default());
        for _ in 0..100 {
            ctl.on_conflict(5, 10);
        }
        assert!(ctl.should_restart(10));
        ctl.on_restart();
        assert!(!ctl.should_restart(10));
    }

    #[test]
    fn test_ema_restart_after_quality_drop() {
        let settings = RestartSettings {
            luby_until: 0,
            blocking_floor: 1 << 60,
            ..Default::default()
        };
        let mut ctl = RestartControl::new(settings);

        for _ in 0..1000 {
            ctl.on_conflict(3, 10);
        }
        assert!(!ctl.should_restart(10));

        // a burst of bad clauses lifts the fast average over the margin
        for _ in 0..100 {
            ctl.on_conflict(30, 10);
        }
        assert!(ctl.should_restart(10));
    }

    #[test]
    fn test_blocking_on_growing_trail() {
        let settings = RestartSettings {
            luby_until: 0,
            blocking_floor: 0,
            ..Default::default()
        };
        let mut ctl = RestartControl::new(settings);

        for _ in 0..1000 {
            ctl.on_conflict(3, 100);
        }
        for _ in 0..100 {
            ctl.on_conflict(30, 100);
        }
        // same quality drop, but the trail is far above its average
        assert!(!ctl.should_restart(1000));
        assert_eq!(ctl.blocked, 1);
    }
}
