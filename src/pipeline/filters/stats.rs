/// Count, sum and sum of squares of one per-TU statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    pub count: usize,
    pub sum: f64,
    pub sum_sq: f64,
}

/// Mean and sample standard deviation derived from [`RunningStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LearnedStats {
    pub mean: f64,
    pub std_dev: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    /// Bessel-corrected statistics. The count is raised to 2 when fewer
    /// values were seen so tiny corpora never divide by zero.
    pub fn learned(&self) -> LearnedStats {
        let n = self.count.max(2) as f64;
        let mean = self.sum / n;
        let variance = (self.sum_sq - (self.sum * self.sum) / n) / (n - 1.0);
        LearnedStats {
            mean,
            // rounding can leave a tiny negative variance for constant inputs
            std_dev: variance.max(0.0).sqrt(),
        }
    }
}

impl LearnedStats {
    /// True when `value` lies more than `k` standard deviations from the mean.
    pub fn is_outlier(&self, value: f64, k: f64) -> bool {
        (value - self.mean).abs() > k * self.std_dev
    }
}
