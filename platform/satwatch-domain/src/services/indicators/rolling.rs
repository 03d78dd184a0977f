use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        self.sum += value;
        while self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
            }
        }

        if self.buf.len() == self.window {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }
}

/// Recursive exponential weighting without bias correction, seeded with the first value.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub fn with_span(span: usize) -> Self {
        Self {
            alpha: 2.0 / (span.max(1) as f64 + 1.0),
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        next
    }
}

/// Ratio of mean gains to mean losses of price differences over a trailing window.
/// The first observation contributes a zero difference.
#[derive(Debug, Clone)]
pub struct RollingRsi {
    window: usize,
    prev_close: Option<f64>,
    diffs: VecDeque<f64>,
}

impl RollingRsi {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            prev_close: None,
            diffs: VecDeque::new(),
        }
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        let diff = match self.prev_close {
            Some(prev) => close - prev,
            None => 0.0,
        };
        self.prev_close = Some(close);
        if self.window == 0 {
            return None;
        }

        self.diffs.push_back(diff);
        while self.diffs.len() > self.window {
            self.diffs.pop_front();
        }
        if self.diffs.len() < self.window {
            return None;
        }

        let gains: f64 = self.diffs.iter().filter(|d| **d > 0.0).sum();
        let losses: f64 = self.diffs.iter().filter(|d| **d < 0.0).map(|d| -d).sum();
        if losses == 0.0 {
            return (gains > 0.0).then_some(100.0);
        }
        let rs = gains / losses;
        Some(100.0 - (100.0 / (1.0 + rs)))
    }
}

/// Pearson correlation over a trailing window of paired observations. A missing
/// value anywhere in the window leaves the output undefined.
#[derive(Debug, Clone)]
pub struct RollingCorrelation {
    window: usize,
    buf: VecDeque<Option<(f64, f64)>>,
}

impl RollingCorrelation {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
        }
    }

    pub fn update(&mut self, pair: Option<(f64, f64)>) -> Option<f64> {
        if self.window < 2 {
            return None;
        }
        self.buf.push_back(pair);
        while self.buf.len() > self.window {
            self.buf.pop_front();
        }
        if self.buf.len() < self.window {
            return None;
        }

        let pairs: Option<Vec<(f64, f64)>> = self.buf.iter().copied().collect();
        let pairs = pairs?;
        let n = pairs.len() as f64;
        let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in &pairs {
            let dx = x - mean_x;
            let dy = y - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }
        if var_x <= 0.0 || var_y <= 0.0 {
            return None;
        }
        Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
    }
}
