/// Running count, mean, min and max for the values of a single key.
///
/// The mean is updated incrementally, so no value needs to be retained.
/// An accumulator with `count == 0` holds no data; its other fields are meaningless
/// and it is never emitted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Accumulator {
    count: u64,
    mean: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator {
    /// An empty accumulator
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// An accumulator holding exactly one observation
    pub fn of(value: f64) -> Self {
        Self {
            count: 1,
            mean: value,
            min: value,
            max: value,
        }
    }

    /// Folds one observed value in.
    #[inline]
    pub fn fold(&mut self, value: f64) {
        if self.count == 0 {
            *self = Self::of(value);
            return;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        // each term is scaled before subtracting so values near f64::MAX can't overflow
        let n = self.count as f64;
        let mean = self.mean + (value / n - self.mean / n);
        self.mean = mean.clamp(self.min, self.max);
    }

    /// Merges `other` (same key, disjoint observations) into `self`.
    /// An empty operand on either side leaves the other unchanged.
    pub fn combine(&mut self, other: &Accumulator) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let count = self.count + other.count;
        // the count-weighted mean, written as a step from the larger side towards the smaller
        // one, so the step's weight is at most 1/2 and the scaled terms can't overflow
        let (big, small) = if self.count >= other.count {
            (*self, *other)
        } else {
            (*other, *self)
        };
        let w = small.count as f64 / count as f64;
        let mean = big.mean + (small.mean * w - big.mean * w);
        self.count = count;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        // rounding must not push the mean outside the observed range
        self.mean = mean.clamp(self.min, self.max);
    }

    /// Owned form of [`Accumulator::combine`]
    pub fn combined(mut self, other: &Accumulator) -> Self {
        self.combine(other);
        self
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// `None` until at least one value was folded in
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

impl FromIterator<f64> for Accumulator {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Accumulator::new();
        for v in iter {
            acc.fold(v);
        }
        acc
    }
}
