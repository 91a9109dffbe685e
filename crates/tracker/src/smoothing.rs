use std::collections::VecDeque;

/// Average over the last `capacity` values. Empty buffers average to zero.
#[derive(Debug, Clone)]
pub struct TrailingAverage {
    values: VecDeque<f64>,
    capacity: usize,
}

impl TrailingAverage {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) -> f64 {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
        self.average()
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.values.iter().sum::<f64>() / self.values.len() as f64
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_only_the_last_values() {
        let mut average = TrailingAverage::new(3);
        assert_eq!(average.average(), 0.0);
        average.push(3.0);
        assert_eq!(average.push(6.0), 4.5);
        average.push(9.0);
        assert_eq!(average.push(0.0), 5.0);
        assert_eq!(average.len(), 3);
    }

    #[test]
    fn zero_capacity_keeps_one_value() {
        let mut average = TrailingAverage::new(0);
        average.push(1.0);
        assert_eq!(average.push(2.0), 2.0);
    }
}
