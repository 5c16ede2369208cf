use chrono::Duration;
use serde::Serialize;

/// The two middle elements of a sorted slice (the same one twice for odd lengths)
fn middle<T: Copy>(sorted: &[T]) -> Option<(T, T)> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 0 {
        Some((sorted[mid - 1], sorted[mid]))
    } else {
        Some((sorted[mid], sorted[mid]))
    }
}

pub fn average_duration(samples: &[Duration]) -> Duration {
    if samples.is_empty() {
        return Duration::zero();
    }
    let total: i128 = samples.iter().map(|d| d.num_milliseconds() as i128).sum();
    Duration::milliseconds((total / samples.len() as i128) as i64)
}

/// Median of `samples`; sorts them in place.
pub fn median_duration(samples: &mut [Duration]) -> Duration {
    samples.sort();
    match middle(samples) {
        Some((a, b)) if a == b => a,
        Some((a, b)) => (a + b) / 2,
        None => Duration::zero(),
    }
}

pub fn average_count(samples: &[u64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<u64>() as f64 / samples.len() as f64
}

/// Median of `samples`; sorts them in place.
pub fn median_count(samples: &mut [u64]) -> f64 {
    samples.sort_unstable();
    middle(samples).map_or(0.0, |(a, b)| (a as f64 + b as f64) / 2.0)
}

/// `part / whole * 100`, or zero when there is nothing to divide by
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

/// Average and median of a set of durations, plus how many fed into them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationStat {
    #[serde(rename = "average_hours", serialize_with = "as_hours")]
    pub average: Duration,
    #[serde(rename = "median_hours", serialize_with = "as_hours")]
    pub median: Duration,
    pub samples: usize,
}

impl Default for DurationStat {
    fn default() -> Self {
        Self {
            average: Duration::zero(),
            median: Duration::zero(),
            samples: 0,
        }
    }
}

impl DurationStat {
    pub fn from_samples(mut samples: Vec<Duration>) -> Self {
        Self {
            average: average_duration(&samples),
            median: median_duration(&mut samples),
            samples: samples.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CountStat {
    pub total: u64,
    pub average: f64,
    pub median: f64,
    pub max: u64,
}

impl CountStat {
    pub fn from_samples(mut samples: Vec<u64>) -> Self {
        Self {
            total: samples.iter().sum(),
            average: average_count(&samples),
            median: median_count(&mut samples),
            max: samples.iter().copied().max().unwrap_or(0),
        }
    }
}

fn as_hours<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.num_milliseconds() as f64 / 3_600_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: i64) -> Duration {
        Duration::hours(n)
    }

    #[test]
    fn test_median_duration_cases() {
        assert_eq!(median_duration(&mut []), Duration::zero());
        assert_eq!(median_duration(&mut [h(10)]), h(10));
        assert_eq!(median_duration(&mut [h(10), h(20)]), h(15));
        assert_eq!(median_duration(&mut [h(10), h(20), h(30)]), h(20));
        assert_eq!(median_duration(&mut [h(30), h(10), h(20)]), h(20));
    }

    #[test]
    fn test_average_duration() {
        assert_eq!(average_duration(&[]), Duration::zero());
        assert_eq!(average_duration(&[h(10), h(20), h(60)]), h(30));
    }

    #[test]
    fn test_counts() {
        assert_eq!(average_count(&[]), 0.0);
        assert_eq!(median_count(&mut []), 0.0);
        assert_eq!(average_count(&[1, 2, 6]), 3.0);
        assert_eq!(median_count(&mut [4, 1]), 2.5);
        assert_eq!(median_count(&mut [9, 1, 4]), 4.0);
    }

    #[test]
    fn test_percentage_guards_zero() {
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(3, 10), 30.0);
    }

    #[test]
    fn test_stat_structs() {
        let stat = DurationStat::from_samples(vec![h(30), h(10)]);
        assert_eq!(stat.average, h(20));
        assert_eq!(stat.median, h(20));
        assert_eq!(stat.samples, 2);
        assert_eq!(DurationStat::from_samples(vec![]), DurationStat::default());

        let counts = CountStat::from_samples(vec![0, 5, 1]);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.average, 2.0);
        assert_eq!(counts.median, 1.0);
        assert_eq!(counts.max, 5);
    }

    #[test]
    fn test_duration_stat_serializes_hours() {
        let stat = DurationStat::from_samples(vec![h(3)]);
        let json = serde_json::to_value(stat).unwrap();
        assert_eq!(json["average_hours"], serde_json::json!(3.0));
        assert_eq!(json["median_hours"], serde_json::json!(3.0));
        assert_eq!(json["samples"], serde_json::json!(1));
    }
}
