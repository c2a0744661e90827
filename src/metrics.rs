use crate::models::MetricRecord;

/// Mean of every present value of `name`. Records without the metric are
/// skipped; no observations at all yields `0.0`.
pub fn average_metric(records: &[MetricRecord], name: &str) -> f64 {
    // Running mean: a run of identical values averages to exactly that value.
    let mut mean = 0.0;
    let mut count = 0usize;
    for value in records.iter().filter_map(|record| record.get(name)) {
        count += 1;
        mean += (value - mean) / count as f64;
    }
    mean
}

/// The last `window` records, or all of them when there are fewer.
pub fn recent_window(records: &[MetricRecord], window: usize) -> &[MetricRecord] {
    &records[records.len().saturating_sub(window)..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(name: &str, value: f64) -> MetricRecord {
        MetricRecord::new(Utc::now()).with(name, value)
    }

    #[test]
    fn empty_sequence_averages_to_zero() {
        assert_eq!(average_metric(&[], "m"), 0.0);
    }

    #[test]
    fn absent_metric_averages_to_zero() {
        let records = vec![record("other", 1.0), record("other", 3.0)];
        assert_eq!(average_metric(&records, "m"), 0.0);
    }

    #[test]
    fn averages_present_values() {
        let records = vec![record("m", 2.0), record("m", 4.0)];
        assert_eq!(average_metric(&records, "m"), 3.0);
    }

    #[test]
    fn skips_records_missing_the_metric() {
        let mut null_record = MetricRecord::new(Utc::now());
        null_record.values.insert("m".to_string(), None);
        let records = vec![
            record("m", 2.0),
            record("other", 100.0),
            null_record,
            record("m", 4.0),
        ];
        assert_eq!(average_metric(&records, "m"), 3.0);
    }

    #[test]
    fn identical_values_average_exactly() {
        let records: Vec<_> = (0..7).map(|_| record("m", 0.8)).collect();
        assert_eq!(average_metric(&records, "m"), 0.8);
    }

    #[test]
    fn recent_window_takes_the_tail() {
        let records: Vec<_> = (0..10).map(|i| record("m", i as f64)).collect();
        let recent = recent_window(&records, 7);
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0].get("m"), Some(3.0));

        let short = &records[..3];
        assert_eq!(recent_window(short, 7).len(), 3);
    }
}
