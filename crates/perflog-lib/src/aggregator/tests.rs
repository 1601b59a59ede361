//! Aggregation tests
//!
//! Exercise the aggregator with hand-built records, covering order
//! independence, lazy bucket creation and the capped sample lists.

#[cfg(test)]
mod aggregation_tests {
    use crate::aggregator::{ip_range, Aggregator};
    use crate::config::{AggregatorConfig, NormalizerConfig};
    use crate::models::{PathGroup, RequestRecord, SourceTag};
    use crate::normalize::PathNormalizer;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, day)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap()
    }

    fn aggregator(config: AggregatorConfig) -> Aggregator {
        let normalizer = PathNormalizer::new(&NormalizerConfig::default()).unwrap();
        Aggregator::new(&config, normalizer)
    }

    fn request(ts: NaiveDateTime, ip: &str, path: &str, queries: u64, size_kb: f64) -> RequestRecord {
        let mut r = RequestRecord::new(ts, SourceTag::Web, ip, path);
        r.queries = Some(queries);
        r.rows = Some(queries * 2);
        r.size_kb = Some(size_kb);
        r
    }

    fn sample_records() -> Vec<RequestRecord> {
        vec![
            request(at(1, 9), "10.0.0.1", "/details/1/a", 4, 1.5),
            request(at(1, 10), "10.0.0.2", "/details/2/a", 8, 2.25),
            request(at(2, 9), "10.0.1.1", "/api/cart?x=1", 60, 0.5),
        ]
    }

    #[test]
    fn test_every_dimension_gets_a_bucket() {
        let mut agg = aggregator(AggregatorConfig::default());
        for r in sample_records() {
            agg.ingest(&r);
        }
        let snap = agg.snapshot();

        assert_eq!(snap.global.requests, 3);
        assert_eq!(snap.global.queries, 72);
        assert_eq!(snap.global.unique_ips(), 3);
        assert_eq!(snap.daily.len(), 2);
        assert_eq!(snap.hourly.len(), 3);
        assert_eq!(snap.endpoints.len(), 2);
        assert_eq!(snap.ips.len(), 3);
        assert_eq!(snap.ip_ranges.len(), 2);

        let range = &snap.ip_ranges["10.0.0.0/24"];
        assert_eq!(range.requests, 2);
        assert_eq!(range.unique_ips(), 2);

        let details = snap
            .endpoints
            .iter()
            .find(|e| e.group == PathGroup::route("/details/{id}/a"))
            .unwrap();
        assert_eq!(details.hits(), 2);
        assert_eq!(details.totals.queries, 12);
        assert_eq!(details.history.len(), 1);
    }

    #[test]
    fn test_order_independent_totals() {
        let records = sample_records();
        let mut forward = aggregator(AggregatorConfig::default());
        let mut shuffled = aggregator(AggregatorConfig::default());
        for r in &records {
            forward.ingest(r);
        }
        for idx in [2, 0, 1] {
            shuffled.ingest(&records[idx]);
        }
        let a = forward.snapshot();
        let b = shuffled.snapshot();

        assert_eq!(a.global, b.global);
        assert_eq!(a.daily, b.daily);
        assert_eq!(a.ips, b.ips);
        assert_eq!(a.ip_ranges, b.ip_ranges);
        for (x, y) in a.endpoints.iter().zip(b.endpoints.iter()) {
            assert_eq!(x.group, y.group);
            assert_eq!(x.totals, y.totals);
        }
        for (x, y) in a.hourly.iter().zip(b.hourly.iter()) {
            assert_eq!((x.date, x.hour), (y.date, y.hour));
            assert_eq!(x.totals, y.totals);
        }
    }

    #[test]
    fn test_hourly_keyed_by_declared_timestamp() {
        let mut agg = aggregator(AggregatorConfig::default());
        agg.ingest(&request(at(3, 23), "1.1.1.1", "/x", 1, 0.0));
        agg.ingest(&request(at(3, 1), "1.1.1.1", "/x", 1, 0.0));
        let snap = agg.snapshot();
        let hours: Vec<u32> = snap.hourly.iter().map(|h| h.hour).collect();
        assert_eq!(hours, vec![1, 23]);
    }

    #[test]
    fn test_zero_valued_record_still_counts() {
        let mut agg = aggregator(AggregatorConfig::default());
        let bare = RequestRecord::new(at(1, 1), SourceTag::Web, "1.1.1.1", "/ping");
        agg.ingest(&bare);
        let snap = agg.snapshot();
        assert_eq!(snap.global.requests, 1);
        assert_eq!(snap.global.queries, 0);
        assert_eq!(snap.endpoints[0].hits(), 1);
        assert_eq!(snap.endpoints[0].samples.queries, vec![0.0]);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = aggregator(AggregatorConfig::default()).into_snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.global.mean_queries(), 0.0);
        assert!(snap.peak_hours(4).is_empty());
        assert!(snap.endpoints_by_egress().is_empty());
    }

    #[test]
    fn test_sample_and_event_caps() {
        let mut agg = aggregator(AggregatorConfig {
            sample_cap: 3,
            hourly_event_cap: 2,
        });
        for i in 0..5 {
            agg.ingest(&request(at(1, 9), "1.1.1.1", "/x", i, 0.0));
        }
        let snap = agg.snapshot();
        let endpoint = &snap.endpoints[0];
        assert_eq!(endpoint.hits(), 5);
        assert_eq!(endpoint.totals.queries, 10);
        assert_eq!(endpoint.samples.queries, vec![0.0, 1.0, 2.0]);
        assert_eq!(endpoint.samples.dropped, 2);
        assert_eq!(snap.hourly[0].events.len(), 2);
        assert_eq!(snap.hourly[0].dropped_events, 3);
        assert_eq!(snap.hourly[0].totals.requests, 5);
    }

    #[test]
    fn test_estimated_timestamps_counted() {
        let mut agg = aggregator(AggregatorConfig::default());
        let mut r = request(at(1, 1), "1.1.1.1", "/x", 1, 0.0);
        r.timestamp_estimated = true;
        agg.ingest(&r);
        assert_eq!(agg.snapshot().estimated_timestamps, 1);
    }

    #[test]
    fn test_commands_grouped_by_name() {
        let mut agg = aggregator(AggregatorConfig::default());
        let mut r = request(at(1, 1), "127.0.0.1", "import_feed 42", 5, 0.0);
        r.source = SourceTag::Cmd;
        let group = agg.ingest(&r);
        assert_eq!(group, PathGroup::command("import_feed 42"));
        assert_eq!(agg.snapshot().endpoints[0].source, SourceTag::Cmd);
    }

    #[test]
    fn test_peak_hours_ordering() {
        let mut agg = aggregator(AggregatorConfig::default());
        for _ in 0..3 {
            agg.ingest(&request(at(1, 14), "1.1.1.1", "/x", 1, 0.0));
        }
        agg.ingest(&request(at(1, 8), "1.1.1.1", "/x", 1, 0.0));
        agg.ingest(&request(at(1, 9), "1.1.1.1", "/x", 1, 0.0));
        let peaks = agg.snapshot().peak_hours(2);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].hour, peaks[0].requests), (14, 3));
        assert_eq!(peaks[1].hour, 8);
    }

    fn with_rows(path: &str, ip: &str, queries: u64, rows: u64) -> RequestRecord {
        let mut r = RequestRecord::new(at(1, 1), SourceTag::Web, ip, path);
        r.queries = Some(queries);
        r.rows = Some(rows);
        r
    }

    fn groups(endpoints: Vec<&crate::aggregator::EndpointStats>) -> Vec<String> {
        endpoints.iter().map(|e| e.group.to_string()).collect()
    }

    #[test]
    fn test_endpoints_ranked_by_rows() {
        let mut agg = aggregator(AggregatorConfig::default());
        agg.ingest(&with_rows("/light", "1.1.1.1", 50, 10));
        agg.ingest(&with_rows("/heavy", "1.1.1.1", 1, 9_000));
        agg.ingest(&with_rows("/a-tie", "1.1.1.1", 1, 10));
        let snap = agg.snapshot();
        assert_eq!(groups(snap.endpoints_by_rows()), vec!["/heavy", "/a-tie", "/light"]);
    }

    #[test]
    fn test_endpoints_ranked_by_query_volume() {
        let mut agg = aggregator(AggregatorConfig::default());
        agg.ingest(&with_rows("/light", "1.1.1.1", 50, 10));
        agg.ingest(&with_rows("/heavy", "1.1.1.1", 1, 9_000));
        agg.ingest(&with_rows("/heavy", "1.1.1.1", 1, 9_000));
        let snap = agg.snapshot();
        assert_eq!(groups(snap.endpoints_by_query_volume()), vec!["/light", "/heavy"]);
    }

    #[test]
    fn test_ranges_ranked_by_requests() {
        let mut agg = aggregator(AggregatorConfig::default());
        agg.ingest(&with_rows("/x", "10.0.9.1", 1, 1));
        agg.ingest(&with_rows("/x", "10.0.0.1", 1, 1));
        agg.ingest(&with_rows("/x", "172.16.5.2", 1, 1));
        agg.ingest(&with_rows("/x", "172.16.5.3", 1, 1));
        let snap = agg.snapshot();
        let ranked: Vec<(&str, u64)> = snap
            .ranges_by_requests()
            .into_iter()
            .map(|(range, bucket)| (range, bucket.requests))
            .collect();
        assert_eq!(
            ranked,
            vec![("172.16.5.0/24", 2), ("10.0.0.0/24", 1), ("10.0.9.0/24", 1)]
        );
    }

    #[test]
    fn test_huge_counts_saturate() {
        let mut agg = aggregator(AggregatorConfig::default());
        for _ in 0..2 {
            let mut r = RequestRecord::new(at(1, 1), SourceTag::Web, "1.1.1.1", "/x");
            r.queries = Some(u64::MAX);
            r.rows = Some(u64::MAX);
            agg.ingest(&r);
        }
        let snap = agg.snapshot();
        assert_eq!(snap.global.requests, 2);
        assert_eq!(snap.global.queries, u64::MAX);
        assert_eq!(snap.global.rows, u64::MAX);
        let endpoint = &snap.endpoints[0];
        assert_eq!(endpoint.totals.queries, u64::MAX);
        assert_eq!(endpoint.history.values().next().unwrap().queries, u64::MAX);
    }

    #[test]
    fn test_ip_range_formats() {
        assert_eq!(ip_range("192.168.4.77"), "192.168.4.0/24");
        assert_eq!(ip_range("::1"), "::1");
        assert_eq!(ip_range("unknown"), "unknown");
    }
}
