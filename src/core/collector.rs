use crate::core::records;
use crate::core::registry::ParserRegistry;
use crate::domain::model::{CollectOutcome, CollectReport, FetchRequest, Freshness, Record};
use crate::domain::ports::{Clock, PointWriter};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::time::{Duration, Instant};

/// Newest point may lag wall-clock time by this much before it counts as stale.
pub const DEFAULT_MAX_LAG: Duration = Duration::from_secs(2 * 3600);

/// Something the scheduler can run for a request.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, request: &FetchRequest) -> Result<CollectOutcome>;
}

/// Fetches one zone/data type from its parser and writes it to InfluxDB.
pub struct Collector<W: PointWriter, C: Clock> {
    registry: ParserRegistry,
    writer: W,
    clock: C,
    verbose: bool,
    max_lag: Duration,
}

impl<W: PointWriter, C: Clock> Collector<W, C> {
    pub fn new(registry: ParserRegistry, writer: W, clock: C) -> Self {
        Self {
            registry,
            writer,
            clock,
            verbose: false,
            max_lag: DEFAULT_MAX_LAG,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_max_lag(mut self, max_lag: Duration) -> Self {
        self.max_lag = max_lag;
        self
    }

    pub async fn collect(&self, request: &FetchRequest) -> Result<CollectOutcome> {
        let parser = self.registry.get(request.data_type, &request.zone)?;
        let args = request.zone.parser_args(request.data_type);

        let start = Instant::now();
        tracing::debug!("Calling parser for {} with args {:?}", request, args);
        let res = parser
            .fetch(&args, request.data_type, request.target_datetime)
            .await?;
        let elapsed = start.elapsed();

        if res.is_empty() {
            tracing::warn!("Parser returned nothing for {}", request);
            println!("Error: parser returned nothing ({})", request);
            return Ok(CollectOutcome::Empty);
        }

        let dts = records::record_datetimes(&res)?;
        let measurement = request.measurement();
        let points = records::to_points(&measurement, &res)?;

        tracing::debug!("Writing {} points to '{}'", points.len(), measurement);
        self.writer.write_points(&points).await?;

        // non-empty, checked above
        let first_datetime = dts.iter().min().copied().unwrap_or_default();
        let last_datetime = dts.iter().max().copied().unwrap_or_default();

        let report = CollectReport {
            request: request.clone(),
            measurement,
            points_written: points.len(),
            elapsed,
            first_datetime,
            last_datetime,
            freshness: self.freshness(request, last_datetime),
        };

        if report.freshness == Freshness::Stale {
            tracing::warn!(
                "Latest {} data is older than {:?} (last: {})",
                request,
                self.max_lag,
                last_datetime
            );
        }

        if self.verbose {
            println!("{}", self.verbose_summary(&report, &res));
        } else {
            println!("{}", self.quiet_summary(&report));
        }
        tracing::info!(
            "Fetched {} ({} points in {:.2}s)",
            request,
            report.points_written,
            elapsed.as_secs_f64()
        );

        Ok(CollectOutcome::Written(report))
    }

    fn freshness(&self, request: &FetchRequest, last: DateTime<Utc>) -> Freshness {
        if request.target_datetime.is_some() {
            return Freshness::Historical;
        }
        let lag = self.clock.now().signed_duration_since(last);
        match lag.to_std() {
            Ok(lag) if lag > self.max_lag => Freshness::Stale,
            _ => Freshness::Fresh,
        }
    }

    pub fn quiet_summary(&self, report: &CollectReport) -> String {
        let now = self.clock.now().with_timezone(&Local);
        format!(
            "{} Fetched {} {}",
            now.format("%Y-%m-%dT%H:%M:%S%.6f"),
            report.request.data_type,
            report.request.zone
        )
    }

    pub fn verbose_summary(&self, report: &CollectReport, res: &[Record]) -> String {
        let parser_result =
            serde_json::to_string_pretty(res).unwrap_or_else(|_| format!("{:?}", res));
        let lag = format_lag(self.max_lag);
        let warning = match report.freshness {
            Freshness::Stale => format!(" :( >{} from now !!!", lag),
            Freshness::Fresh => format!(
                " -- OK, <{} from now :) (now={} UTC)",
                lag,
                self.clock.now().to_rfc3339()
            ),
            Freshness::Historical => String::new(),
        };

        [
            "parser result:".to_string(),
            parser_result,
            "---------------------".to_string(),
            format!("took {:.2}s", report.elapsed.as_secs_f64()),
            format!(
                "min returned datetime: {} UTC",
                report.first_datetime.to_rfc3339()
            ),
            format!(
                "max returned datetime: {} UTC {}",
                report.last_datetime.to_rfc3339(),
                warning
            ),
        ]
        .join("\n")
    }
}

/// `2h`, `90m`, `45s`: the largest unit that divides the lag evenly.
fn format_lag(lag: Duration) -> String {
    let secs = lag.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[async_trait]
impl<W: PointWriter, C: Clock> JobRunner for Collector<W, C> {
    async fn run(&self, request: &FetchRequest) -> Result<CollectOutcome> {
        self.collect(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DataType, FieldValue, Point, ZoneKey};
    use crate::domain::ports::ZoneParser;
    use crate::utils::error::CollectorError;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Clone, Default)]
    struct MemoryWriter {
        points: Arc<Mutex<Vec<Point>>>,
    }

    #[async_trait]
    impl PointWriter for MemoryWriter {
        async fn write_points(&self, points: &[Point]) -> Result<()> {
            self.points.lock().unwrap().extend_from_slice(points);
            Ok(())
        }
    }

    struct StaticParser {
        output: serde_json::Value,
        seen_args: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl StaticParser {
        fn new(output: serde_json::Value) -> Self {
            Self {
                output,
                seen_args: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl ZoneParser for StaticParser {
        async fn fetch(
            &self,
            args: &[String],
            _data_type: DataType,
            _target_datetime: Option<DateTime<Utc>>,
        ) -> Result<Vec<Record>> {
            self.seen_args.lock().unwrap().push(args.to_vec());
            records::records_from_value(self.output.clone())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, 3, 14, 39, 16).unwrap()
    }

    fn collector_with(
        data_type: DataType,
        zone: &str,
        parser: StaticParser,
    ) -> (Collector<MemoryWriter, FixedClock>, MemoryWriter) {
        let mut registry = ParserRegistry::new();
        registry.register(data_type, ZoneKey::new(zone), Arc::new(parser));
        let writer = MemoryWriter::default();
        let collector = Collector::new(registry, writer.clone(), FixedClock(now()));
        (collector, writer)
    }

    #[tokio::test]
    async fn test_exchange_collect_writes_pair_measurement() {
        let parser = StaticParser::new(json!({
            "netFlow": -51.6563,
            "datetime": "2018-07-03T14:38:00+00:00",
            "source": "driftsdata.stattnet.no",
            "sortedZoneKeys": "AT->CH"
        }));
        let seen_args = parser.seen_args.clone();
        let (collector, writer) = collector_with(DataType::Exchange, "AT->CH", parser);

        let outcome = collector
            .collect(&FetchRequest::latest("AT->CH", DataType::Exchange))
            .await
            .unwrap();

        let CollectOutcome::Written(report) = outcome else {
            panic!("expected points to be written");
        };
        assert_eq!(report.measurement, "exchangeAT->CH");
        assert_eq!(report.points_written, 1);
        assert_eq!(report.freshness, Freshness::Fresh);
        assert_eq!(seen_args.lock().unwrap()[0], vec!["AT", "CH"]);

        let points = writer.points.lock().unwrap();
        assert_eq!(points[0].fields[0], ("netFlow".to_string(), FieldValue::Float(-51.6563)));
    }

    #[tokio::test]
    async fn test_empty_parser_output_writes_nothing() {
        let (collector, writer) = collector_with(DataType::Price, "AT", StaticParser::new(json!([])));

        let outcome = collector
            .collect(&FetchRequest::latest("AT", DataType::Price))
            .await
            .unwrap();

        assert_eq!(outcome, CollectOutcome::Empty);
        assert!(writer.points.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_datetime_aborts_before_write() {
        let parser = StaticParser::new(json!([
            {"datetime": "2018-07-03T14:00:00Z", "consumption": 7000.0},
            {"consumption": 7100.0}
        ]));
        let (collector, writer) = collector_with(DataType::Consumption, "AT", parser);

        let err = collector
            .collect(&FetchRequest::latest("AT", DataType::Consumption))
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::MissingDatetime { .. }));
        assert!(writer.points.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_old_data_is_reported_stale() {
        let parser = StaticParser::new(json!([
            {"datetime": "2018-07-02T00:00:00+02:00", "production": {"hydro": 1.0}},
            {"datetime": "2018-07-03T10:00:00Z", "production": {"hydro": 2.0}}
        ]));
        let (collector, _writer) = collector_with(DataType::Production, "AT", parser);

        let CollectOutcome::Written(report) = collector
            .collect(&FetchRequest::latest("AT", DataType::Production))
            .await
            .unwrap()
        else {
            panic!("expected points to be written");
        };

        assert_eq!(report.freshness, Freshness::Stale);
        assert_eq!(
            report.first_datetime,
            Utc.with_ymd_and_hms(2018, 7, 1, 22, 0, 0).unwrap()
        );
        assert_eq!(
            report.last_datetime,
            Utc.with_ymd_and_hms(2018, 7, 3, 10, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_target_datetime_skips_freshness_check() {
        let parser = StaticParser::new(json!([
            {"datetime": "2018-05-30T15:00:00Z", "price": 30.0}
        ]));
        let (collector, _writer) = collector_with(DataType::Price, "AT", parser);
        let request = FetchRequest {
            target_datetime: Some(Utc.with_ymd_and_hms(2018, 5, 30, 15, 0, 0).unwrap()),
            ..FetchRequest::latest("AT", DataType::Price)
        };

        let CollectOutcome::Written(report) = collector.collect(&request).await.unwrap() else {
            panic!("expected points to be written");
        };
        assert_eq!(report.freshness, Freshness::Historical);
    }

    #[tokio::test]
    async fn test_unregistered_zone_fails() {
        let (collector, _writer) = collector_with(DataType::Price, "AT", StaticParser::new(json!([])));
        let err = collector
            .collect(&FetchRequest::latest("DE", DataType::Price))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::UnknownParser { .. }));
    }

    #[test]
    fn test_verbose_summary_layout() {
        let (collector, _writer) = collector_with(DataType::Price, "AT", StaticParser::new(json!([])));
        let report = CollectReport {
            request: FetchRequest::latest("AT", DataType::Price),
            measurement: "price".to_string(),
            points_written: 1,
            elapsed: Duration::from_millis(90),
            first_datetime: Utc.with_ymd_and_hms(2018, 7, 3, 14, 38, 0).unwrap(),
            last_datetime: Utc.with_ymd_and_hms(2018, 7, 3, 14, 38, 0).unwrap(),
            freshness: Freshness::Fresh,
        };

        let summary = collector.verbose_summary(&report, &[]);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "parser result:");
        assert!(lines.contains(&"took 0.09s"));
        assert!(summary.contains("-- OK, <2h from now :)"));
    }

    #[test]
    fn test_verbose_summary_uses_configured_max_lag() {
        let (collector, _writer) = collector_with(DataType::Price, "AT", StaticParser::new(json!([])));
        let collector = collector.with_max_lag(Duration::from_secs(3 * 3600));
        let report = CollectReport {
            request: FetchRequest::latest("AT", DataType::Price),
            measurement: "price".to_string(),
            points_written: 1,
            elapsed: Duration::from_millis(90),
            first_datetime: Utc.with_ymd_and_hms(2018, 7, 3, 10, 0, 0).unwrap(),
            last_datetime: Utc.with_ymd_and_hms(2018, 7, 3, 10, 0, 0).unwrap(),
            freshness: Freshness::Stale,
        };

        let summary = collector.verbose_summary(&report, &[]);
        assert!(summary.ends_with(" :( >3h from now !!!"));
        assert!(!summary.contains("2h"));

        assert_eq!(format_lag(Duration::from_secs(90 * 60)), "90m");
        assert_eq!(format_lag(Duration::from_secs(45)), "45s");
    }

    #[test]
    fn test_quiet_summary_line() {
        let (collector, _writer) = collector_with(DataType::Price, "AT", StaticParser::new(json!([])));
        let report = CollectReport {
            request: FetchRequest::latest("AT", DataType::Price),
            measurement: "price".to_string(),
            points_written: 1,
            elapsed: Duration::from_millis(90),
            first_datetime: now(),
            last_datetime: now(),
            freshness: Freshness::Fresh,
        };

        let line = collector.quiet_summary(&report);
        let stamp = line
            .strip_suffix(" Fetched price AT")
            .expect("line should end with the request");

        let parsed = chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.6f").unwrap();
        assert_eq!(parsed, now().with_timezone(&Local).naive_local());
        assert_eq!(stamp.split('.').nth(1).map(str::len), Some(6));
    }
}
