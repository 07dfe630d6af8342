//! Trend view state machine
//!
//! A `MetricView` holds the only persistent selection state of a trend screen,
//! `(granularity, reference_date)`, plus the last record set fetched from the
//! provider. Everything else (interval, filtered records, series, summary) is
//! derived on demand.
//!
//! Fetches are split into `begin_fetch` / `complete_fetch` so any host can
//! drive the provider call. Each ticket carries a generation number; only the
//! newest ticket's result is applied and a disposed view ignores late results.
//! Changing the selection also supersedes any ticket still in flight.

use crate::aggregate::{fill_missing_days, to_series};
use crate::config::ViewConfig;
use crate::error::{ComputeError, ProviderError};
use crate::filter::filter_by_period;
use crate::navigation::step;
use crate::period::{resolve_period, snap_to_unit_start, Calendar, Interval};
use crate::provider::HealthDataProvider;
use crate::sleep::SleepBreakdown;
use crate::summary::{goal_progress, summarize, summarize_values};
use crate::types::{Bucket, Direction, Granularity, HealthRecord, MetricKind, Summary};
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Token for one in-flight fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub metric: MetricKind,
    /// Interval selected when the fetch was issued
    pub interval: Interval,
}

/// What happened to a fetch result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Records replaced the view's data
    Applied { records: usize },
    /// A newer fetch was issued; result discarded
    Stale,
    /// The view was disposed; result discarded
    Disposed,
    /// Provider error; loading cleared, previous data kept
    Failed(ProviderError),
    /// Provider could not be initialized; view shows the empty state
    Unavailable,
}

/// State of one trend screen
#[derive(Debug, Clone)]
pub struct MetricView {
    config: ViewConfig,
    calendar: Calendar,
    instance_id: Uuid,
    granularity: Granularity,
    reference_date: NaiveDate,
    records: Vec<HealthRecord>,
    loading: bool,
    generation: u64,
    disposed: bool,
    provider_ready: Option<bool>,
    last_error: Option<ProviderError>,
}

impl MetricView {
    /// Create a view anchored on `today`
    pub fn new(config: ViewConfig, today: NaiveDate) -> Result<Self, ComputeError> {
        config.validate()?;
        let calendar = config.calendar()?;
        Ok(Self {
            granularity: config.default_granularity,
            calendar,
            instance_id: Uuid::new_v4(),
            reference_date: today,
            records: Vec::new(),
            loading: false,
            generation: 0,
            disposed: false,
            provider_ready: None,
            last_error: None,
            config,
        })
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn metric(&self) -> MetricKind {
        self.config.metric
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn records(&self) -> &[HealthRecord] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn last_error(&self) -> Option<&ProviderError> {
        self.last_error.as_ref()
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    /// Switch granularity. The reference date jumps to `today` only when the
    /// view is configured with `reset_on_granularity_change`.
    pub fn select_granularity(&mut self, granularity: Granularity, today: NaiveDate) {
        self.granularity = granularity;
        if self.config.reset_on_granularity_change {
            self.reference_date = today;
        }
        self.supersede_in_flight();
    }

    /// Step the reference date one granularity unit
    pub fn navigate(&mut self, direction: Direction) {
        self.reference_date = step(self.reference_date, self.granularity, direction);
        self.supersede_in_flight();
    }

    /// Jump to `date`, snapped to the start of the current unit
    pub fn pick_date(&mut self, date: NaiveDate) {
        self.reference_date = snap_to_unit_start(date, self.granularity, self.calendar.week_start);
        self.supersede_in_flight();
    }

    /// A fetch issued before a selection change covers the old interval; its
    /// result comes back as `Stale`.
    fn supersede_in_flight(&mut self) {
        self.generation += 1;
        self.loading = false;
    }

    /// Mark the view as gone; later fetch results are dropped
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.loading = false;
    }

    // ------------------------------------------------------------------
    // Fetch lifecycle
    // ------------------------------------------------------------------

    /// Issue a new fetch for the current interval, superseding earlier ones
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket {
            generation: self.generation,
            metric: self.config.metric,
            interval: self.interval(),
        }
    }

    /// Apply (or discard) the result of a fetch
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<HealthRecord>, ProviderError>,
    ) -> FetchOutcome {
        if self.disposed {
            debug!(
                instance_id = %self.instance_id,
                generation = ticket.generation,
                "dropping fetch result for disposed view"
            );
            return FetchOutcome::Disposed;
        }
        if ticket.generation != self.generation {
            debug!(
                instance_id = %self.instance_id,
                generation = ticket.generation,
                current = self.generation,
                "dropping stale fetch result"
            );
            return FetchOutcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(records) => {
                info!(
                    instance_id = %self.instance_id,
                    metric = self.config.metric.as_str(),
                    generation = ticket.generation,
                    records = records.len(),
                    "fetch applied"
                );
                let count = records.len();
                self.records = records;
                self.last_error = None;
                FetchOutcome::Applied { records: count }
            }
            Err(error) => {
                warn!(
                    instance_id = %self.instance_id,
                    metric = self.config.metric.as_str(),
                    generation = ticket.generation,
                    %error,
                    "fetch failed; keeping previous records"
                );
                self.last_error = Some(error.clone());
                FetchOutcome::Failed(error)
            }
        }
    }

    /// Initialize the provider if needed and fetch the current interval.
    ///
    /// Initialization is attempted once; after a failure the view stays in the
    /// empty state and does not retry.
    pub fn refresh<P>(&mut self, provider: &mut P) -> FetchOutcome
    where
        P: HealthDataProvider + ?Sized,
    {
        if self.disposed {
            return FetchOutcome::Disposed;
        }

        if self.provider_ready.is_none() {
            let ready = match provider.initialize() {
                Ok(true) => true,
                Ok(false) => {
                    warn!(
                        instance_id = %self.instance_id,
                        "health data provider declined initialization"
                    );
                    false
                }
                Err(error) => {
                    warn!(
                        instance_id = %self.instance_id,
                        %error,
                        "health data provider failed to initialize"
                    );
                    self.last_error = Some(error);
                    false
                }
            };
            self.provider_ready = Some(ready);
        }

        if self.provider_ready != Some(true) {
            self.records.clear();
            self.loading = false;
            return FetchOutcome::Unavailable;
        }

        let ticket = self.begin_fetch();
        let result = provider.fetch_records(
            ticket.metric,
            ticket.interval.start_utc(),
            ticket.interval.end_utc(),
        );
        self.complete_fetch(ticket, result)
    }

    // ------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------

    pub fn interval(&self) -> Interval {
        resolve_period(self.granularity, self.reference_date, &self.calendar)
    }

    /// Records of this view's metric inside the current interval
    pub fn filtered(&self) -> Vec<HealthRecord> {
        let metric = self.config.metric;
        filter_by_period(&self.records, &self.interval())
            .into_iter()
            .filter(|r| metric.value_of(r).is_some())
            .collect()
    }

    pub fn series(&self) -> Vec<Bucket> {
        let metric = self.config.metric;
        let series = to_series(
            &self.filtered(),
            self.granularity,
            &self.calendar,
            |r| metric.value_of(r),
            self.config.reduction(),
        );
        if self.config.fill_empty_days {
            fill_missing_days(series, &self.interval(), self.granularity)
        } else {
            series
        }
    }

    pub fn summary(&self) -> Summary {
        let metric = self.config.metric;
        summarize(&self.filtered(), |r| metric.value_of(r))
    }

    /// Stage breakdown, for sleep views only
    pub fn sleep_breakdown(&self) -> Option<SleepBreakdown> {
        (self.config.metric == MetricKind::Sleep)
            .then(|| SleepBreakdown::from_records(&self.filtered()))
    }

    /// Progress toward the configured daily goal. Day views compare the day's
    /// total, longer views compare the average of the daily buckets.
    pub fn goal_progress(&self) -> Option<f64> {
        let value = match self.granularity {
            Granularity::Day => self.summary().total,
            _ => {
                let daily: Vec<f64> = self
                    .series()
                    .iter()
                    .filter(|b| b.count > 0)
                    .map(|b| b.value)
                    .collect();
                summarize_values(&daily).average
            }
        };
        goal_progress(value, self.config.daily_goal)
    }
}
