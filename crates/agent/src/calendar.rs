//! Calendar collaborator
//!
//! Supplies the ordered free windows offered to the caller once greeting is
//! done. Provider failures degrade to an empty slot list, never a crash; the
//! relay only loses the ability to offer times.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Calendar lookup failures.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("free/busy request failed: {0}")]
    Http(String),

    #[error("malformed free/busy response: {0}")]
    Malformed(String),
}

/// Half-open free window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SlotWindow {
    /// Human-readable rendering used in engine instructions.
    pub fn display(&self) -> String {
        format!(
            "{} - {}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// Source of free windows for a given day.
#[async_trait]
pub trait SlotProvider: Send + Sync {
    /// Ordered, non-overlapping free windows for the day.
    async fn free_slots(&self, day: NaiveDate) -> Result<Vec<SlotWindow>, CalendarError>;
}

/// Walk a slot grid from `start` to `end`, skipping busy periods.
///
/// Busy periods must be sorted by start time. A slot overlapping any busy
/// period is skipped by jumping to that period's end, so returned windows
/// are ordered and non-overlapping by construction.
pub fn subtract_busy(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    slot: Duration,
    busy: &[(DateTime<Utc>, DateTime<Utc>)],
) -> Vec<SlotWindow> {
    let mut slots = Vec::new();
    let mut current = start;
    let mut idx = 0;

    while current + slot <= end {
        let slot_end = current + slot;
        while idx < busy.len() && busy[idx].1 <= current {
            idx += 1;
        }
        if idx < busy.len() && busy[idx].0 < slot_end && busy[idx].1 > current {
            current = busy[idx].1;
            continue;
        }
        slots.push(SlotWindow {
            start: current,
            end: slot_end,
        });
        current += slot;
    }
    slots
}

/// Fetch slots, degrading to an empty list on failure.
///
/// Returns the slots plus whether the provider errored, so the caller can
/// count calendar failures without treating them as fatal.
pub async fn slots_or_empty(provider: &dyn SlotProvider, day: NaiveDate) -> (Vec<SlotWindow>, bool) {
    match provider.free_slots(day).await {
        Ok(slots) => (slots, false),
        Err(e) => {
            tracing::warn!(error = %e, %day, "calendar lookup failed, offering no slots");
            (Vec::new(), true)
        }
    }
}

/// Free/busy lookup over the calendar provider's HTTP API.
pub struct HttpCalendarProvider {
    client: reqwest::Client,
    api_base: String,
    calendar_id: String,
    access_token: String,
    slot_minutes: i64,
    day_start_hour: u32,
    day_end_hour: u32,
}

impl HttpCalendarProvider {
    pub fn new(
        api_base: impl Into<String>,
        calendar_id: impl Into<String>,
        access_token: impl Into<String>,
        slot_minutes: i64,
        day_start_hour: u32,
        day_end_hour: u32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into(),
            calendar_id: calendar_id.into(),
            access_token: access_token.into(),
            slot_minutes,
            day_start_hour,
            day_end_hour,
        }
    }

    fn day_window(&self, day: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = Utc.from_utc_datetime(&day.and_hms_opt(self.day_start_hour, 0, 0)?);
        let end = Utc.from_utc_datetime(&day.and_hms_opt(self.day_end_hour, 0, 0)?);
        Some((start, end))
    }
}

#[derive(Debug, Deserialize)]
struct BusyPeriod {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[async_trait]
impl SlotProvider for HttpCalendarProvider {
    async fn free_slots(&self, day: NaiveDate) -> Result<Vec<SlotWindow>, CalendarError> {
        let (start, end) = self
            .day_window(day)
            .ok_or_else(|| CalendarError::Malformed("invalid day window hours".to_string()))?;

        let body = json!({
            "timeMin": start.to_rfc3339(),
            "timeMax": end.to_rfc3339(),
            "items": [{"id": self.calendar_id}],
        });
        let response = self
            .client
            .post(format!("{}/freeBusy", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| CalendarError::Http(e.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CalendarError::Malformed(e.to_string()))?;
        let busy_value = payload
            .pointer(&format!("/calendars/{}/busy", self.calendar_id))
            .cloned()
            .unwrap_or_else(|| json!([]));
        let mut busy: Vec<BusyPeriod> = serde_json::from_value(busy_value)
            .map_err(|e| CalendarError::Malformed(e.to_string()))?;
        busy.sort_by_key(|p| p.start);

        let periods: Vec<(DateTime<Utc>, DateTime<Utc>)> =
            busy.into_iter().map(|p| (p.start, p.end)).collect();
        Ok(subtract_busy(
            start,
            end,
            Duration::minutes(self.slot_minutes),
            &periods,
        ))
    }
}

/// Fixed availability, used in tests and reduced deployments.
pub struct StaticSlotProvider {
    slots: Vec<SlotWindow>,
}

impl StaticSlotProvider {
    pub fn new(slots: Vec<SlotWindow>) -> Self {
        Self { slots }
    }
}

#[async_trait]
impl SlotProvider for StaticSlotProvider {
    async fn free_slots(&self, _day: NaiveDate) -> Result<Vec<SlotWindow>, CalendarError> {
        Ok(self.slots.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_empty_busy_fills_the_grid() {
        let slots = subtract_busy(at(9, 0), at(11, 0), Duration::minutes(30), &[]);
        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].start, at(9, 0));
        assert_eq!(slots[3].end, at(11, 0));
    }

    #[test]
    fn test_busy_period_skipped() {
        let busy = vec![(at(9, 30), at(10, 0))];
        let slots = subtract_busy(at(9, 0), at(11, 0), Duration::minutes(30), &busy);
        let starts: Vec<_> = slots.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![at(9, 0), at(10, 0), at(10, 30)]);
    }

    #[test]
    fn test_partial_overlap_pushes_past_busy_end() {
        // Busy 9:15-9:45 knocks out both the 9:00 and 9:30 grid slots; the
        // next window starts at the busy period's end.
        let busy = vec![(at(9, 15), at(9, 45))];
        let slots = subtract_busy(at(9, 0), at(11, 0), Duration::minutes(30), &busy);
        assert_eq!(slots[0].start, at(9, 45));
        assert_eq!(slots[0].end, at(10, 15));
    }

    #[test]
    fn test_windows_are_ordered_and_disjoint() {
        let busy = vec![(at(9, 10), at(9, 20)), (at(10, 0), at(10, 40))];
        let slots = subtract_busy(at(9, 0), at(12, 0), Duration::minutes(30), &busy);
        for pair in slots.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[tokio::test]
    async fn test_degrades_to_empty_on_error() {
        struct FailingProvider;

        #[async_trait]
        impl SlotProvider for FailingProvider {
            async fn free_slots(&self, _day: NaiveDate) -> Result<Vec<SlotWindow>, CalendarError> {
                Err(CalendarError::Http("connection refused".to_string()))
            }
        }

        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let (slots, errored) = slots_or_empty(&FailingProvider, day).await;
        assert!(slots.is_empty());
        assert!(errored);
    }

    #[tokio::test]
    async fn test_static_provider_returns_fixed_slots() {
        let provider = StaticSlotProvider::new(vec![SlotWindow {
            start: at(10, 0),
            end: at(10, 30),
        }]);
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let (slots, errored) = slots_or_empty(&provider, day).await;
        assert_eq!(slots.len(), 1);
        assert!(!errored);
        assert_eq!(slots[0].display(), "10:00 - 10:30");
    }
}
