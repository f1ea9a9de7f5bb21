/// Ordered time series data structures
///
/// Upstream history arrives as JSON objects keyed by date strings
/// (`{"1/9/23": 100, "1/10/23": 150}`). Those keys do not sort
/// chronologically, so the series keeps the document order instead of
/// parsing dates. Every derived computation indexes by position.

use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    pub date: String,
    pub value: u64,
}

impl DataPoint {
    pub fn new(date: impl Into<String>, value: u64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

/// Chronological cumulative values for one metric of one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeSeries {
    points: Vec<DataPoint>,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<DataPoint>) -> Self {
        Self { points }
    }

    /// Builds a series with synthetic positional dates (`d0`, `d1`, ...).
    pub fn from_values(values: &[u64]) -> Self {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| DataPoint::new(format!("d{}", i), value))
            .collect();
        Self { points }
    }

    pub fn push(&mut self, date: impl Into<String>, value: u64) {
        self.points.push(DataPoint::new(date, value));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<u64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn last(&self) -> Option<&DataPoint> {
        self.points.last()
    }

    pub fn last_value(&self) -> u64 {
        self.points.last().map(|p| p.value).unwrap_or(0)
    }
}

/// Cases, deaths and recoveries of one entity over the same dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub cases: TimeSeries,
    #[serde(default)]
    pub deaths: TimeSeries,
    #[serde(default)]
    pub recovered: TimeSeries,
}

impl Timeline {
    pub fn has_cases(&self) -> bool {
        !self.cases.is_empty()
    }
}

impl Serialize for TimeSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.points.len()))?;
        for point in &self.points {
            map.serialize_entry(&point.date, &point.value)?;
        }
        map.end()
    }
}

/// Vaccine coverage entries come as `[{ "date": .., "total": .. }]`.
#[derive(Deserialize)]
struct CoverageEntry {
    date: String,
    #[serde(default)]
    total: Option<f64>,
}

struct TimeSeriesVisitor;

impl<'de> Visitor<'de> for TimeSeriesVisitor {
    type Value = TimeSeries;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a date-keyed object or an array of {date, total} entries")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TimeSeries, A::Error> {
        let mut points = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((date, value)) = access.next_entry::<String, Option<f64>>()? {
            points.push(DataPoint::new(date, clamp_count(value)));
        }
        Ok(TimeSeries { points })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<TimeSeries, A::Error> {
        let mut points = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_element::<CoverageEntry>()? {
            points.push(DataPoint::new(entry.date, clamp_count(entry.total)));
        }
        Ok(TimeSeries { points })
    }

    fn visit_unit<E: de::Error>(self) -> Result<TimeSeries, E> {
        Ok(TimeSeries::new())
    }
}

impl<'de> Deserialize<'de> for TimeSeries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TimeSeriesVisitor)
    }
}

/// Upstream counts are occasionally floats or null.
pub(crate) fn clamp_count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}
