use std::collections::HashMap;

use serde_json::Value;

use crate::stat_schema::StatSchema;

/// One player's metric values for one game.
pub type StatMap = HashMap<String, u32>;

/// A persisted metric value as it may arrive from storage or an edit form.
pub trait MetricValue {
    fn zero_default(&self) -> u32;
}

impl MetricValue for u32 {
    fn zero_default(&self) -> u32 {
        *self
    }
}

impl MetricValue for i64 {
    fn zero_default(&self) -> u32 {
        clamp_i64(*self)
    }
}

impl MetricValue for f64 {
    fn zero_default(&self) -> u32 {
        clamp_f64(*self)
    }
}

impl<T: MetricValue> MetricValue for Option<T> {
    fn zero_default(&self) -> u32 {
        self.as_ref().map(MetricValue::zero_default).unwrap_or(0)
    }
}

impl MetricValue for Value {
    fn zero_default(&self) -> u32 {
        match self {
            Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    u32::try_from(v).unwrap_or(u32::MAX)
                } else if let Some(v) = n.as_i64() {
                    clamp_i64(v)
                } else {
                    n.as_f64().map(clamp_f64).unwrap_or(0)
                }
            }
            Value::String(s) => parse_numeric_str(s),
            _ => 0,
        }
    }
}

/// Missing, malformed and negative values all read as zero. Absence and a
/// recorded zero are deliberately indistinguishable.
pub fn zero_default<V: MetricValue + ?Sized>(value: Option<&V>) -> u32 {
    value.map(MetricValue::zero_default).unwrap_or(0)
}

fn clamp_i64(v: i64) -> u32 {
    if v <= 0 {
        0
    } else {
        u32::try_from(v).unwrap_or(u32::MAX)
    }
}

fn clamp_f64(v: f64) -> u32 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    let t = v.trunc();
    if t >= u32::MAX as f64 {
        u32::MAX
    } else {
        t as u32
    }
}

fn parse_numeric_str(raw: &str) -> u32 {
    let s = raw.trim();
    if let Ok(v) = s.parse::<i64>() {
        return clamp_i64(v);
    }
    s.parse::<f64>().map(clamp_f64).unwrap_or(0)
}

/// Zero-fill every schema metric, then overlay everything persisted. Keys
/// outside the schema are carried through untouched.
pub fn merge<V: MetricValue>(schema: &StatSchema, persisted: &HashMap<String, V>) -> StatMap {
    let mut out: StatMap = schema.metric_names().map(|m| (m.to_string(), 0)).collect();
    for (key, value) in persisted {
        out.insert(key.clone(), value.zero_default());
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibleStat {
    pub category: &'static str,
    pub metric: &'static str,
    pub value: u32,
}

/// Schema-ordered rows for display. Stale keys stay in `record` but are not
/// surfaced here.
pub fn visible_stats(schema: &StatSchema, record: &StatMap) -> Vec<VisibleStat> {
    schema
        .categorized()
        .map(|(category, metric)| VisibleStat {
            category,
            metric,
            value: zero_default(record.get(metric)),
        })
        .collect()
}

/// Keys present in `record` that the schema does not show.
pub fn stale_metrics(schema: &StatSchema, record: &StatMap) -> Vec<String> {
    let mut out: Vec<String> = record
        .keys()
        .filter(|k| !schema.contains(k))
        .cloned()
        .collect();
    out.sort();
    out
}
