//! # models::bar
//!
//! Defines [`Bar`], one OHLCV interval for one instrument, exactly as the
//! feed ships it inside `*_data` arrays and `live_update.candle`.

use serde::{Deserialize, Deserializer, Serialize};

/// Unix seconds. The feed already shifts these into exchange-local wall time.
pub type Timestamp = i64;

/// One OHLCV bar.
///
/// The last bar of a series is "in progress": the feed keeps sending the
/// same `time` with fresh OHLCV until the interval closes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time:   Timestamp,
    /// The feed writes NaN prices as `null`; those read back as NaN so
    /// [`Bar::is_priced`] filters the bar instead of failing the frame.
    #[serde(deserialize_with = "price_or_nan")]
    pub open:   f64,
    #[serde(deserialize_with = "price_or_nan")]
    pub high:   f64,
    #[serde(deserialize_with = "price_or_nan")]
    pub low:    f64,
    #[serde(deserialize_with = "price_or_nan")]
    pub close:  f64,
    /// Missing or `null` on some index feeds; treated as zero.
    #[serde(default, deserialize_with = "volume_or_zero")]
    pub volume: f64,
}

fn price_or_nan<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
}

fn volume_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(0.0))
}

impl Bar {
    pub fn new(time: Timestamp, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { time, open, high, low, close, volume }
    }

    /// `true` when all four prices are finite and strictly positive.
    ///
    /// The source emits zero-priced placeholder rows around session gaps;
    /// those never reach a chart.
    #[inline]
    pub fn is_priced(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }

    /// Copies OHLCV from `other`, keeping this bar's `time`.
    pub fn absorb(&mut self, other: &Bar) {
        self.open   = other.open;
        self.high   = other.high;
        self.low    = other.low;
        self.close  = other.close;
        self.volume = other.volume;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_price_is_not_priced() {
        assert!(Bar::new(1, 10.0, 12.0, 9.0, 11.0, 0.0).is_priced());
        assert!(!Bar::new(1, 0.0, 12.0, 9.0, 11.0, 0.0).is_priced());
        assert!(!Bar::new(1, 10.0, f64::NAN, 9.0, 11.0, 0.0).is_priced());
    }

    #[test]
    fn test_absorb_keeps_time() {
        let mut bar = Bar::new(103, 13.0, 13.0, 13.0, 13.0, 5.0);
        bar.absorb(&Bar::new(102, 12.0, 99.0, 12.0, 99.0, 7.0));
        assert_eq!(bar, Bar::new(103, 12.0, 99.0, 12.0, 99.0, 7.0));
    }

    #[test]
    fn test_volume_defaults_when_missing() {
        let bar: Bar = serde_json::from_str(
            r#"{"time":100,"open":10,"high":12,"low":9,"close":11}"#,
        )
        .unwrap();
        assert_eq!(bar.volume, 0.0);
    }

    #[test]
    fn test_null_fields_decode_to_filterable_bar() {
        let unpriced: Bar = serde_json::from_str(
            r#"{"time":100,"open":null,"high":12,"low":9,"close":11,"volume":3}"#,
        )
        .unwrap();
        assert!(unpriced.open.is_nan());
        assert!(!unpriced.is_priced());

        let no_volume: Bar = serde_json::from_str(
            r#"{"time":101,"open":10,"high":12,"low":9,"close":11,"volume":null}"#,
        )
        .unwrap();
        assert_eq!(no_volume.volume, 0.0);
        assert!(no_volume.is_priced());
    }
}
