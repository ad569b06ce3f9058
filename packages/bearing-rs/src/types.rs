use crate::error::{Result, SignalError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// A named 1-D sequence of samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub samples: Vec<f64>,
}

impl Channel {
    pub fn new(name: impl Into<String>, samples: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Ordered mapping from unique channel name to samples.
///
/// Iteration order is insertion order, so every result map derived from a
/// `ChannelMap` lists channels in the same order the caller supplied them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Channel>", into = "Vec<Channel>")]
pub struct ChannelMap {
    channels: Vec<Channel>,
}

impl ChannelMap {
    /// Build a map from channels, validating names and samples.
    pub fn new(channels: Vec<Channel>) -> Result<Self> {
        let mut map = Self::default();
        for channel in channels {
            map.insert(channel)?;
        }
        Ok(map)
    }

    /// Append a channel. Fails on duplicate names, empty channels or
    /// non-finite samples.
    pub fn insert(&mut self, channel: Channel) -> Result<()> {
        if self.get(&channel.name).is_some() {
            return Err(SignalError::InvalidChannelMap(format!(
                "duplicate channel name '{}'",
                channel.name
            )));
        }
        if channel.is_empty() {
            return Err(SignalError::InvalidChannelMap(format!(
                "channel '{}' has no samples",
                channel.name
            )));
        }
        if let Some(idx) = channel.samples.iter().position(|v| !v.is_finite()) {
            return Err(SignalError::InvalidChannelMap(format!(
                "channel '{}' has a non-finite sample at index {}",
                channel.name, idx
            )));
        }
        self.channels.push(channel);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Channel> {
        self.channels.iter()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl TryFrom<Vec<Channel>> for ChannelMap {
    type Error = SignalError;

    fn try_from(channels: Vec<Channel>) -> std::result::Result<Self, Self::Error> {
        Self::new(channels)
    }
}

impl From<ChannelMap> for Vec<Channel> {
    fn from(map: ChannelMap) -> Self {
        map.channels
    }
}

impl<'a> IntoIterator for &'a ChannelMap {
    type Item = &'a Channel;
    type IntoIter = std::slice::Iter<'a, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

/// Ordered per-channel results keyed by channel name.
///
/// Serializes as a JSON object whose keys keep the input channel order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelResults<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for ChannelResults<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> ChannelResults<T> {
    pub(crate) fn push(&mut self, name: String, value: T) {
        self.entries.push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Serialize> Serialize for ChannelResults<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ChannelResults<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = ChannelResults<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from channel name to result")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, value)) = access.next_entry::<String, T>()? {
                    entries.push((name, value));
                }
                Ok(ChannelResults { entries })
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// Butterworth bandpass design parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Analog prototype order
    pub order: usize,
    /// Low cutoff frequency in Hz
    pub low_hz: f64,
    /// High cutoff frequency in Hz
    pub high_hz: f64,
    /// Sampling rate in Hz
    pub sample_rate: f64,
}

impl FilterSpec {
    pub fn new(order: usize, low_hz: f64, high_hz: f64, sample_rate: f64) -> Self {
        Self {
            order,
            low_hz,
            high_hz,
            sample_rate,
        }
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Check `order > 0` and `0 < low < high < nyquist`.
    pub fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(SignalError::InvalidFilterSpec(
                "filter order must be positive".to_string(),
            ));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(SignalError::InvalidFilterSpec(format!(
                "sampling rate must be positive, got {} Hz",
                self.sample_rate
            )));
        }
        if !self.low_hz.is_finite() || self.low_hz <= 0.0 {
            return Err(SignalError::InvalidFilterSpec(format!(
                "low cutoff must be positive, got {} Hz",
                self.low_hz
            )));
        }
        if !self.high_hz.is_finite() || self.low_hz >= self.high_hz {
            return Err(SignalError::InvalidFilterSpec(format!(
                "low cutoff ({} Hz) must be less than high cutoff ({} Hz)",
                self.low_hz, self.high_hz
            )));
        }
        if self.high_hz >= self.nyquist() {
            return Err(SignalError::InvalidFilterSpec(format!(
                "high cutoff ({} Hz) must be less than Nyquist ({} Hz)",
                self.high_hz,
                self.nyquist()
            )));
        }
        Ok(())
    }
}

/// Transfer function coefficients, `H(z) = B(z) / A(z)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCoefficients {
    /// Feedforward (numerator) coefficients
    pub b: Vec<f64>,
    /// Feedback (denominator) coefficients, `a[0] == 1`
    pub a: Vec<f64>,
}

impl FilterCoefficients {
    /// Degree of the digital transfer function
    pub fn order(&self) -> usize {
        self.a.len().max(self.b.len()).saturating_sub(1)
    }

    /// Number of taps in the longer of the two coefficient vectors
    pub fn taps(&self) -> usize {
        self.a.len().max(self.b.len())
    }
}

/// One-sided FFT magnitude spectrum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrumResult {
    /// Bin frequencies in Hz
    pub frequencies: Vec<f64>,
    /// Magnitude per bin
    pub amplitudes: Vec<f64>,
}

/// Short-time power spectral density
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramResult {
    pub frequencies: Vec<f64>,
    /// Segment centre times in seconds
    pub times: Vec<f64>,
    /// Power in `[frequency][time]` layout
    pub power: Vec<Vec<f64>>,
}

/// `true` marks an anomalous sample index
pub type AnomalyMask = Vec<bool>;

/// Detector output for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub mask: AnomalyMask,
    /// Per-sample anomaly score (higher = more anomalous)
    pub scores: Vec<f64>,
    /// Score at or above which samples were flagged, if any were
    pub threshold: Option<f64>,
    pub n_anomalies: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_map_preserves_order() {
        let map = ChannelMap::new(vec![
            Channel::new("vibration", vec![1.0, 2.0]),
            Channel::new("temperature", vec![3.0]),
            Channel::new("acoustic", vec![4.0]),
        ])
        .unwrap();
        let names: Vec<&str> = map.names().collect();
        assert_eq!(names, vec!["vibration", "temperature", "acoustic"]);
    }

    #[test]
    fn test_channel_map_rejects_bad_input() {
        let dup = ChannelMap::new(vec![
            Channel::new("a", vec![1.0]),
            Channel::new("a", vec![2.0]),
        ]);
        assert!(matches!(dup, Err(SignalError::InvalidChannelMap(_))));

        let empty = ChannelMap::new(vec![Channel::new("a", vec![])]);
        assert!(matches!(empty, Err(SignalError::InvalidChannelMap(_))));

        let nan = ChannelMap::new(vec![Channel::new("a", vec![1.0, f64::NAN])]);
        assert!(matches!(nan, Err(SignalError::InvalidChannelMap(_))));
    }

    #[test]
    fn test_channel_results_serialize_in_order() {
        let mut results = ChannelResults::default();
        results.push("zeta".to_string(), 1);
        results.push("alpha".to_string(), 2);
        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":2}"#);

        let back: ChannelResults<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.names().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_channel_map_deserialize_validates() {
        let json = r#"[{"name":"a","samples":[1.0]},{"name":"b","samples":[2.0,3.0]}]"#;
        let map: ChannelMap = serde_json::from_str(json).unwrap();
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(serde_json::to_string(&map).unwrap(), json);

        let dup = r#"[{"name":"a","samples":[1.0]},{"name":"a","samples":[2.0]}]"#;
        let err = serde_json::from_str::<ChannelMap>(dup).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{}", err);

        let empty = r#"[{"name":"e","samples":[]}]"#;
        assert!(serde_json::from_str::<ChannelMap>(empty).is_err());
    }

    #[test]
    fn test_filter_spec_validation() {
        assert!(FilterSpec::new(4, 500.0, 2000.0, 10000.0).validate().is_ok());
        assert!(FilterSpec::new(0, 500.0, 2000.0, 10000.0).validate().is_err());
        assert!(FilterSpec::new(4, 0.0, 2000.0, 10000.0).validate().is_err());
        assert!(FilterSpec::new(4, 2000.0, 500.0, 10000.0).validate().is_err());
        assert!(FilterSpec::new(4, 500.0, 5000.0, 10000.0).validate().is_err());
        assert!(FilterSpec::new(4, 500.0, 2000.0, f64::NAN).validate().is_err());
    }
}
