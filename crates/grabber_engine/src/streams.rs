use std::cmp::Ordering;

use serde_json::Value;

use crate::backend::RawFormat;
use crate::StreamDescriptor;

/// Sentinel the resolver uses for "this format carries no audio".
const NO_CODEC: &str = "none";

/// Keeps audio-bearing formats and orders them by descending bitrate.
///
/// Formats without a parsable bitrate go last; the sort is stable, so equal or
/// unknown bitrates keep the resolver's order.
pub fn select_audio_streams(formats: Vec<RawFormat>) -> Vec<StreamDescriptor> {
    let mut streams: Vec<StreamDescriptor> = formats
        .into_iter()
        .filter(has_audio)
        .map(|format| StreamDescriptor {
            bitrate_kbps: parse_bitrate(&format.abr),
            format_id: format.format_id,
            container: format.ext.filter(|ext| !ext.is_empty()),
            codec: format.acodec,
        })
        .collect();

    streams.sort_by(|a, b| match (a.bitrate_kbps, b.bitrate_kbps) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    streams
}

fn has_audio(format: &RawFormat) -> bool {
    format
        .acodec
        .as_deref()
        .is_some_and(|codec| !codec.is_empty() && codec != NO_CODEC)
}

/// Accepts numbers and numeric strings; anything else counts as unknown.
pub(crate) fn parse_bitrate(value: &Value) -> Option<f64> {
    let kbps = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (kbps.is_finite() && kbps >= 0.0).then_some(kbps)
}
