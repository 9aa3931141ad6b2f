//! Color ramps anchored on the observed elevation range.

use crate::{Result, StyleError};
use carto_model::style::{Color, ColorStop, RampInterpolation};
use carto_model::RampStop;

/// Anchor relative stops on `[min, max]`.
///
/// Each stop's value is `min + position * (max - min)` and its label is the
/// position as a whole percentage. A flat surface (`min == max`) yields
/// stops that all sit on the one observed value.
pub fn anchor_stops(min: f64, max: f64, stops: &[RampStop]) -> Result<Vec<ColorStop>> {
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(StyleError::InvalidRamp(format!(
            "observed range [{}, {}] is not usable",
            min, max
        )));
    }
    if stops.len() < 2 {
        return Err(StyleError::InvalidRamp(format!(
            "{} stop(s), need at least 2",
            stops.len()
        )));
    }
    if stops
        .windows(2)
        .any(|w| w[1].position < w[0].position)
    {
        return Err(StyleError::InvalidRamp(
            "stop positions must be ascending".to_string(),
        ));
    }

    let range = max - min;
    Ok(stops
        .iter()
        .map(|stop| ColorStop {
            value: min + stop.position * range,
            color: stop.color,
            label_percent: (stop.position * 100.0).round().clamp(0.0, 100.0) as u8,
        })
        .collect())
}

/// Color at `value` under the given stops.
///
/// Values below the first stop take its color, values above the last take
/// the last color.
pub fn color_at(stops: &[ColorStop], value: f64, interpolation: RampInterpolation) -> Option<Color> {
    let first = stops.first()?;
    if value <= first.value {
        return Some(first.color);
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (&pair[0], &pair[1]);
        if value <= hi.value {
            return Some(match interpolation {
                RampInterpolation::Discrete => lo.color,
                RampInterpolation::Interpolated => {
                    let span = hi.value - lo.value;
                    if span <= 0.0 {
                        hi.color
                    } else {
                        lo.color.lerp(&hi.color, (value - lo.value) / span)
                    }
                }
            });
        }
    }
    stops.last().map(|s| s.color)
}
