//! Flourish burst timing

use hueshift_domain::MAX_FLOURISH_BURSTS;
use rand::Rng;
use std::time::Duration;

/// Offsets from the start of a wait at which extra flourish bursts fire
///
/// At most [`MAX_FLOURISH_BURSTS`] offsets are produced. Each one is drawn
/// independently: the first lands in the first third of the interval, the
/// second in the last third. A single burst picks one of the two thirds at
/// random. The result is sorted and every offset is below `interval`.
///
/// # Examples
///
/// ```
/// use hueshift_rotator::flourish_offsets;
/// use std::time::Duration;
///
/// let interval = Duration::from_secs(90);
/// let offsets = flourish_offsets(interval, 2, &mut rand::rng());
/// assert_eq!(offsets.len(), 2);
/// assert!(offsets[0] < Duration::from_secs(30));
/// assert!(offsets[1] >= Duration::from_secs(60));
/// ```
pub fn flourish_offsets<R: Rng + ?Sized>(interval: Duration, bursts: u8, rng: &mut R) -> Vec<Duration> {
    if interval.is_zero() {
        return Vec::new();
    }

    let windows: &[(f64, f64)] = match bursts.min(MAX_FLOURISH_BURSTS) {
        0 => &[],
        1 if rng.random_bool(0.5) => &[(0.0, 1.0 / 3.0)],
        1 => &[(2.0 / 3.0, 1.0)],
        _ => &[(0.0, 1.0 / 3.0), (2.0 / 3.0, 1.0)],
    };

    let mut offsets: Vec<Duration> = windows
        .iter()
        .map(|&(low, high)| interval.mul_f64(rng.random_range(low..high)))
        .map(|offset| offset.min(interval.saturating_sub(Duration::from_nanos(1))))
        .collect();
    offsets.sort();
    offsets
}
