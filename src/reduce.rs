//! Reductions that skip NaN entries.
//!
//! `nan_mean` and `nan_max` return `None` unless at least one finite value is present, leaving it
//! to the caller to decide what an empty reduction means. Infinite values still take part once a
//! finite value exists.
use num::Float;

/// Arithmetic mean of the non-NaN values, accumulated in `f64`.
pub fn nan_mean<T: Float, I: IntoIterator<Item = T>>(values: I) -> Option<f64> {
    let (mut sum, mut n, mut finite) = (0.0_f64, 0_usize, false);
    for v in values.into_iter().filter(|v| !v.is_nan()) {
        finite |= v.is_finite();
        sum += v.to_f64()?;
        n += 1;
    }
    (finite && n > 0).then(|| sum / n as f64)
}

/// Largest non-NaN value.
pub fn nan_max<T: Float, I: IntoIterator<Item = T>>(values: I) -> Option<T> {
    let mut best: Option<T> = None;
    let mut finite = false;
    for v in values.into_iter().filter(|v| !v.is_nan()) {
        finite |= v.is_finite();
        match best {
            Some(b) if b >= v => {}
            _ => best = Some(v),
        }
    }
    best.filter(|_| finite)
}

/// Position of the largest non-NaN value. The first of several equal maxima wins.
pub fn nan_argmax<T: Float, I: IntoIterator<Item = T>>(values: I) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(nan_argmax([1.0_f32, 5.0, f32::NAN, 3.0]), Some(1));
        assert_eq!(nan_argmax([f64::NAN, -2.0, -1.0]), Some(2));
    }

    #[test]
    fn test_argmax_first_of_ties() {
        assert_eq!(nan_argmax([2.0_f64, 7.0, 7.0]), Some(1));
    }

    #[test]
    fn test_all_nan_is_none() {
        assert_eq!(nan_argmax([f32::NAN, f32::NAN]), None);
        assert_eq!(nan_max([f32::NAN]), None);
        assert_eq!(nan_mean(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_only_infinite_is_none() {
        assert_eq!(nan_mean([f32::INFINITY, f32::NAN]), None);
        assert_eq!(nan_max([f64::NEG_INFINITY, f64::INFINITY]), None);
        assert_eq!(nan_max([1.0_f64, f64::INFINITY]), Some(f64::INFINITY));
    }

    #[test]
    fn test_mean_and_max() {
        assert_eq!(nan_mean([2.0_f32, f32::NAN, 6.0]), Some(4.0));
        assert_eq!(nan_max([-3.0_f64, f64::NAN, -1.5]), Some(-1.5));
    }
}
