//! Technical indicators
//!
//! Rolling-window values are `None` until the window has enough history.

/// RSI reported when prices did not move over the whole window
pub const RSI_NEUTRAL: f64 = 50.0;

/// Simple Moving Average over trailing `window` values
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return result;
    }

    let mut sum: f64 = values[..window].iter().sum();
    result[window - 1] = Some(sum / window as f64);

    for i in window..values.len() {
        sum += values[i] - values[i - window];
        result[i] = Some(sum / window as f64);
    }

    result
}

/// Relative Strength Index using simple rolling means of gains and losses
///
/// The value at row `i` uses the `period` close-to-close changes ending at
/// `i`, so the first defined row is `period`. A window without losses gives
/// 100, and a window without any movement gives [`RSI_NEUTRAL`].
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return result;
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            }
        })
        .unzip();

    // gains[j] is the change into row j + 1
    for i in period..closes.len() {
        let window = (i - period)..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
        result[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain > 0.0 {
            100.0
        } else {
            RSI_NEUTRAL
        }
    } else {
        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&values, 3);

        assert_eq!(result[0], None);
        assert_eq!(result[1], None);
        assert_relative_eq!(result[2].unwrap(), 2.0);
        assert_relative_eq!(result[3].unwrap(), 3.0);
        assert_relative_eq!(result[4].unwrap(), 4.0);
    }

    #[test]
    fn test_sma_short_input() {
        assert!(sma(&[1.0, 2.0], 3).iter().all(Option::is_none));
        assert!(sma(&[1.0, 2.0], 0).iter().all(Option::is_none));
    }

    #[test]
    fn test_rsi_warmup() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64).sin()).collect();
        let result = rsi(&closes, 14);

        assert!(result[..14].iter().all(Option::is_none));
        assert!(result[14..].iter().all(Option::is_some));
    }

    #[test]
    fn test_rsi_known_value() {
        // two gains of 1, one loss of 2 over a 3-change window
        let closes = vec![10.0, 11.0, 12.0, 10.0];
        let result = rsi(&closes, 3);
        let rs = (2.0 / 3.0) / (2.0 / 3.0);
        assert_relative_eq!(result[3].unwrap(), 100.0 - 100.0 / (1.0 + rs));
    }

    #[test]
    fn test_rsi_zero_loss_policy() {
        let flat = vec![42.0; 30];
        assert!(rsi(&flat, 14).iter().flatten().all(|&v| v == RSI_NEUTRAL));

        let rising: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert!(rsi(&rising, 14).iter().flatten().all(|&v| v == 100.0));

        let falling: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        assert!(rsi(&falling, 14).iter().flatten().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rsi_bounded() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + 10.0 * ((i as f64) * 0.37).sin() + (i % 7) as f64)
            .collect();
        for value in rsi(&closes, 14).into_iter().flatten() {
            assert!(value.is_finite());
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
