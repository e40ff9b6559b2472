#[cfg(test)]
mod tests {
    use anyhow::Result;
    use polars::prelude::*;

    use crate::dataset::step_3_feature_creation::{
        add_new_features, calculate_lagged_values, calculate_macd, calculate_mom,
        calculate_percent_b, calculate_rsi, calculate_sma, calculate_stochastic,
        calculate_williams_percent_r, ema, rolling_mean,
    };
    use crate::util::frame_utils::float_column;
    use crate::util::test_utils::{close_frame, generate_test_dataframe};

    fn values(series: &Series) -> Vec<f64> {
        series
            .f64()
            .expect("indicator should be f64")
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_rolling_mean_and_warmup() -> Result<()> {
        let mean = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3)?;
        assert!(mean[0].is_nan() && mean[1].is_nan());
        assert_close(mean[2], 2.0);
        assert_close(mean[4], 4.0);

        // A window longer than the series is never filled
        assert!(rolling_mean(&[1.0, 2.0], 3)?.iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn test_rolling_mean_skips_windows_with_nan() -> Result<()> {
        let mean = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0, 6.0], 2)?;
        assert!(mean[0].is_nan() && mean[1].is_nan() && mean[2].is_nan());
        assert_close(mean[3], 3.5);
        assert_close(mean[5], 5.5);
        Ok(())
    }

    #[test]
    fn test_ema_skips_leading_nans() -> Result<()> {
        let out = ema(&[f64::NAN, f64::NAN, 5.0, 5.0, 5.0, 5.0, 5.0], 3)?;
        assert_eq!(out.len(), 7);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_close(out[6], 5.0);

        // Not enough valid values for a single period
        assert!(ema(&[f64::NAN, 1.0, 2.0], 3)?.iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn test_ema_stays_inside_input_range() -> Result<()> {
        let rising: Vec<f64> = (0..40).map(|i| 10.0 + i as f64).collect();
        let out = ema(&rising, 9)?;
        let last = out[39];
        assert!(last > 10.0 && last < 49.0, "ema {}", last);
        // An EMA lags a rising series
        assert!(last < rising[39]);
        Ok(())
    }

    #[test]
    fn test_sma_and_momentum() -> Result<()> {
        let df = close_frame(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0])?;

        let sma = calculate_sma(&df, "close", 3)?;
        assert_eq!(sma.name().as_str(), "sma_3");
        assert_close(values(&sma)[5], 14.0);

        let mom = calculate_mom(&df, 2)?;
        let mom = values(&mom);
        assert!(mom[1].is_nan());
        assert_close(mom[4], 2.0);
        Ok(())
    }

    #[test]
    fn test_rsi_bounds_and_trend() -> Result<()> {
        let df = generate_test_dataframe(200, 3)?;
        let rsi = calculate_rsi(&df, 14)?;
        assert_eq!(rsi.name().as_str(), "rsi_14");
        assert_eq!(rsi.len(), 200);
        let rsi = values(&rsi);
        assert!(!rsi[199].is_nan());
        assert!(rsi.iter().filter(|v| !v.is_nan()).all(|v| (0.0..=100.0).contains(v)));

        // Gains twice the size of the losses keep the index above its midpoint
        let mut close = vec![100.0];
        for i in 1..60 {
            let step = if i % 2 == 0 { -1.0 } else { 2.0 };
            close.push(close[i - 1] + step);
        }
        let rsi = values(&calculate_rsi(&close_frame(&close)?, 14)?);
        assert!(rsi[59] > 50.0, "rsi {}", rsi[59]);

        // Too short for a single period
        let rsi = values(&calculate_rsi(&close_frame(&close[..10])?, 14)?);
        assert!(rsi.iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn test_macd_follows_trend() -> Result<()> {
        let rising: Vec<f64> = (0..80).map(|i| 100.0 + 0.5 * i as f64).collect();
        let (macd, signal) = calculate_macd(&close_frame(&rising)?, 12, 26, 9)?;

        assert_eq!(macd.name().as_str(), "macd_12_26_9");
        assert_eq!(signal.name().as_str(), "macd_12_26_9_signal");
        assert_eq!(macd.len(), 80);
        assert_eq!(signal.len(), 80);
        // The fast average sits above the slow one on a rising series
        assert!(values(&macd)[79] > 0.0);
        assert!(!values(&signal)[79].is_nan());

        let (macd, _) = calculate_macd(&close_frame(&rising[..10])?, 12, 26, 9)?;
        assert!(values(&macd).iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn test_oscillator_ranges() -> Result<()> {
        let df = generate_test_dataframe(200, 5)?;

        let stochastic = calculate_stochastic(&df, 5, 3)?;
        assert_eq!(stochastic.name().as_str(), "so_5_3");
        assert!(values(&stochastic)
            .iter()
            .filter(|v| !v.is_nan())
            .all(|v| (0.0..=100.0).contains(v)));

        let willr = values(&calculate_williams_percent_r(&df, 14)?);
        assert!(willr.iter().filter(|v| !v.is_nan()).all(|v| (-100.0..=0.0).contains(v)));
        Ok(())
    }

    #[test]
    fn test_flat_range_oscillators_are_zero() -> Result<()> {
        let df = df!(
            "high" => [5.0; 6],
            "low" => [5.0; 6],
            "close" => [5.0; 6],
        )?;
        let willr = values(&calculate_williams_percent_r(&df, 3)?);
        assert!(willr[1].is_nan());
        assert_eq!(willr[2], 0.0);
        Ok(())
    }

    #[test]
    fn test_percent_b_name_and_midpoint() -> Result<()> {
        let df = close_frame(&[1.0, 3.0, 2.0])?;
        let percent_b = calculate_percent_b(&df, 3, 2.0, 2.0)?;
        assert_eq!(percent_b.name().as_str(), "percent_b_3_2_2");
        // The last close equals the mean, so it sits half way between the bands
        assert_close(values(&percent_b)[2], 50.0);
        Ok(())
    }

    #[test]
    fn test_percent_b_uses_population_std() -> Result<()> {
        let df = close_frame(&[1.0, 2.0, 3.0])?;
        let percent_b = values(&calculate_percent_b(&df, 3, 1.0, 1.0)?);
        assert!(percent_b[1].is_nan());

        let std = (2.0f64 / 3.0).sqrt();
        assert_close(percent_b[2], (1.0 + std) / (2.0 * std) * 100.0);
        Ok(())
    }

    #[test]
    fn test_stochastic_over_rolling_extremes() -> Result<()> {
        let df = df!(
            "high" => [3.0, 4.0, 5.0, 6.0],
            "low" => [1.0, 2.0, 3.0, 4.0],
            "close" => [2.0, 3.0, 4.0, 5.0],
        )?;
        let stochastic = values(&calculate_stochastic(&df, 3, 1)?);
        assert!(stochastic[1].is_nan());
        assert_close(stochastic[2], 75.0);
        assert_close(stochastic[3], 75.0);

        let willr = values(&calculate_williams_percent_r(&df, 3)?);
        assert_close(willr[3], -25.0);
        Ok(())
    }

    #[test]
    fn test_lagged_values() -> Result<()> {
        let df = close_frame(&[1.0, 2.0, 3.0])?;
        let lagged = calculate_lagged_values(&df, "close", 2)?;
        assert_eq!(lagged.name().as_str(), "close_lagged_2");
        let lagged = values(&lagged);
        assert!(lagged[1].is_nan());
        assert_eq!(lagged[2], 1.0);
        Ok(())
    }

    #[test]
    fn test_add_new_features_keeps_rows() -> Result<()> {
        let df = generate_test_dataframe(150, 9)?;
        let augmented = add_new_features(&df)?;

        assert_eq!(augmented.height(), df.height());
        for name in [
            "sma_5",
            "sma_10",
            "vama_9",
            "tema_9",
            "ema_9",
            "dema_9",
            "mom_10",
            "macd_12_26_9",
            "percent_b_5_2_2",
            "chaikin_oscillator",
            "roc_10",
            "so_5_3",
            "trix_30",
            "rsi_14",
            "williams_percent_r_14",
            "close_lagged_1",
            "close_lagged_2",
            "close_lagged_3",
        ] {
            assert!(augmented.column(name).is_ok(), "missing {}", name);
        }

        // Every indicator is defined by the end of a long enough series
        let last = augmented.height() - 1;
        for column in augmented.get_columns() {
            let values = float_column(&augmented, column.name().as_str())?;
            assert!(!values[last].is_nan(), "{} undefined at the last row", column.name());
        }
        Ok(())
    }
}
