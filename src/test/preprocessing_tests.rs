#[cfg(test)]
mod tests {
    use anyhow::Result;
    use polars::prelude::*;

    use crate::dataset::step_4_preprocessing::{
        apply_hampel_filter, apply_robust_scaler, apply_savgol_filter, apply_standard_scaler,
        drop_missing_rows, ScalingMethod,
    };
    use crate::error::DatasetError;
    use crate::util::frame_utils::{check_for_nans, float_column};
    use crate::util::test_utils::{close_frame, generate_test_dataframe};

    #[test]
    fn test_drop_missing_rows() -> Result<()> {
        let df = df!(
            "close" => [1.0, f64::NAN, 3.0, 4.0],
            "up" => [0.0, 1.0, f64::NAN, 1.0],
            "symbol" => [Some("A"), Some("B"), Some("C"), None],
        )?;
        let cleaned = drop_missing_rows(&df)?;

        assert_eq!(cleaned.height(), 1);
        assert_eq!(float_column(&cleaned, "close")?, vec![1.0]);
        assert_eq!(check_for_nans(&cleaned, &["close", "up"])?, 0);
        Ok(())
    }

    #[test]
    fn test_hampel_replaces_spike() -> Result<()> {
        let mut close = vec![10.0; 20];
        close[10] = 100.0;
        let df = close_frame(&close)?;

        let filtered = apply_hampel_filter(&df, "close", 5, 3.0)?;
        let values = float_column(&filtered, "close")?;
        assert_eq!(values[10], 10.0);
        assert!(values.iter().all(|&v| v == 10.0));
        Ok(())
    }

    #[test]
    fn test_hampel_keeps_regular_series() -> Result<()> {
        let df = generate_test_dataframe(100, 21)?;
        let filtered = apply_hampel_filter(&df, "close", 15, 1_000.0)?;
        assert_eq!(float_column(&filtered, "close")?, float_column(&df, "close")?);
        Ok(())
    }

    #[test]
    fn test_hampel_invalid_parameters() -> Result<()> {
        let df = close_frame(&[1.0, 2.0, 3.0])?;
        assert!(matches!(
            apply_hampel_filter(&df, "close", 0, 3.0),
            Err(DatasetError::InvalidParameter { name: "window_size", .. })
        ));
        assert!(matches!(
            apply_hampel_filter(&df, "close", 3, -1.0),
            Err(DatasetError::InvalidParameter { name: "n_sigmas", .. })
        ));
        // An even window has no centre row
        assert!(matches!(
            apply_hampel_filter(&df, "close", 4, 3.0),
            Err(DatasetError::InvalidParameter { name: "window_size", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_hampel_leaves_edges_and_nan_windows() -> Result<()> {
        let mut close = vec![10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0, 11.0, 10.0];
        close[0] = 500.0;
        close[4] = 500.0;
        close[8] = f64::NAN;
        let df = close_frame(&close)?;

        let filtered = float_column(&apply_hampel_filter(&df, "close", 3, 3.0)?, "close")?;
        // No full window is centred on the first row
        assert_eq!(filtered[0], 500.0);
        // Window [11, 500, 11]: median 11, MAD 0
        assert_eq!(filtered[4], 11.0);
        // The window of row 7 holds the NaN
        assert_eq!(filtered[7], 11.0);
        assert!(filtered[8].is_nan());
        Ok(())
    }

    #[test]
    fn test_savgol_preserves_polynomial_interior() -> Result<()> {
        let close: Vec<f64> = (0..20).map(|i| 0.5 * (i * i) as f64 - 3.0 * i as f64).collect();
        let df = close_frame(&close)?;

        let smoothed = apply_savgol_filter(&df, "close", 5, 2)?;
        let values = float_column(&smoothed, "close")?;
        for i in 2..18 {
            assert!((values[i] - close[i]).abs() < 1e-6, "row {}", i);
        }
        Ok(())
    }

    #[test]
    fn test_savgol_reduces_noise() -> Result<()> {
        let close: Vec<f64> = (0..60)
            .map(|i| if i % 2 == 0 { 101.0 } else { 99.0 })
            .collect();
        let df = close_frame(&close)?;

        let smoothed = float_column(&apply_savgol_filter(&df, "close", 11, 2)?, "close")?;
        for value in &smoothed[10..50] {
            assert!((value - 100.0).abs() < 1.0);
        }
        Ok(())
    }

    #[test]
    fn test_savgol_invalid_parameters() -> Result<()> {
        let df = close_frame(&[1.0, 2.0, 3.0])?;
        assert!(matches!(
            apply_savgol_filter(&df, "close", 4, 2),
            Err(DatasetError::InvalidParameter { name: "window_size", .. })
        ));
        assert!(matches!(
            apply_savgol_filter(&df, "close", 5, 5),
            Err(DatasetError::InvalidParameter { name: "polynomial_degree", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_standard_scaler() -> Result<()> {
        let df = df!(
            "close" => [1.0, 2.0, 3.0, 4.0],
            "flat" => [7.0, 7.0, 7.0, 7.0],
            "up" => [1.0, 0.0, 1.0, 0.0],
        )?;
        let (scaled, params) = apply_standard_scaler(&df, &["up"])?;

        assert_eq!(params.method, ScalingMethod::Standard);
        assert!(!params.columns.contains_key("up"));
        assert_eq!(float_column(&scaled, "up")?, vec![1.0, 0.0, 1.0, 0.0]);

        let close = float_column(&scaled, "close")?;
        let mean = close.iter().sum::<f64>() / close.len() as f64;
        let variance = close.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / close.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((variance - 1.0).abs() < 1e-12);

        // Constant columns are only centred
        assert_eq!(float_column(&scaled, "flat")?, vec![0.0; 4]);
        assert_eq!(params.columns["flat"].scale, 1.0);

        let restored = params.inverse_transform("close", close[2]).expect("close was scaled");
        assert!((restored - 3.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_robust_scaler() -> Result<()> {
        let df = df!(
            "close" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "up" => [1.0, 0.0, 1.0, 0.0, 1.0],
        )?;
        let (scaled, params) = apply_robust_scaler(&df, &["up"])?;

        let scaling = params.columns["close"];
        assert_eq!(scaling.center, 3.0);
        assert_eq!(scaling.scale, 2.0);
        assert_eq!(float_column(&scaled, "close")?, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        Ok(())
    }

    #[test]
    fn test_scaler_statistics_ignore_nan() -> Result<()> {
        let df = df!("close" => [1.0, 2.0, f64::NAN, 3.0, 4.0, 5.0])?;

        let (_, robust) = apply_robust_scaler(&df, &[])?;
        assert_eq!(robust.columns["close"].center, 3.0);
        assert_eq!(robust.columns["close"].scale, 2.0);

        let (scaled, standard) = apply_standard_scaler(&df, &[])?;
        assert_eq!(standard.columns["close"].center, 3.0);
        assert!((standard.columns["close"].scale - 2.0f64.sqrt()).abs() < 1e-12);
        assert!(float_column(&scaled, "close")?[2].is_nan());
        Ok(())
    }

    #[test]
    fn test_scalers_skip_text_columns() -> Result<()> {
        let df = df!("close" => [1.0, 3.0], "symbol" => ["BTC", "BTC"])?;
        let (scaled, params) = apply_standard_scaler(&df, &[])?;

        assert_eq!(params.columns.len(), 1);
        assert_eq!(scaled.column("symbol")?.dtype(), &DataType::String);
        Ok(())
    }
}
