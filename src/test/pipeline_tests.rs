#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use crate::dataset::pipeline::{build_dataset, create_dataset, dataset_directory_name, prepare_features, DatasetConfig};
    use crate::dataset::step_1_candle_source::KlineInterval;
    use crate::dataset::step_7_persistence::{read_scaler_params, read_windowed_dataset};
    use crate::util::frame_utils::{check_for_nans, column_names};
    use crate::util::test_utils::{generate_test_candles, generate_test_dataframe, FakeCandleSource};

    fn small_config(forecast_horizon: usize) -> DatasetConfig {
        DatasetConfig {
            window_size: 20,
            stride: 5,
            ..DatasetConfig::new(forecast_horizon, 0.1)
        }
    }

    #[test]
    fn test_prepare_features_leaves_no_missing_values() -> Result<()> {
        let df = generate_test_dataframe(400, 13)?;
        let (prepared, scalers) = prepare_features(&df, &small_config(3))?;

        assert!(prepared.height() > 250);
        assert!(prepared.height() < df.height());
        let names = column_names(&prepared);
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(check_for_nans(&prepared, &name_refs)?, 0);

        assert_eq!(scalers.len(), 2);
        assert!(scalers.iter().all(|s| !s.columns.contains_key("up")));
        Ok(())
    }

    #[test]
    fn test_build_dataset_splits_windows() -> Result<()> {
        let df = generate_test_dataframe(400, 17)?;
        let config = small_config(5);
        let dataset = build_dataset(&df, &config)?;

        let total = dataset.train.len() + dataset.validation.len() + dataset.test.len();
        assert!(total > 40);
        assert_eq!(dataset.train.len(), (total as f64 * 0.7) as usize);
        assert_eq!(dataset.train.window_size(), 20);
        assert!(!dataset.train.columns.contains(&"up".to_string()));
        assert!(dataset
            .train
            .labels
            .iter()
            .chain(dataset.test.labels.iter())
            .all(|&v| v == 0.0 || v == 1.0));
        Ok(())
    }

    #[test]
    fn test_create_dataset_writes_one_directory_per_horizon() -> Result<()> {
        let dir = tempdir()?;
        let candles = generate_test_candles(400, 23);
        let start = candles[0].open_time;
        let end = candles[candles.len() - 1].open_time;
        let source = FakeCandleSource { candles };

        let written = create_dataset(
            &source,
            "BTCUSDT",
            KlineInterval::OneMinute,
            start,
            end,
            &[1, 3],
            &small_config(1),
            dir.path(),
        )?;

        assert_eq!(written.len(), 2);
        assert!(written[1].ends_with("dataset(BTCUSDT,1m,0+3,0.1,20,5)"));
        for directory in &written {
            let train = read_windowed_dataset(directory.join("train.bin"))?;
            let validation = read_windowed_dataset(directory.join("validation.bin"))?;
            let test = read_windowed_dataset(directory.join("test.bin"))?;

            assert!(!train.is_empty());
            assert_eq!(train.columns, test.columns);
            assert_eq!(train.num_features(), validation.num_features());
            assert_eq!(read_scaler_params(directory.join("scalers.json"))?.len(), 2);
        }
        Ok(())
    }

    #[test]
    fn test_dataset_directory_name() {
        let config = DatasetConfig {
            forecast_gap: 2,
            ..DatasetConfig::new(7, 0.075)
        };
        assert_eq!(
            dataset_directory_name("ETHUSDT", KlineInterval::OneHour, &config),
            "dataset(ETHUSDT,1h,2+7,0.075,100,1)"
        );
    }
}
