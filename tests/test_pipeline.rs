//! End-to-end runs: data file in, model/OOF/metrics artifacts out

use kfold_trainer::data::{DataLoader, DataSaver, Resolution};
use kfold_trainer::export::{load_model_artifact, read_metrics, OOF_COLUMN};
use kfold_trainer::prelude::*;
use kfold_trainer::preprocessing::TargetSource;
use kfold_trainer::training::LightGbmClassifier;
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;
use tempfile::{tempdir, TempDir};

/// Airline-survey shaped data: numeric, categorical and a text label
fn survey_df(n: usize) -> DataFrame {
    let age: Vec<Option<f64>> = (0..n)
        .map(|i| if i % 17 == 0 { None } else { Some(20.0 + ((i * 7) % 50) as f64) })
        .collect();
    let cabin: Vec<&str> = (0..n).map(|i| ["eco", "business", "eco_plus"][i % 3]).collect();
    let distance: Vec<f64> = (0..n).map(|i| ((i * 37) % 100) as f64 * 10.0).collect();
    let satisfaction: Vec<&str> = (0..n)
        .map(|i| {
            if i % 3 == 1 || (i * 37) % 100 > 70 {
                "satisfied"
            } else {
                "neutral or dissatisfied"
            }
        })
        .collect();
    df!(
        "age" => age,
        "cabin" => cabin,
        "distance" => distance,
        "satisfaction" => satisfaction
    )
    .unwrap()
}

fn write_csv(dir: &Path, name: &str, mut df: DataFrame) -> std::path::PathBuf {
    let path = dir.join(name);
    DataSaver::save_csv(&mut df, &path).unwrap();
    path
}

fn small_params() -> BoostingParams {
    BoostingParams::default()
        .with_n_estimators(30)
        .with_learning_rate(0.2)
        .with_num_leaves(8)
        .with_min_child_samples(5)
}

fn config_for(tmp: &TempDir, data: &Path, out: &str) -> RunConfig {
    RunConfig::new(data)
        .with_output_dir(tmp.path().join(out))
        .with_n_splits(3)
        .with_fallback_dir(tmp.path().join("no_fallback"))
        .with_early_stopping_rounds(10)
        .with_params(small_params())
}

#[test]
fn test_run_writes_all_artifacts() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(150));

    let report = run(&config_for(&tmp, &data, "out")).unwrap();

    assert_eq!(report.resolution, Resolution::File);
    assert_eq!(report.target, "satisfaction");
    assert_eq!(report.target_source, TargetSource::CommonName);
    assert_eq!(report.folds.len(), 3);
    assert_eq!(report.oof.len(), 150);
    assert!(report.oof.iter().all(|p| (0.0..=1.0).contains(p)));

    let m = &report.metrics;
    assert!((0.0..=1.0).contains(&m.cv.oof_auc), "oof_auc = {}", m.cv.oof_auc);
    assert_eq!(m.n_rows, 150);
    assert_eq!(m.n_features, 3);
    assert_eq!(m.categorical_features, vec!["cabin".to_string()]);
    assert_eq!(
        m.label_classes,
        vec!["neutral or dissatisfied".to_string(), "satisfied".to_string()]
    );

    // The detected target and the filled ages are both reported
    assert_eq!(report.diagnostics.for_stage(Stage::Target).count(), 1);
    assert!(report.diagnostics.for_stage(Stage::Preprocess).count() >= 1);

    assert!(report.artifacts.model.exists());
    assert!(report.artifacts.oof.exists());
    assert!(report.artifacts.metrics.exists());
    assert!(report.artifacts.importance.is_some());
}

#[test]
fn test_oof_file_and_metrics_round_trip() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(120));
    let report = run(&config_for(&tmp, &data, "out")).unwrap();

    let oof = DataLoader::new().load_csv(&report.artifacts.oof).unwrap();
    assert_eq!(oof.height(), 120);
    assert_eq!(oof.get_column_names()[0].as_str(), OOF_COLUMN);

    let metrics = read_metrics(&report.artifacts.metrics).unwrap();
    assert_eq!(metrics.cv.fold_aucs.len(), 3);
    assert_eq!(metrics.cv.oof_auc, report.metrics.cv.oof_auc);
    assert_eq!(metrics.target_column, "satisfaction");
    assert_eq!(metrics.fit_modes.len(), 3);
}

#[test]
fn test_model_artifact_loads_and_predicts() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(120));
    let report = run(&config_for(&tmp, &data, "out")).unwrap();

    let artifact = load_model_artifact(&report.artifacts.model).unwrap();
    assert_eq!(artifact.metadata.target_name, "satisfaction");
    assert_eq!(artifact.metadata.feature_names, vec!["age", "cabin", "distance"]);
    assert!(artifact.metadata.metrics.contains_key("oof_auc"));

    let model = LightGbmClassifier::from_bytes(&artifact.model_data).unwrap();
    let x = Array2::from_shape_vec((2, 3), vec![30.0, 0.0, 100.0, 55.0, 2.0, 900.0]).unwrap();
    let proba = model.predict_proba(x.view()).unwrap().unwrap();
    assert_eq!(proba.len(), 2);
    assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn test_runs_are_deterministic() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(120));

    let first = run(&config_for(&tmp, &data, "out_a")).unwrap();
    let second = run(&config_for(&tmp, &data, "out_b")).unwrap();

    assert_eq!(first.splits, second.splits);
    assert_eq!(first.oof, second.oof);
    assert_eq!(first.metrics.cv.fold_aucs, second.metrics.cv.fold_aucs);
}

#[test]
fn test_seed_changes_splits() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(120));

    let first = run(&config_for(&tmp, &data, "out_a")).unwrap();
    let second = run(&config_for(&tmp, &data, "out_b").with_seed(7)).unwrap();
    assert_ne!(first.splits, second.splits);
}

#[test]
fn test_splits_partition_rows() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(100));
    let report = run(&config_for(&tmp, &data, "out")).unwrap();

    let mut seen = vec![0usize; 100];
    for split in &report.splits {
        for &i in &split.valid_indices {
            seen[i] += 1;
        }
        assert_eq!(split.train_indices.len() + split.valid_indices.len(), 100);
    }
    assert!(seen.iter().all(|&c| c == 1));
}

#[test]
fn test_missing_explicit_target_lists_columns() {
    let tmp = tempdir().unwrap();
    let df = survey_df(30).drop("satisfaction").unwrap();
    let data = write_csv(tmp.path(), "train.csv", df);

    let config = config_for(&tmp, &data, "out").with_target_col("satisfaction");
    let err = run(&config).unwrap_err();
    match &err {
        TrainerError::TargetColumnNotFound { requested, available } => {
            assert_eq!(requested, "satisfaction");
            assert_eq!(available, &vec!["age".to_string(), "cabin".to_string(), "distance".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("Available columns"));
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_single_class_is_rejected_before_training() {
    let tmp = tempdir().unwrap();
    let df = df!(
        "x" => (0..40).map(|i| i as f64).collect::<Vec<_>>(),
        "target" => vec![1i64; 40]
    )
    .unwrap();
    let data = write_csv(tmp.path(), "train.csv", df);

    let err = run(&config_for(&tmp, &data, "out")).unwrap_err();
    assert!(matches!(err, TrainerError::InsufficientClasses { found: 1 }), "{err:?}");
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn test_heuristic_target_with_parquet_input() {
    let tmp = tempdir().unwrap();
    let n = 90;
    let mut df = df!(
        "income" => (0..n).map(|i| 1000.0 + (i * 13 % 70) as f64).collect::<Vec<_>>(),
        "visits" => (0..n).map(|i| (i % 40) as i64).collect::<Vec<_>>(),
        "churned" => (0..n).map(|i| if i % 4 == 0 { "yes" } else { "no" }).collect::<Vec<_>>()
    )
    .unwrap();
    let path = tmp.path().join("customers.parquet");
    DataSaver::save_parquet(&mut df, &path).unwrap();

    let report = run(&config_for(&tmp, &path, "out")).unwrap();
    assert_eq!(report.target, "churned");
    assert_eq!(report.target_source, TargetSource::Heuristic { distinct: 2 });
    assert_eq!(report.oof.len(), n);
}

#[test]
fn test_empty_csv_column_is_not_taken_as_target() {
    let tmp = tempdir().unwrap();
    let mut text = String::from("feat,comments,churn_flag\n");
    for i in 0..60 {
        let flag = if i % 3 == 0 { "yes" } else { "no" };
        text.push_str(&format!("{},,{}\n", (i * 7 % 23) as f64 + 0.5, flag));
    }
    let path = tmp.path().join("accounts.csv");
    std::fs::write(&path, text).unwrap();

    let report = run(&config_for(&tmp, &path, "out")).unwrap();
    assert_eq!(report.target, "churn_flag");
    assert_eq!(report.target_source, TargetSource::Heuristic { distinct: 2 });
    assert_eq!(report.oof.len(), 60);
}

#[test]
fn test_older_trainer_generation_gets_early_stopping_rounds() {
    let tmp = tempdir().unwrap();
    let data = write_csv(tmp.path(), "train.csv", survey_df(90));

    let current = run(&config_for(&tmp, &data, "out_new")).unwrap();
    let older = run_with_backend(
        &config_for(&tmp, &data, "out_old"),
        LightGbmBackend::new().with_version("3.3.5"),
    )
    .unwrap();

    let modes = |report: &RunReport| report.metrics.fit_modes[0][0].clone();
    assert!(!modes(&current).contains("early_stopping_rounds"));
    assert!(modes(&older).contains("early_stopping_rounds"));
    assert!(current.folds.iter().all(|f| !f.used_fallback()));
    assert!(older.folds.iter().all(|f| !f.used_fallback()));
}
