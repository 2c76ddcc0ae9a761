//! End-to-end tests: bridge -> build -> train -> predict on a synthetic league

use chrono::{Duration, NaiveDate};
use gridiron_edge::cli::{BridgeArgs, BuildArgs, PredictArgs, TrainArgs};
use gridiron_edge::config::Config;
use gridiron_edge::data::{read_frame, write_frame, ColumnData, Frame};
use gridiron_edge::error::PipelineError;
use gridiron_edge::features::{DataQuality, MatchupTable};
use gridiron_edge::model::{Target, TrainedModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use tempfile::TempDir;

const SEASON: i32 = 2024;
const TEAMS: [&str; 8] = ["ARI", "BUF", "CHI", "DAL", "KC", "MIA", "NE", "SF"];
const STRENGTH: [f64; 8] = [-0.30, 0.25, -0.15, 0.05, 0.35, 0.00, -0.20, 0.20];
const PLAYED_WEEKS: u32 = 12;
const PREDICT_WEEK: u32 = 13;

fn text(values: Vec<String>) -> ColumnData {
    ColumnData::Text(values.into_iter().map(Some).collect())
}

fn numeric(values: Vec<f64>) -> ColumnData {
    ColumnData::Numeric(values.into_iter().map(Some).collect())
}

/// Circle-method round robin: 4 games per week
fn pairings(week: u32) -> Vec<(usize, usize)> {
    let mut order: Vec<usize> = vec![0];
    let rest: Vec<usize> = (1..8).collect();
    let shift = (week as usize - 1) % 7;
    order.extend(rest.iter().cycle().skip(shift).take(7));
    (0..4)
        .map(|i| {
            let (a, b) = (order[i], order[7 - i]);
            if week % 2 == 0 { (a, b) } else { (b, a) }
        })
        .collect()
}

fn write_league(config: &Config) {
    let mut rng = StdRng::seed_from_u64(11);
    let weeks: Vec<u32> = (1..=PREDICT_WEEK).collect();

    // Upstream weekly exports, cumulative through the prediction week
    let mut off = (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let mut def = (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
    let mut inj = (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
    for &week in &weeks {
        for (t, team) in TEAMS.iter().enumerate() {
            let s = STRENGTH[t];
            let mut noise = || rng.gen_range(-0.03..0.03);
            off.0.push(team.to_string());
            off.1.push(SEASON as f64);
            off.2.push(week as f64);
            off.3.push(s + noise());
            off.4.push(s / 2.0 + noise());
            off.5.push(0.45 + s / 4.0 + noise());
            off.6.push(s + noise());
            def.0.push(team.to_string());
            def.1.push(SEASON as f64);
            def.2.push(week as f64);
            def.3.push(-s + noise());
            def.4.push(0.45 - s / 4.0 + noise());
            // half the league reports injuries; the rest are filled with zero
            if t % 2 == 0 {
                inj.0.push(team.to_string());
                inj.1.push(SEASON as f64);
                inj.2.push(week as f64);
                inj.3.push(rng.gen_range(0.0..2.0));
                inj.4.push(0.0);
                inj.5.push(rng.gen_range(0.0..4.0_f64).floor());
            }
        }
    }

    let dir = config.paths.week_source_dir(PREDICT_WEEK);
    let offense = Frame::new()
        .with_column("offense_team", text(off.0)).unwrap()
        .with_column("season", numeric(off.1)).unwrap()
        .with_column("week", numeric(off.2)).unwrap()
        .with_column("avg_epa_pass", numeric(off.3)).unwrap()
        .with_column("avg_epa_run", numeric(off.4)).unwrap()
        .with_column("success_rate", numeric(off.5)).unwrap()
        .with_column("roll3_epa", numeric(off.6)).unwrap();
    write_frame(&dir.join("offense_weekly.parquet"), &offense).unwrap();

    let defense = Frame::new()
        .with_column("defense_team", text(def.0)).unwrap()
        .with_column("season", numeric(def.1)).unwrap()
        .with_column("week", numeric(def.2)).unwrap()
        .with_column("avg_epa_per_play", numeric(def.3)).unwrap()
        .with_column("success_rate_allowed", numeric(def.4)).unwrap();
    write_frame(&dir.join("defense_weekly.parquet"), &defense).unwrap();

    let injuries = Frame::new()
        .with_column("team", text(inj.0)).unwrap()
        .with_column("season", numeric(inj.1)).unwrap()
        .with_column("week", numeric(inj.2)).unwrap()
        .with_column("injury_impact_score", numeric(inj.3)).unwrap()
        .with_column("qb_injuries", numeric(inj.4)).unwrap()
        .with_column("out_count", numeric(inj.5)).unwrap();
    write_frame(&dir.join("injuries_summary.parquet"), &injuries).unwrap();

    // Schedule: weeks 1-12 final, week 13 upcoming, plus one playoff game
    let opening = NaiveDate::from_ymd_opt(2024, 9, 5).unwrap();
    let mut ids = Vec::new();
    let mut game_weeks = Vec::new();
    let mut types = Vec::new();
    let mut days = Vec::new();
    let mut homes = Vec::new();
    let mut aways = Vec::new();
    let mut home_scores = Vec::new();
    let mut away_scores = Vec::new();
    let mut spreads = Vec::new();
    let mut totals = Vec::new();
    let mut push_game = |week: u32, game_type: &str, h: usize, a: usize, rng: &mut StdRng| {
        let edge = 30.0 * (STRENGTH[h] - STRENGTH[a]) + 2.0;
        let played = week <= PLAYED_WEEKS;
        let home = 21.0 + edge / 2.0 + rng.gen_range(-3.0..3.0);
        let away = 21.0 - edge / 2.0 + rng.gen_range(-3.0..3.0);
        ids.push(Some(format!("{}_{:02}_{}_{}", SEASON, week, TEAMS[a], TEAMS[h])));
        game_weeks.push(Some(week as f64));
        types.push(Some(game_type.to_string()));
        days.push(Some(
            (opening + Duration::days(7 * (week as i64 - 1)))
                .format("%Y-%m-%d")
                .to_string(),
        ));
        homes.push(Some(TEAMS[h].to_string()));
        aways.push(Some(TEAMS[a].to_string()));
        home_scores.push(played.then(|| home.round().max(0.0)));
        away_scores.push(played.then(|| away.round().max(0.0)));
        spreads.push(Some((edge * 2.0).round() / 2.0));
        totals.push(Some(42.5));
    };
    for week in 1..=PREDICT_WEEK {
        for (h, a) in pairings(week) {
            push_game(week, "REG", h, a, &mut rng);
        }
    }
    push_game(19, "WC", 4, 1, &mut rng);

    let n = ids.len();
    let schedule = Frame::new()
        .with_column("game_id", ColumnData::Text(ids)).unwrap()
        .with_column("season", numeric(vec![SEASON as f64; n])).unwrap()
        .with_column("week", ColumnData::Numeric(game_weeks)).unwrap()
        .with_column("game_type", ColumnData::Text(types)).unwrap()
        .with_column("gameday", ColumnData::Text(days)).unwrap()
        .with_column("gametime", ColumnData::Text(vec![Some("17:00".to_string()); n])).unwrap()
        .with_column("home_team", ColumnData::Text(homes)).unwrap()
        .with_column("away_team", ColumnData::Text(aways)).unwrap()
        .with_column("home_score", ColumnData::Numeric(home_scores)).unwrap()
        .with_column("away_score", ColumnData::Numeric(away_scores)).unwrap()
        .with_column("spread_line", ColumnData::Numeric(spreads)).unwrap()
        .with_column("total_line", ColumnData::Numeric(totals)).unwrap();
    write_frame(&config.paths.schedule_file(), &schedule).unwrap();
}

fn test_config(root: &TempDir) -> Config {
    let mut config = Config::default();
    config.paths.data_dir = root.path().join("data");
    config.paths.model_dir = root.path().join("models");
    config.paths.reports_dir = root.path().join("reports");
    config.training.min_samples = 30;
    config.training.n_estimators = 40;
    config.training.max_depth = 3;
    config.training.learning_rate = 0.1;
    config
}

fn run_through_training(config: &Config) {
    write_league(config);
    BridgeArgs { season: SEASON, week: PREDICT_WEEK }.execute(config).unwrap();
    BuildArgs { season: SEASON, first_season: None }.execute(config).unwrap();
    TrainArgs { top: 5 }.execute(config).unwrap();
}

#[test]
fn test_pipeline_end_to_end() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    run_through_training(&config);

    // Matchup table: 13 weeks x 4 regular-season games, playoff game filtered
    let mut quality = DataQuality::default();
    let table =
        MatchupTable::from_frame(&read_frame(&config.paths.model_table_file()).unwrap(), &mut quality)
            .unwrap();
    assert_eq!(table.len(), 52);
    assert_eq!(table.rows().iter().filter(|m| m.margin.is_some()).count(), 48);
    for m in table.rows() {
        let h = m.feature("home_off_avg_epa_pass").unwrap();
        let a = m.feature("away_off_avg_epa_pass").unwrap();
        let d = m.feature("delta_off_avg_epa_pass").unwrap();
        assert!((d - (h - a)).abs() < 1e-12);
        assert!(m.feature("delta_injury_impact").is_some());
        if let (Some(hs), Some(aw)) = (m.game.home_score, m.game.away_score) {
            assert_eq!(m.margin, Some(hs - aw));
            assert_eq!(m.total_points, Some(hs + aw));
        }
    }
    assert!(table.has_column("delta_off_epa_l3"));
    assert!(!table.has_column("delta_off_roll3_epa"));

    // Models persisted with frozen, selector-ordered feature lists
    let margin: TrainedModel = TrainedModel::load(&config.paths.model_file(Target::Margin)).unwrap();
    let total: TrainedModel = TrainedModel::load(&config.paths.model_file(Target::Total)).unwrap();
    assert_eq!(margin.feature_names, total.feature_names);
    assert_eq!(margin.feature_names.last().map(String::as_str), Some("away_injury_impact"));
    assert_eq!(margin.training_samples, 48);
    assert_eq!(margin.cv.folds.len(), 2);
    assert!(config.paths.importance_file().exists());

    PredictArgs { season: SEASON, week: PREDICT_WEEK }.execute(&config).unwrap();
    let predictions = read_frame(&config.paths.predictions_file(SEASON, PREDICT_WEEK)).unwrap();
    assert_eq!(predictions.num_rows(), 4);

    let margins = predictions.numeric("predicted_margin").unwrap().values;
    let totals = predictions.numeric("predicted_total").unwrap().values;
    let homes = predictions.numeric("predicted_home_score").unwrap().values;
    let probs = predictions.numeric("home_win_prob").unwrap().values;
    let spreads = predictions.numeric("model_home_spread").unwrap().values;
    for i in 0..4 {
        let (m, t) = (margins[i].unwrap(), totals[i].unwrap());
        assert!((homes[i].unwrap() - (t + m) / 2.0).abs() < 1e-9);
        assert!((spreads[i].unwrap() + m).abs() < 1e-12);
        let p = probs[i].unwrap();
        assert!(p > 0.0 && p < 1.0);
        assert_eq!(p > 0.5, m > 0.0);
    }
    let edges = predictions.numeric("edge_spread").unwrap().values;
    let lines = predictions.numeric("spread_line").unwrap().values;
    for i in 0..4 {
        // edge is in home-margin terms, the model line in sportsbook notation
        assert!((edges[i].unwrap() - (-spreads[i].unwrap() - lines[i].unwrap())).abs() < 1e-9);
    }
    assert!(predictions.numeric("home_score").unwrap().values.iter().all(Option::is_none));
}

#[test]
fn test_prediction_refuses_feature_drift() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    run_through_training(&config);

    // Drop one frozen feature from the matchup table
    let path = config.paths.model_table_file();
    let frame = read_frame(&path).unwrap();
    let mut reduced = Frame::new();
    for column in frame.columns() {
        if column.name != "delta_off_avg_epa_run" {
            reduced.push_column(column.name.clone(), column.data.clone()).unwrap();
        }
    }
    write_frame(&path, &reduced).unwrap();

    let err = PredictArgs { season: SEASON, week: PREDICT_WEEK }
        .execute(&config)
        .unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::FeatureDrift { missing, .. }) => {
            assert_eq!(missing, &vec!["delta_off_avg_epa_run".to_string()]);
        }
        other => panic!("expected feature drift, got {:?}", other),
    }
    assert!(!config.paths.predictions_file(SEASON, PREDICT_WEEK).exists());
}

#[test]
fn test_missing_inputs_name_the_producer() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);

    let err = TrainArgs { top: 5 }.execute(&config).unwrap_err();
    assert!(err.to_string().contains("gridiron-edge build"), "{}", err);

    let err = PredictArgs { season: SEASON, week: 1 }.execute(&config).unwrap_err();
    assert!(err.to_string().contains("gridiron-edge build"), "{}", err);

    let err = BuildArgs { season: SEASON, first_season: None }
        .execute(&config)
        .unwrap_err();
    assert!(err.to_string().contains("schedule"), "{}", err);

    let err = BridgeArgs { season: SEASON, week: 3 }.execute(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::MissingInput { .. })
    ));
}

#[test]
fn test_too_few_graded_games_is_fatal() {
    let root = TempDir::new().unwrap();
    let mut config = test_config(&root);
    write_league(&config);
    BridgeArgs { season: SEASON, week: PREDICT_WEEK }.execute(&config).unwrap();
    BuildArgs { season: SEASON, first_season: None }.execute(&config).unwrap();

    config.training.min_samples = 100;
    let err = TrainArgs { top: 5 }.execute(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InsufficientSamples { found: 48, required: 100, .. })
    ));
    assert!(!config.paths.model_file(Target::Margin).exists());
}

#[test]
fn test_failed_training_keeps_previous_artifacts() {
    let root = TempDir::new().unwrap();
    let mut config = test_config(&root);
    run_through_training(&config);

    let margin_path = config.paths.model_file(Target::Margin);
    let total_path = config.paths.model_file(Target::Total);
    let importance_path = config.paths.importance_file();
    let margin_before = fs::read(&margin_path).unwrap();
    let importance_before = fs::read(&importance_path).unwrap();

    // the total artifact can no longer be replaced
    fs::remove_file(&total_path).unwrap();
    fs::create_dir(&total_path).unwrap();
    config.training.n_estimators = 10;
    assert!(TrainArgs { top: 5 }.execute(&config).is_err());

    assert_eq!(fs::read(&margin_path).unwrap(), margin_before);
    assert_eq!(fs::read(&importance_path).unwrap(), importance_before);
    let leftovers: Vec<_> = fs::read_dir(&config.paths.model_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn test_prediction_rejects_swapped_model_files() {
    let root = TempDir::new().unwrap();
    let config = test_config(&root);
    run_through_training(&config);

    let margin_path = config.paths.model_file(Target::Margin);
    let total_path = config.paths.model_file(Target::Total);
    let swap = root.path().join("swap.json");
    fs::rename(&margin_path, &swap).unwrap();
    fs::rename(&total_path, &margin_path).unwrap();
    fs::rename(&swap, &total_path).unwrap();

    let err = PredictArgs { season: SEASON, week: PREDICT_WEEK }
        .execute(&config)
        .unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::WrongTarget { expected, found, .. }) => {
            assert_eq!((expected.as_str(), found.as_str()), ("margin", "total"));
        }
        other => panic!("expected wrong target, got {:?}", other),
    }
    assert!(!config.paths.predictions_file(SEASON, PREDICT_WEEK).exists());
}
