use anyhow::Result;
use serde_json::json;
use workout_journal_lib::compare::{compare_readings, Direction};
use workout_journal_lib::store::KeyPath;
use workout_journal_lib::{
    AppService, BodyPart, Config, ConfigError, HistoryFilter, HistoryUpdate, MemoryStore,
    NewExercise, NewWorkoutSheet, Parameters, RepositoryError, SessionStatus, SheetExercise,
    SqliteStore, TreeStore,
};

fn create_test_service() -> AppService<MemoryStore> {
    AppService::with_store(
        MemoryStore::new(),
        Config::default(),
        "test_config.toml".into(),
    )
}

fn reading(pairs: &[(&str, &str)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

async fn add_exercise<S: TreeStore>(service: &AppService<S>, name: &str, category_id: &str) -> Result<String> {
    let exercise = service
        .create_exercise(NewExercise {
            name: name.to_string(),
            category_id: category_id.to_string(),
            body_part: BodyPart::Legs,
            parameter_names: vec!["weight".into(), "reps".into()],
        })
        .await?;
    Ok(exercise.id)
}

async fn is_empty<S: TreeStore>(store: &S, path: &str) -> Result<bool> {
    Ok(store.get(&KeyPath::parse(path)?).await?.is_none())
}

#[tokio::test]
async fn test_create_and_list_catalog() -> Result<()> {
    let service = create_test_service();
    let strength = service.create_category("Strength", "barbell work").await?;
    let cardio = service.create_category("Cardio", "").await?;

    add_exercise(&service, "Back Squat", &strength.id).await?;
    add_exercise(&service, "Deadlift", &strength.id).await?;
    add_exercise(&service, "Rowing", &cardio.id).await?;

    assert_eq!(service.list_categories().await?.len(), 2);
    assert_eq!(service.list_exercises(None).await?.len(), 3);
    assert_eq!(service.list_exercises(Some(&strength.id)).await?.len(), 2);

    let squat = service.resolve_exercise("back squat").await?;
    assert_eq!(squat.parameter_names().collect::<Vec<_>>(), vec!["reps", "weight"]);
    assert_eq!(service.search_exercises("strength").await?.len(), 2);
    assert_eq!(service.search_categories("BARBELL").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_validation_happens_before_writes() -> Result<()> {
    let service = create_test_service();
    assert!(service.create_category("   ", "").await.is_err());

    let err = service
        .create_exercise(NewExercise {
            name: "Lunge".into(),
            category_id: "no-such-category".into(),
            body_part: BodyPart::Legs,
            parameter_names: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RepositoryError>(),
        Some(RepositoryError::CategoryNotFound(_))
    ));
    assert_eq!(service.store().leaf_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_documentation_captures_previous_reading() -> Result<()> {
    let service = create_test_service();
    let category = service.create_category("Strength", "").await?;
    let squat = add_exercise(&service, "Back Squat", &category.id).await?;

    let first = service
        .add_documentation(&squat, reading(&[("weight", "80"), ("reps", "8")]), None)
        .await?;
    assert!(first.history.previous_parameters.is_empty());

    let second = service
        .add_documentation(&squat, reading(&[("weight", "85"), ("reps", "6")]), Some("heavy"))
        .await?;
    assert_eq!(second.history.previous_parameters, first.history.parameters);
    let directions = compare_readings(&second.history);
    assert_eq!(directions["weight"], Direction::Up);
    assert_eq!(directions["reps"], Direction::Down);

    let diary = service.list_diary(&squat).await?;
    assert_eq!(diary.len(), 1);
    assert_eq!(diary[0].comment, "heavy");
    assert_eq!(diary[0].timestamp, second.history.timestamp);
    Ok(())
}

#[tokio::test]
async fn test_editing_history_does_not_touch_later_entries() -> Result<()> {
    let service = create_test_service();
    let category = service.create_category("Strength", "").await?;
    let squat = add_exercise(&service, "Back Squat", &category.id).await?;

    let first = service
        .add_documentation(&squat, reading(&[("weight", "80")]), None)
        .await?;
    service
        .add_documentation(&squat, reading(&[("weight", "90")]), None)
        .await?;

    service
        .update_history_entry(
            &squat,
            &first.history.id,
            HistoryUpdate {
                parameters: Some(reading(&[("weight", "100")])),
                comment: Some(Some("typo fixed".into())),
            },
        )
        .await?;

    let detail = service.exercise_detail(&squat).await?;
    assert_eq!(detail.category_name, "Strength");
    let newest = &detail.history[0];
    assert_eq!(newest.parameters["weight"], "90");
    assert_eq!(newest.previous_parameters["weight"], "80");
    let edited = &detail.history[1];
    assert_eq!(edited.parameters["weight"], "100");
    assert_eq!(edited.comment.as_deref(), Some("typo fixed"));
    Ok(())
}

#[tokio::test]
async fn test_exercise_delete_cascades() -> Result<()> {
    let service = create_test_service();
    let category = service.create_category("Strength", "").await?;
    let squat = add_exercise(&service, "Back Squat", &category.id).await?;
    let bench = add_exercise(&service, "Bench", &category.id).await?;

    for weight in ["80", "85", "90"] {
        service
            .add_documentation(&squat, reading(&[("weight", weight)]), Some("ok"))
            .await?;
    }
    service.add_diary_entry(&squat, "knees fine").await?;
    service
        .add_documentation(&bench, reading(&[("weight", "60")]), Some("keep"))
        .await?;

    service.delete_exercise(&squat).await?;

    let store = service.store();
    assert!(is_empty(store, &format!("exercises/{squat}")).await?);
    assert!(is_empty(store, &format!("exerciseHistory/{squat}")).await?);
    assert!(is_empty(store, &format!("exerciseDiary/{squat}")).await?);
    assert_eq!(service.list_diary(&bench).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_category_cascade_on_sqlite_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("journal.sqlite");

    let (kept_category, kept_exercise) = {
        let service = AppService::with_store(
            SqliteStore::open(&db_path)?,
            Config::default(),
            dir.path().join("config.toml"),
        );
        let doomed = service.create_category("Old plan", "").await?;
        let kept = service.create_category("Strength", "").await?;
        let lunge = add_exercise(&service, "Lunge", &doomed.id).await?;
        let squat = add_exercise(&service, "Back Squat", &kept.id).await?;
        service
            .add_documentation(&lunge, reading(&[("weight", "20")]), Some("wobbly"))
            .await?;
        service
            .add_documentation(&squat, reading(&[("weight", "80")]), None)
            .await?;

        assert_eq!(service.delete_category(&doomed.id).await?, 1);
        assert!(is_empty(service.store(), &format!("exerciseHistory/{lunge}")).await?);
        assert!(is_empty(service.store(), &format!("exerciseDiary/{lunge}")).await?);
        (kept.id, squat)
    };

    let reopened = AppService::with_store(
        SqliteStore::open(&db_path)?,
        Config::default(),
        dir.path().join("config.toml"),
    );
    let categories = reopened.list_categories().await?;
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, kept_category);
    let exercises = reopened.list_exercises(None).await?;
    assert_eq!(exercises.len(), 1);
    assert_eq!(exercises[0].id, kept_exercise);
    assert_eq!(
        reopened
            .list_history(&HistoryFilter::default(), true)
            .await?
            .iter()
            .map(|g| g.entries.len())
            .sum::<usize>(),
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_index_named_parameters_survive_the_store() -> Result<()> {
    let service = create_test_service();
    let category = service.create_category("Cardio", "").await?;
    let intervals = service
        .create_exercise(NewExercise {
            name: "Intervals".into(),
            category_id: category.id.clone(),
            body_part: BodyPart::Cardio,
            parameter_names: vec!["0".into(), "1".into()],
        })
        .await?;
    service
        .add_documentation(&intervals.id, reading(&[("0", "12"), ("1", "30")]), None)
        .await?;

    let detail = service.exercise_detail(&intervals.id).await?;
    assert_eq!(detail.exercise.parameter_names().collect::<Vec<_>>(), vec!["0", "1"]);
    assert_eq!(detail.history.len(), 1);
    assert_eq!(detail.history[0].parameters["0"], "12");
    assert_eq!(detail.history[0].parameters["1"], "30");
    Ok(())
}

#[tokio::test]
async fn test_resolve_surfaces_store_errors() -> Result<()> {
    let service = create_test_service();
    let category = service.create_category("Strength", "").await?;
    add_exercise(&service, "Squat 2.0", &category.id).await?;

    // Not a valid key, so it can only be a name.
    assert_eq!(service.resolve_exercise("squat 2.0").await?.name, "Squat 2.0");

    let broken = service
        .store()
        .push(
            &KeyPath::parse("exercises")?,
            json!({"name": "Broken", "bodyPart": "Tail"}),
        )
        .await?;
    let err = service.resolve_exercise(&broken).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RepositoryError>(),
        Some(RepositoryError::Decode { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_history_filtering() -> Result<()> {
    let mut service = create_test_service();
    let legs = service.create_category("Legs", "").await?;
    let upper = service.create_category("Upper", "").await?;
    let squat = add_exercise(&service, "Back Squat", &legs.id).await?;
    let bench = add_exercise(&service, "Bench Press", &upper.id).await?;

    service
        .add_documentation(&squat, reading(&[("weight", "80")]), None)
        .await?;
    service
        .add_documentation(&bench, reading(&[("weight", "60")]), Some("elbow ok"))
        .await?;
    service
        .add_documentation(&bench, reading(&[("weight", "62.5")]), None)
        .await?;

    let by_text = HistoryFilter {
        search: Some("squat".into()),
        ..Default::default()
    };
    let groups = service.list_history(&by_text, true).await?;
    let found: Vec<_> = groups.iter().flat_map(|g| &g.entries).collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].exercise_id, squat);

    let by_comment = HistoryFilter {
        search: Some("ELBOW".into()),
        ..Default::default()
    };
    let groups = service.list_history(&by_comment, true).await?;
    assert_eq!(groups.iter().map(|g| g.entries.len()).sum::<usize>(), 1);

    let by_exercise = HistoryFilter {
        exercise_id: Some(bench.clone()),
        ..Default::default()
    };
    service.config.group_history_by_date = false;
    let groups = service.list_history(&by_exercise, true).await?;
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].label, "");
    let weights: Vec<&str> = groups[0]
        .entries
        .iter()
        .map(|e| e.parameters["weight"].as_str())
        .collect();
    assert_eq!(weights, vec!["62.5", "60"]);

    let series = service.chart_series(&bench, "weight").await?;
    assert_eq!(series.iter().map(|(_, v)| *v).collect::<Vec<_>>(), vec![60.0, 62.5]);
    Ok(())
}

#[tokio::test]
async fn test_sheet_editing() -> Result<()> {
    let service = create_test_service();
    let category = service.create_category("Strength", "").await?;
    let squat = add_exercise(&service, "Back Squat", &category.id).await?;
    let bench = add_exercise(&service, "Bench", &category.id).await?;

    let sheet = service
        .create_sheet(NewWorkoutSheet {
            name: "Full body".into(),
            description: "Monday".into(),
            estimated_duration: Some(50),
            exercises: vec![],
        })
        .await?;
    for (exercise_id, sets) in [(&squat, 5), (&bench, 0)] {
        service
            .add_sheet_exercise(
                &sheet.id,
                SheetExercise {
                    exercise_id: exercise_id.clone(),
                    sets,
                    reps: "5".into(),
                    weight: None,
                    notes: None,
                },
            )
            .await?;
    }
    let stored = service.resolve_sheet("full BODY").await?;
    assert_eq!(stored.exercises.len(), 2);
    assert_eq!(stored.total_sets(), 6);

    let removed = service.remove_sheet_exercise(&sheet.id, 0).await?;
    assert_eq!(removed.exercise_id, squat);
    let stored = service.resolve_sheet(&sheet.id).await?;
    assert_eq!(stored.exercises.len(), 1);
    assert_eq!(stored.exercises[0].exercise_id, bench);

    assert!(service.remove_sheet_exercise(&sheet.id, 3).await.is_err());
    let unknown = SheetExercise {
        exercise_id: "ghost".into(),
        sets: 1,
        reps: String::new(),
        weight: None,
        notes: None,
    };
    assert!(service.add_sheet_exercise(&sheet.id, unknown).await.is_err());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_workout_from_sheet_and_sheet_deletion() -> Result<()> {
    let mut service = create_test_service();
    let category = service.create_category("Strength", "").await?;
    let squat = add_exercise(&service, "Back Squat", &category.id).await?;
    let sheet = service
        .create_sheet(NewWorkoutSheet {
            name: "Legs".into(),
            exercises: vec![SheetExercise {
                exercise_id: squat.clone(),
                sets: 4,
                reps: "5".into(),
                weight: Some("100".into()),
                notes: None,
            }],
            ..Default::default()
        })
        .await?;

    let snapshot = service.start_workout("Legs").await?;
    assert_eq!(snapshot.status, SessionStatus::Running);
    assert_eq!(snapshot.total_sets, 4);
    assert!(service.start_workout(&sheet.id).await.is_err());

    service.session().complete_set(&squat, 0)?;
    let snapshot = service.session_snapshot();
    assert!((snapshot.progress - 25.0).abs() < f64::EPSILON);
    assert!(snapshot.rest_active);
    assert_eq!(snapshot.rest_remaining, 60);

    service.delete_sheet(&sheet.id).await?;
    assert_eq!(service.session_snapshot().status, SessionStatus::Idle);
    assert!(!service.session().is_workout_clock_active());
    assert!(!service.session().is_rest_clock_active());
    Ok(())
}

#[test]
fn test_set_rest_duration_persists() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("config.toml");
    let mut service =
        AppService::with_store(MemoryStore::new(), Config::default(), config_path.clone());

    assert!(matches!(
        service.set_rest_duration(0),
        Err(ConfigError::InvalidRestDuration(0))
    ));
    service.set_rest_duration(90)?;
    assert_eq!(service.session_snapshot().rest_duration, 90);

    let saved = workout_journal_lib::load_config_util(&config_path)?;
    assert_eq!(saved.rest_duration_secs, 90);
    Ok(())
}
