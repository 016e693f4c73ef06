use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;

use bet_ledger::Error;
use bet_ledger::artifact::{read_outcomes, read_predictions, write_snapshot};
use bet_ledger::error::ArtifactKind;
use bet_ledger::locator::{FileTemplate, locate};
use bet_ledger::model::GameDate;

#[test]
fn prediction_file_with_bom_and_extra_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nba_games_predict_2025-01-10.csv");
    fs::write(
        &path,
        "\u{feff}Unnamed: 0,home_team,away_team,home_team_prob,odds 1,odds 2,result,date,accuracy\n\
         0,Boston Celtics,Miami Heat,\"0,64\",\"1,55\",\"2,45\",,2025-01-10,\n\
         \n\
         1,Denver Nuggets,Utah Jazz,0.81,1.2,4.4,nan,2025-01-10 19:30:00,\n",
    )
    .unwrap();

    let batch = read_predictions(&path).expect("predictions parse");
    assert_eq!(batch.records.len(), 2);
    assert!(batch.quality.is_clean());

    let first = &batch.records[0];
    assert_eq!(first.home_team, "Boston Celtics");
    assert_eq!(first.home_team_prob, Some(0.64));
    assert_eq!(first.odds_home, 1.55);
    assert_eq!(first.odds_away, 2.45);
    assert_eq!(first.result, None);

    let second = &batch.records[1];
    assert_eq!(second.result, None);
    assert_eq!(
        second.date,
        GameDate::Known(NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
    );
}

#[test]
fn missing_column_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("p.csv");
    fs::write(&path, "home_team,away_team,home_team_prob,odds 1,date\nA,B,0.5,1.9,2025-01-10\n")
        .unwrap();

    match read_predictions(&path) {
        Err(Error::MissingColumn { column, .. }) => assert!(column.contains("odds 2")),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn outcomes_keep_season_and_flags() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nba_games_2025-01-11.csv");
    fs::write(
        &path,
        ",mp,date,team,won,season\n\
         0,240,2025-01-10,BOS,True,2025\n\
         1,240,2025-01-10,MIA,False,2025\n\
         2,240,garbage,LAL,1,2025\n\
         3,240,2025-01-10,UTA,??,2025\n",
    )
    .unwrap();

    let batch = read_outcomes(&path).expect("outcomes parse");
    assert_eq!(batch.records.len(), 4);
    assert!(batch.records[0].won);
    assert!(!batch.records[1].won);
    assert_eq!(batch.records[2].date, GameDate::Unknown);
    assert!(!batch.records[3].won);
    assert_eq!(batch.quality.unknown_dates, 1);
    assert_eq!(batch.quality.unreadable_won, 1);
    assert!(batch.records.iter().all(|r| r.season == "2025"));
}

#[test]
fn snapshot_write_leaves_no_temp_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ledger").join("combined_nba_predictions_acc_2025-01-11.csv");
    write_snapshot(&path, &[]).expect("write");

    let body = fs::read_to_string(&path).unwrap();
    assert_eq!(
        body,
        "home_team,away_team,home_team_prob,odds_home,odds_away,result,date\n"
    );
    let names: Vec<_> = fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names.len(), 1);
}

#[test]
fn locate_finds_newest_file_in_window() {
    let dir = tempdir().unwrap();
    let template = FileTemplate::new("nba_games_{}.csv").unwrap();
    for day in ["2025-01-02", "2025-01-06"] {
        fs::write(dir.path().join(format!("nba_games_{day}.csv")), "").unwrap();
    }
    // Directories with a matching name are not artifacts.
    fs::create_dir(dir.path().join("nba_games_2025-01-08.csv")).unwrap();

    let reference = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
    let found = locate(ArtifactKind::Outcomes, dir.path(), &template, reference, 120)
        .expect("file in window");
    assert_eq!(found.date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
    assert!(found.path.ends_with("nba_games_2025-01-06.csv"));

    let err = locate(ArtifactKind::Outcomes, dir.path(), &template, reference, 2)
        .expect_err("nothing within two days");
    assert!(err.to_string().contains("2025-01-07"));
}
