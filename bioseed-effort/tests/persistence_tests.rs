//! End-to-end pipeline against an on-disk database

use bioseed_common::db::init_database;
use bioseed_effort::specimen::Specimen;
use bioseed_effort::{
    EffortAccumulator, EffortStore, Rank, SeedSelector, SeedSpec, SqliteStore, VisitAggregator,
};
use chrono::NaiveDate;

#[tokio::test]
async fn test_pipeline_results_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bioseed.db");

    {
        let store = SqliteStore::new(init_database(&db_path).await.unwrap());
        let first = NaiveDate::from_ymd_opt(2018, 10, 2).unwrap();
        let second = NaiveDate::from_ymd_opt(2018, 11, 20).unwrap();

        let rows = [
            Specimen::new(11, "Hidden River Cave")
                .in_cave(true)
                .collected_on(first)
                .collected_by("Lewis and Clark")
                .identify(Rank::Order, "Araneae", None)
                .unwrap(),
            Specimen::new(11, "Hidden River Cave")
                .in_cave(true)
                .collected_on(second)
                .collected_by("Lewis")
                .identify(Rank::Order, "Araneae", None)
                .unwrap()
                .identify(Rank::Genus, "Nesticus", Some(301))
                .unwrap(),
            Specimen::new(11, "Hidden River Cave")
                .in_cave(true)
                .collected_on(second)
                .collected_by("Lewis")
                .identify(Rank::Genus, "Phanetta", None)
                .unwrap(),
        ];
        for row in &rows {
            store.insert_specimen(row).await.unwrap();
        }

        VisitAggregator::new(&store).rebuild(&store, 100).await.unwrap();
        EffortAccumulator::new(&store, 100, "Animalia")
            .tally_effort()
            .await
            .unwrap();
        store.pool().close().await;
    }

    let store = SqliteStore::new(init_database(&db_path).await.unwrap());
    let effort = store.final_effort(11).await.unwrap().expect("final snapshot");

    // Araneae alone counts on the first visit, then is superseded at the
    // effort level by the second visit's genera
    assert_eq!(effort.visit_count, 2);
    assert_eq!(effort.person_visit_count, 3);
    assert_eq!(effort.per_visit_points.last().map(|p| p.species), Some(2));
    assert_eq!(effort.species_count, 2);
    assert!(effort.is_cave);

    let seeds = SeedSelector::new(&store, 10)
        .select_seeds(&SeedSpec {
            min_species: 1,
            max_species: 10,
            max_clusters: 3,
        })
        .await
        .unwrap();
    assert_eq!(seeds, vec![11]);
}
