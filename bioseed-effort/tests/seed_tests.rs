//! Integration tests for seed selection

mod common;

use bioseed_common::Error;
use bioseed_effort::specimen::Specimen;
use bioseed_effort::{EffortAccumulator, Rank, SeedSelector, SeedSpec, SqliteStore, VisitAggregator};
use chrono::NaiveDate;
use common::{final_effort, sqlite_store, MemoryEffortStore};

fn spec(min_species: i64, max_species: i64, max_clusters: usize) -> SeedSpec {
    SeedSpec {
        min_species,
        max_species,
        max_clusters,
    }
}

/// Runs the full pipeline from specimens so seeds see real final snapshots
async fn pipeline_store(locations: &[(i64, &[&str])]) -> SqliteStore {
    let store = sqlite_store().await;
    let date = NaiveDate::from_ymd_opt(2022, 3, 9).unwrap();
    for (location, species) in locations {
        for name in *species {
            let specimen = Specimen::new(*location, format!("Site {location}"))
                .collected_on(date)
                .collected_by("Adams")
                .identify(Rank::Species, name, None)
                .unwrap();
            store.insert_specimen(&specimen).await.unwrap();
        }
    }
    VisitAggregator::new(&store).rebuild(&store, 10).await.unwrap();
    EffortAccumulator::new(&store, 10, "Animalia")
        .tally_effort()
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_greedy_coverage_picks_complementary_sites() {
    let store = pipeline_store(&[
        (1, &["a", "b", "c"]),
        (2, &["c", "d"]),
        (3, &["e"]),
    ])
    .await;

    let seeds = SeedSelector::new(&store, 100)
        .select_seeds(&spec(1, 100, 3))
        .await
        .unwrap();
    assert_eq!(seeds, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_stops_when_nothing_new_remains() {
    let store = pipeline_store(&[
        (1, &["a", "b", "c"]),
        (2, &["c", "d"]),
        (3, &["e"]),
        (4, &["a", "b"]),
    ])
    .await;

    let seeds = SeedSelector::new(&store, 2)
        .select_seeds(&spec(1, 100, 10))
        .await
        .unwrap();
    assert_eq!(seeds, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_richness_range_filters_candidates() {
    let store = pipeline_store(&[
        (1, &["a", "b", "c"]),
        (2, &["c", "d"]),
        (3, &["e"]),
    ])
    .await;

    let seeds = SeedSelector::new(&store, 100)
        .select_seeds(&spec(1, 2, 5))
        .await
        .unwrap();
    assert_eq!(seeds, vec![2, 3]);
}

#[tokio::test]
async fn test_ties_break_on_lowest_location() {
    let store = MemoryEffortStore::new(vec![
        final_effort(9, &["x", "y"]),
        final_effort(4, &["p", "q"]),
    ]);
    let seeds = SeedSelector::new(&store, 10)
        .select_seeds(&spec(1, 10, 1))
        .await
        .unwrap();
    assert_eq!(seeds, vec![4]);
}

#[tokio::test]
async fn test_empty_store_yields_no_seeds() {
    let store = sqlite_store().await;
    let seeds = SeedSelector::new(&store, 10)
        .select_seeds(&spec(1, 100, 5))
        .await
        .unwrap();
    assert!(seeds.is_empty());
}

#[tokio::test]
async fn test_zero_clusters_requested() {
    let store = MemoryEffortStore::new(vec![final_effort(1, &["a"])]);
    let seeds = SeedSelector::new(&store, 10)
        .select_seeds(&spec(1, 10, 0))
        .await
        .unwrap();
    assert!(seeds.is_empty());
    assert_eq!(store.fetch_count(), 0);
}

#[tokio::test]
async fn test_inverted_range_rejected() {
    let store = MemoryEffortStore::new(Vec::new());
    let result = SeedSelector::new(&store, 10)
        .select_seeds(&spec(5, 1, 3))
        .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_scan_prunes_once_richness_cannot_win() {
    let mut efforts = vec![
        final_effort(1, &["a", "b", "c", "d", "e"]),
        final_effort(2, &["f", "g", "h", "i"]),
        final_effort(3, &["j", "k", "l"]),
    ];
    let singles: Vec<String> = (0..17).map(|i| format!("z{i}")).collect();
    for (i, name) in singles.iter().enumerate() {
        efforts.push(final_effort(100 + i as i64, &[name.as_str()]));
    }
    let store = MemoryEffortStore::new(efforts);

    let seeds = SeedSelector::new(&store, 2)
        .select_seeds(&spec(1, 100, 2))
        .await
        .unwrap();
    assert_eq!(seeds, vec![1, 2]);
    // One fetch for the first seed, two pages before location 3 is pruned
    assert_eq!(store.fetch_count(), 3);
}

#[tokio::test]
async fn test_unsorted_store_degrades_selection() {
    let efforts = vec![
        final_effort(1, &["a"]),
        final_effort(2, &["b", "c", "d"]),
    ];

    let sorted = MemoryEffortStore::new(efforts.clone());
    let seeds = SeedSelector::new(&sorted, 10)
        .select_seeds(&spec(1, 10, 1))
        .await
        .unwrap();
    assert_eq!(seeds, vec![2]);

    let unsorted = MemoryEffortStore::unsorted(efforts);
    let seeds = SeedSelector::new(&unsorted, 10)
        .select_seeds(&spec(1, 10, 1))
        .await
        .unwrap();
    assert_eq!(seeds, vec![1]);
}
