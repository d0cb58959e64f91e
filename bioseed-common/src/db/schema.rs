//! Table and column names shared by schema creation and the stores
//!
//! Per-rank columns are generated from [`RANK_COLUMNS`] so the two sides
//! cannot drift apart.

pub const SPECIMENS_TABLE: &str = "specimens";
pub const VISITS_TABLE: &str = "visits";
pub const EFFORT_TABLE: &str = "effort";

/// Rank column prefixes, kingdom first. Index matches the rank's depth.
pub const RANK_COLUMNS: [&str; 8] = [
    "kingdom",
    "phylum",
    "class",
    "taxon_order",
    "family",
    "genus",
    "species",
    "subspecies",
];

/// Ranks carried per specimen and per visit (kingdom is implicit)
pub fn identified_rank_columns() -> &'static [&'static str] {
    &RANK_COLUMNS[1..]
}

pub fn names_column(rank: &str) -> String {
    format!("{rank}_names")
}

pub fn flags_column(rank: &str) -> String {
    format!("{rank}_flags")
}

pub fn ids_column(rank: &str) -> String {
    format!("{rank}_ids")
}

/// Specimen columns hold one name and one id per rank
pub fn specimen_id_column(rank: &str) -> String {
    format!("{rank}_id")
}

pub(crate) fn specimens_ddl() -> String {
    let mut columns = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "locality_id INTEGER NOT NULL".to_string(),
        "locality_name TEXT NOT NULL".to_string(),
        "is_cave INTEGER NOT NULL DEFAULT 0".to_string(),
        "start_date DATE".to_string(),
        "end_date DATE".to_string(),
        "normalized_collectors TEXT".to_string(),
    ];
    for rank in identified_rank_columns() {
        columns.push(format!("{rank} TEXT"));
        columns.push(format!("{} INTEGER", specimen_id_column(rank)));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {SPECIMENS_TABLE} (\n    {}\n)",
        columns.join(",\n    ")
    )
}

pub(crate) fn visits_ddl() -> String {
    let mut columns = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "location_id INTEGER NOT NULL".to_string(),
        "is_cave INTEGER NOT NULL DEFAULT 0".to_string(),
        "start_epoch_day INTEGER NOT NULL".to_string(),
        "end_epoch_day INTEGER".to_string(),
        "normalized_collectors TEXT NOT NULL".to_string(),
    ];
    for rank in identified_rank_columns() {
        columns.push(format!("{} TEXT", names_column(rank)));
        columns.push(format!("{} TEXT", ids_column(rank)));
        columns.push(format!("{} TEXT", flags_column(rank)));
    }
    columns.push("UNIQUE (location_id, start_epoch_day, normalized_collectors)".to_string());
    format!(
        "CREATE TABLE IF NOT EXISTS {VISITS_TABLE} (\n    {}\n)",
        columns.join(",\n    ")
    )
}

pub(crate) fn effort_ddl() -> String {
    let mut columns = vec![
        "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "location_id INTEGER NOT NULL".to_string(),
        "is_cave INTEGER NOT NULL DEFAULT 0".to_string(),
        "start_date DATE NOT NULL".to_string(),
        "end_date DATE NOT NULL".to_string(),
        "visit_count INTEGER NOT NULL".to_string(),
        "person_visit_count INTEGER NOT NULL".to_string(),
        "species_count INTEGER NOT NULL".to_string(),
        "is_final INTEGER NOT NULL DEFAULT 0".to_string(),
    ];
    for rank in RANK_COLUMNS {
        columns.push(format!("{} TEXT", names_column(rank)));
        columns.push(format!("{} TEXT", flags_column(rank)));
    }
    columns.push("per_visit_points TEXT NOT NULL".to_string());
    columns.push("per_person_visit_points TEXT NOT NULL".to_string());
    format!(
        "CREATE TABLE IF NOT EXISTS {EFFORT_TABLE} (\n    {}\n)",
        columns.join(",\n    ")
    )
}
