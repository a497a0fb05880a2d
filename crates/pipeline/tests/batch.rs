//! Batch runs over the synthetic `SYN` country.

mod common;

use approx::assert_relative_eq;
use common::*;
use floodrisk_core::CRS;
use floodrisk_pipeline::{
    rows_from_csv, ArtifactKey, ArtifactStore, FsStore, JobOutcome, JobState, MemoryStore,
    RegionJobRunner, SkipReason,
};

fn outcome<'a>(report: &'a floodrisk_pipeline::BatchReport, gid_id: &str) -> &'a JobOutcome {
    &report
        .jobs()
        .find(|j| j.job.gid_id == gid_id)
        .unwrap()
        .outcome
}

fn seeded_runner() -> RegionJobRunner<MemoryStore> {
    let mut store = MemoryStore::new();
    seed(&mut store);
    RegionJobRunner::new(config("data"), store).unwrap()
}

#[test]
fn test_batch_outcomes() {
    let mut runner = seeded_runner();
    let report = runner.run_batch(&registry());

    // RCH is a high income country and never reaches the runner
    assert_eq!(report.countries.len(), 1);
    assert!(report.failed_countries.is_empty());
    assert_eq!(report.countries[0].regions, 3);
    assert_eq!(report.completed(), 1);
    assert_eq!(report.skipped(), 2);
    assert_eq!(report.failed(), 0);

    assert_eq!(
        outcome(&report, "SYN.2_1"),
        &JobOutcome::Skipped(SkipReason::EmptyGeometry)
    );
    assert_eq!(
        outcome(&report, "SYN.3_1"),
        &JobOutcome::Skipped(SkipReason::NoCoverage)
    );

    let JobOutcome::Completed(row) = outcome(&report, "SYN.1_1") else {
        panic!("SYN.1_1 did not complete");
    };
    assert_eq!(row.iso3, "SYN");
    assert_eq!(row.income_group, "LMC");
    assert_eq!(row.continent, "Africa");
    assert_relative_eq!(row.pop_est, expected_pop_est(), max_relative = 1e-3);
    assert_relative_eq!(row.area_km2, 0.5 * KM_PER_DEG * KM_PER_DEG, max_relative = 1e-3);
    // Hazard covers the western half of the region
    assert_relative_eq!(row.total_pop, 2.0 * expected_pop_est(), max_relative = 1e-3);
    assert!(!row.exceeds_baseline);
    assert_eq!(row.rwi_mean, Some(20.0));
    assert_eq!(row.rwi_min, Some(10.0));
    assert_eq!(row.rwi_max, Some(30.0));
}

#[test]
fn test_country_table() {
    let mut runner = seeded_runner();
    runner.run_batch(&registry());

    let key = ArtifactKey::CountryTable {
        iso3: "SYN".into(),
        scenario: SCENARIO.into(),
    };
    let rows = rows_from_csv(&runner.store().read_bytes(&key).unwrap()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].gid_id, "SYN.1_1");

    let region_wealth = runner
        .store()
        .read_features(&ArtifactKey::RegionWealth {
            iso3: "SYN".into(),
            gid_id: "SYN.1_1".into(),
        })
        .unwrap();
    assert_eq!(region_wealth.len(), 3);
}

#[test]
fn test_second_run_writes_nothing() {
    let mut runner = seeded_runner();
    let first = runner.run_batch(&registry());
    let writes = runner.store().writes();
    let snapshot = runner.store().clone();

    let second = runner.run_batch(&registry());
    assert_eq!(runner.store().writes(), writes);
    assert_eq!(second.countries[0].tables_written, 0);

    for key in snapshot.keys() {
        assert_eq!(
            runner.store().read_bytes(key).unwrap(),
            snapshot.read_bytes(key).unwrap(),
            "{} changed",
            key
        );
    }

    let done = second.jobs().find(|j| j.job.gid_id == "SYN.1_1").unwrap();
    assert_eq!(done.resumed_from, JobState::StatisticsWritten);
    assert_eq!(outcome(&first, "SYN.1_1"), &done.outcome);
}

#[test]
fn test_unknown_country_does_not_stop_batch() {
    let registry = floodrisk_pipeline::CountryRegistry::from_reader(
        "iso3,gid_region,income_group,continent\nXYZ,1,LIC,Asia\nSYN,1,LMC,Africa\n".as_bytes(),
    )
    .unwrap();
    let mut runner = seeded_runner();
    let report = runner.run_batch(&registry);

    assert_eq!(report.failed_countries.len(), 1);
    assert_eq!(report.failed_countries[0].0, "XYZ");
    assert_eq!(report.completed(), 1);
}

#[test]
fn test_run_countries_reports_each_country() {
    let registry = registry();
    let requested: Vec<_> = ["SYN", "RCH"]
        .iter()
        .map(|iso3| registry.get(iso3).unwrap())
        .collect();

    let mut seen = Vec::new();
    let mut runner = seeded_runner();
    let report = runner.run_countries(requested, |c| seen.push(c.iso3.clone()));

    assert_eq!(seen, ["SYN", "RCH"]);
    // RCH has no boundaries and fails on its own
    assert_eq!(report.failed_countries.len(), 1);
    assert_eq!(report.failed_countries[0].0, "RCH");
    assert_eq!(report.completed(), 1);
}

#[test]
fn test_coastal_lookup_limits_regions() {
    let mut cfg = config("data");
    cfg.inputs.coastal_lookup = Some("raw/{iso3}_coastal.csv".into());

    let mut store = MemoryStore::new();
    seed(&mut store);
    store
        .write_bytes(
            &ArtifactKey::CoastalLookup { iso3: "SYN".into() },
            b"gid_id\nSYN.1_1\n",
        )
        .unwrap();

    let mut runner = RegionJobRunner::new(cfg, store).unwrap();
    let report = runner.run_batch(&registry());
    assert_eq!(report.countries[0].regions, 1);
    assert_eq!(report.completed(), 1);
    assert_eq!(report.skipped(), 0);
}

#[test]
fn test_filesystem_batch_completes() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let mut store = FsStore::from_config(&cfg);
    seed(&mut store);

    let mut runner = RegionJobRunner::new(cfg, store).unwrap();
    let report = runner.run_batch(&registry());
    assert_eq!(report.failed(), 0);
    let JobOutcome::Completed(row) = outcome(&report, "SYN.1_1") else {
        panic!("SYN.1_1 did not complete: {:?}", outcome(&report, "SYN.1_1"));
    };
    assert_relative_eq!(row.pop_est, expected_pop_est(), max_relative = 1e-3);

    // Clipped rasters keep their georeferencing on disk
    let clipped = runner
        .store()
        .read_raster(&ArtifactKey::HazardRaster {
            iso3: "SYN".into(),
            scenario: SCENARIO.into(),
            gid_id: "SYN.1_1".into(),
        })
        .unwrap();
    assert_eq!(clipped.crs(), Some(&CRS::wgs84()));
    assert_eq!(clipped.nodata(), Some(255.0));
    assert_relative_eq!(clipped.transform().origin_x, 0.0, epsilon = 1e-9);
    assert_relative_eq!(clipped.transform().origin_y, 0.5, epsilon = 1e-9);
}

#[test]
fn test_filesystem_resume() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let mut store = FsStore::from_config(&cfg);
    seed(&mut store);

    let mut runner = RegionJobRunner::new(cfg, store).unwrap();
    let first = runner.run_batch(&registry());
    assert_eq!(first.completed(), 1);

    let exposure = ArtifactKey::Exposure {
        iso3: "SYN".into(),
        scenario: SCENARIO.into(),
        gid_id: "SYN.1_1".into(),
    };
    let stats = ArtifactKey::RegionStats {
        iso3: "SYN".into(),
        scenario: SCENARIO.into(),
        gid_id: "SYN.1_1".into(),
    };
    let table = runner
        .store()
        .path(&ArtifactKey::CountryTable {
            iso3: "SYN".into(),
            scenario: SCENARIO.into(),
        })
        .unwrap();
    assert!(table.starts_with(dir.path()));
    let table_before = std::fs::read(&table).unwrap();

    // Interrupted after the population stage
    for key in [&exposure, &stats] {
        std::fs::remove_file(runner.store().path(key).unwrap()).unwrap();
    }

    let second = runner.run_batch(&registry());
    let resumed = second.jobs().find(|j| j.job.gid_id == "SYN.1_1").unwrap();
    assert_eq!(resumed.resumed_from, JobState::PopulationReady);
    assert_eq!(outcome(&first, "SYN.1_1"), &resumed.outcome);
    assert!(runner.store().exists(&exposure));
    assert_eq!(std::fs::read(&table).unwrap(), table_before);
}
