//! End-to-end assembly scenarios against in-memory collaborators.
#![recursion_limit = "256"]

mod common;

use common::{CountingCatalog, FakeWeather, LogCapture};
use pvsim_assembly::components::ResolvedBattery;
use pvsim_assembly::config::RunOptions;
use pvsim_assembly::error::Error;
use pvsim_assembly::lifetime::DegradationMode;
use pvsim_assembly::sim::energy::HOURS_PER_YEAR;
use pvsim_assembly::sim::{
    AssignmentStatus, Category, EngineOutputs, Orchestrator, ReplayEngine, Settings,
};

fn number(engine: &ReplayEngine, group: &str, key: &str) -> Option<f64> {
    engine
        .merged()
        .group(group)
        .and_then(|g| g.get(key))
        .and_then(|v| v.as_f64())
}

#[test]
fn string_design_with_battery_assigns_every_category() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], true);
    let catalog = CountingCatalog::new(common::catalog());
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    let outputs = orchestrator
        .run(&sources, &common::target(25))
        .expect("string design runs");
    assert_eq!(outputs.annual_energy, 1200.0);

    assert_eq!(orchestrator.statuses().assigned_count(), Category::ALL.len());
    assert_eq!(orchestrator.system_capacity(), Some(8000.0));
    assert_eq!(orchestrator.engine().executions(), 1);
    assert_eq!(orchestrator.engine().assignments().len(), Category::ALL.len());

    let engine = orchestrator.engine();
    assert_eq!(number(engine, "SystemDesign", "subarray1_nstrings"), Some(2.0));
    assert_eq!(number(engine, "SystemDesign", "subarray1_modules_per_string"), Some(10.0));
    assert_eq!(number(engine, "SystemDesign", "system_capacity"), Some(8000.0));
    assert_eq!(number(engine, "BatterySystem", "en_batt"), Some(1.0));
    // Single array on a string inverter is DC coupled.
    assert_eq!(number(engine, "BatterySystem", "batt_ac_or_dc"), Some(0.0));
    assert_eq!(number(engine, "Lifetime", "analysis_period"), Some(25.0));
}

#[test]
fn energy_queries_follow_ac_degradation() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    orchestrator
        .run(&sources, &common::target(5))
        .expect("five-year run succeeds");

    let energy = orchestrator.energy().expect("energy after execution");
    assert_eq!(energy.years(), 5);
    assert_eq!(energy.month(1, 6).expect("June of year one"), 100.0);
    let year_two = energy.year(2).expect("year two");
    assert!((year_two - 1200.0 * (1.0 - 0.0055)).abs() < 1e-6);
    assert_eq!(energy.all_months().expect("all months").len(), 60);
    assert!(matches!(energy.year(6), Err(Error::OutOfRange(_))));
}

#[test]
fn more_than_four_arrays_fail_before_any_catalog_lookup() {
    let arrays = (0..5).map(|_| common::array(10, 1, 180.0)).collect();
    let design = common::string_design(arrays, true);
    let catalog = CountingCatalog::new(common::catalog());
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    let err = orchestrator.run(&sources, &common::target(1)).err();

    assert!(matches!(err, Some(Error::UnsupportedTopology(_))));
    assert_eq!(catalog.calls(), 0);
    assert_eq!(weather.calls(), 0);
    assert_eq!(orchestrator.statuses().assigned_count(), 0);
    assert!(orchestrator.engine().assignments().is_empty());
}

#[test]
fn uneven_stringing_leaves_engine_untouched() {
    let design = common::string_design(vec![common::array(10, 3, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    let err = orchestrator.run(&sources, &common::target(1)).err();

    assert!(matches!(
        err,
        Some(Error::UnevenStringing {
            subarray: 1,
            strings: 3,
            modules: 10
        })
    ));
    assert!(orchestrator
        .statuses()
        .iter()
        .all(|(_, s)| s == AssignmentStatus::Unset));
    assert!(orchestrator.engine().assignments().is_empty());
}

#[test]
fn design_without_battery_still_completes_battery_steps() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    orchestrator
        .run(&sources, &common::target(1))
        .expect("one-year run succeeds");

    let statuses = orchestrator.statuses();
    assert!(statuses.is_assigned(Category::BatterySystem));
    assert!(statuses.is_assigned(Category::BatteryCell));
    assert!(statuses.is_assigned(Category::BatteryDispatch));
    assert_eq!(
        orchestrator.plan().and_then(|p| p.battery.clone()),
        Some(ResolvedBattery::Disabled)
    );

    let merged = orchestrator.engine().merged();
    assert_eq!(number(orchestrator.engine(), "BatterySystem", "en_batt"), Some(0.0));
    assert!(merged.group("BatteryCell").is_none());
    assert!(merged.group("BatteryDispatch").is_none());
}

#[test]
fn two_arrays_make_the_battery_ac_coupled() {
    let arrays = vec![common::array(10, 1, 180.0), common::array(8, 2, 90.0)];
    let design = common::string_design(arrays, true);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    orchestrator
        .run(&sources, &common::target(1))
        .expect("one-year run succeeds");

    let engine = orchestrator.engine();
    assert_eq!(number(engine, "BatterySystem", "batt_ac_or_dc"), Some(1.0));
    assert_eq!(number(engine, "SystemDesign", "subarray2_enable"), Some(1.0));
    assert_eq!(number(engine, "SystemDesign", "subarray2_mppt_input"), Some(2.0));
    assert_eq!(number(engine, "SystemDesign", "subarray3_enable"), Some(0.0));
    assert_eq!(number(engine, "Inverter", "inv_num_mppt"), Some(2.0));
}

#[test]
fn azimuth_beyond_engine_range_is_clamped() {
    let design = common::string_design(vec![common::array(20, 2, 360.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::recording(), Settings::default());
    let logs = LogCapture::default();
    let plan = logs
        .warnings(|| orchestrator.prepare(&sources, &common::target(1)))
        .expect("design with azimuth 360 prepares");
    let azimuth = plan
        .step(Category::SystemDesign)
        .and_then(|set| set.group("SystemDesign"))
        .and_then(|g| g.get("subarray1_azimuth"))
        .and_then(|v| v.as_f64());
    assert_eq!(azimuth, Some(359.9));

    let warnings = logs.contents();
    assert!(warnings.contains("WARN"));
    assert!(warnings.contains("correcting azimuth above engine maximum"));
    assert!(warnings.contains("azimuth=360"));
}

#[test]
fn in_range_azimuth_logs_no_warning() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::recording(), Settings::default());
    let logs = LogCapture::default();
    logs.warnings(|| orchestrator.prepare(&sources, &common::target(1)))
        .expect("south-facing design prepares");
    assert!(!logs.contents().contains("correcting azimuth"));
}

#[test]
fn microinverter_shading_is_reduced_to_a_third() {
    let design = common::micro_design(vec![common::array(12, 1, 180.0)]);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::recording(), Settings::default());
    let plan = orchestrator
        .prepare(&sources, &common::target(1))
        .expect("microinverter design prepares");
    let params = plan.parameters();
    let matrix = params
        .group("Shading")
        .and_then(|g| g.get("subarray1_shading_mxh"))
        .and_then(|v| v.as_matrix())
        .map(<[Vec<f64>]>::to_vec)
        .expect("shading matrix for sub-array 1");
    assert_eq!(matrix.len(), 12);
    assert!(matrix.iter().flatten().all(|v| (v - 5.0 / 3.0).abs() < 1e-9));

    let nstrings = params
        .group("SystemDesign")
        .and_then(|g| g.get("subarray1_nstrings"))
        .and_then(|v| v.as_f64());
    assert_eq!(nstrings, Some(12.0));
}

#[test]
fn engine_rejection_stops_at_the_failing_category() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], true);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let engine = ReplayEngine::new(common::outputs()).rejecting("Losses", "\n bad   loss value\n");
    let mut orchestrator = Orchestrator::new(engine, Settings::default());
    let err = orchestrator.run(&sources, &common::target(1)).err();

    assert!(matches!(
        err,
        Some(Error::EngineRejectedParameters { ref category, ref message })
            if category == "losses" && message == "bad loss value"
    ));
    let statuses = orchestrator.statuses();
    assert!(statuses.is_assigned(Category::Shading));
    assert!(!statuses.is_assigned(Category::Losses));
    assert!(!statuses.is_assigned(Category::BatterySystem));
    assert!(!statuses.is_assigned(Category::PriceSignal));
    assert_eq!(orchestrator.engine().executions(), 0);
}

#[test]
fn execution_failure_keeps_two_diagnostic_lines() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let engine = ReplayEngine::failing("\n  exec fail(pvsamv1):\n  subarray1 voltage out of range\ntrace\n");
    let mut orchestrator = Orchestrator::new(engine, Settings::default());
    let err = orchestrator.run(&sources, &common::target(1)).err();

    assert!(matches!(
        err,
        Some(Error::EngineExecutionFailed(ref m))
            if m == "exec fail(pvsamv1): subarray1 voltage out of range"
    ));
    assert_eq!(orchestrator.statuses().assigned_count(), Category::ALL.len());
    assert!(orchestrator.outputs().is_none());
}

#[test]
fn excluded_categories_stay_unset() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], true);
    let catalog = CountingCatalog::new(common::catalog());
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let settings = Settings {
        options: RunOptions {
            include_batteries: false,
            ..RunOptions::default()
        },
        ..Settings::default()
    };
    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), settings);
    orchestrator
        .run(&sources, &common::target(1))
        .expect("one-year run succeeds");

    let statuses = orchestrator.statuses();
    assert!(!statuses.is_assigned(Category::BatterySystem));
    assert!(!statuses.is_assigned(Category::BatteryCell));
    assert!(!statuses.is_assigned(Category::BatteryDispatch));
    assert_eq!(statuses.assigned_count(), Category::ALL.len() - 3);
    // Module and inverter only.
    assert_eq!(catalog.calls(), 2);
}

#[test]
fn dc_mode_reads_the_multi_year_series() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut hourly = vec![1.0; HOURS_PER_YEAR];
    hourly.extend(vec![0.5; HOURS_PER_YEAR]);
    let outputs = EngineOutputs {
        hourly_gen: hourly,
        ..common::outputs()
    };
    let settings = Settings {
        degradation: DegradationMode::Dc,
        ..Settings::default()
    };
    let mut orchestrator = Orchestrator::new(ReplayEngine::new(outputs), settings);
    orchestrator
        .run(&sources, &common::target(2))
        .expect("two-year DC run succeeds");

    assert_eq!(
        number(orchestrator.engine(), "Lifetime", "system_use_lifetime_output"),
        Some(1.0)
    );
    let energy = orchestrator.energy().expect("energy after execution");
    assert_eq!(energy.month(1, 1).expect("January of year one"), 744.0);
    assert_eq!(energy.year(2).expect("year two"), 0.5 * HOURS_PER_YEAR as f64);
}

#[test]
fn requested_degradation_must_cover_the_horizon() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], false);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let fractions = [0.0, 0.01];
    let mut target = common::target(5);
    target.annual_degradation = Some(&fractions);

    let mut orchestrator = Orchestrator::new(ReplayEngine::recording(), Settings::default());
    let err = orchestrator.prepare(&sources, &target).err();
    assert!(matches!(
        err,
        Some(Error::LengthMismatch {
            expected: 5,
            actual: 2
        })
    ));
}

#[test]
fn failed_run_discards_the_previous_success() {
    let good = common::string_design(vec![common::array(20, 2, 180.0)], true);
    let uneven = common::string_design(vec![common::array(10, 3, 180.0)], true);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    orchestrator
        .run(&common::sources(&good, &catalog, &sheets, &weather), &common::target(1))
        .expect("first run succeeds");
    assert_eq!(orchestrator.statuses().assigned_count(), Category::ALL.len());

    let err = orchestrator
        .run(&common::sources(&uneven, &catalog, &sheets, &weather), &common::target(1))
        .err();
    assert!(matches!(err, Some(Error::UnevenStringing { .. })));
    assert_eq!(orchestrator.statuses().assigned_count(), 0);
    assert!(orchestrator.plan().is_none());
    assert!(orchestrator.system_capacity().is_none());
    assert!(orchestrator.outputs().is_none());
    assert!(matches!(orchestrator.energy(), Err(Error::InvalidRequest(_))));
}

#[test]
fn prepare_clears_state_of_an_assembled_run() {
    let design = common::string_design(vec![common::array(20, 2, 180.0)], true);
    let catalog = common::catalog();
    let sheets = common::spec_sheets();
    let weather = FakeWeather::new();
    let sources = common::sources(&design, &catalog, &sheets, &weather);

    let mut orchestrator = Orchestrator::new(ReplayEngine::new(common::outputs()), Settings::default());
    let plan = orchestrator
        .prepare(&sources, &common::target(1))
        .expect("design prepares");
    orchestrator.assemble(plan).expect("first assembly succeeds");
    assert_eq!(orchestrator.statuses().assigned_count(), Category::ALL.len());

    let plan = orchestrator
        .prepare(&sources, &common::target(1))
        .expect("design prepares again");
    assert_eq!(orchestrator.statuses().assigned_count(), 0);
    assert!(orchestrator.system_capacity().is_none());
    assert_eq!(plan.system_capacity, 8000.0);
}
