mod common;

use common::{
    assert_close, full_config, line_region, scenario_config, unit_steps, ScriptedSolver, REGION,
};
use mlmc_qoi::config::TimeParams;
use mlmc_qoi::error::{QoiError, QoiResult};
use mlmc_qoi::qoi::QoiOutcome;
use mlmc_qoi::region::{Node, Region};
use mlmc_qoi::scenario::{
    Driver, InterestRegion, PhysicsSolver, ScenarioState, SimClock, SimulationScenario, Stage,
    StepSample,
};
use mlmc_qoi::synthetic::SyntheticFlow;
use rstest::rstest;

fn drag_moment_solver() -> ScriptedSolver {
    ScriptedSolver::new(
        &["drag", "moment"],
        vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]],
        vec![vec![5.0]; 3],
    )
    .with_weighted(vec![5.0])
}

#[test]
fn test_reference_case_end_to_end() {
    let config = scenario_config("drag,moment", 0.0);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();
    let mut driver = Driver::new(&unit_steps(3), drag_moment_solver()).unwrap();

    let record = driver
        .run(&mut scenario)
        .unwrap()
        .into_record()
        .expect("reference level should produce a record");

    assert_eq!(record.len(), 6);
    assert_eq!(record.scalar_means(), vec![2.0, 20.0]);
    assert_eq!(record.node_means(), vec![5.0]);
    assert_eq!(
        record.scalar_power_sums()[0].to_array(),
        [6.0, 14.0, 36.0, 98.0, 276.0, 794.0, 2316.0, 6818.0, 20196.0, 60074.0, 3.0]
    );
    let node = record.node_power_sums();
    assert_eq!(node[0].power_sums[0], 15.0);
    assert_eq!(node[0].power_sums[1], 75.0);
    assert_eq!(node[0].count, 3);
    assert_eq!(scenario.state(), ScenarioState::RecordAvailable);
}

#[test]
fn test_burnin_discards_early_steps() {
    let config = scenario_config("drag", 0.5);
    let scalars = (1..=10).map(|i| vec![i as f64]).collect();
    let solver = ScriptedSolver::new(&["drag"], scalars, vec![vec![1.0]; 10])
        .with_weighted(vec![1.0]);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();

    let record = Driver::new(&unit_steps(10), solver)
        .unwrap()
        .run(&mut scenario)
        .unwrap()
        .into_record()
        .unwrap();

    // Steps at t = 5..=10 pass the gate t >= 0.5 * 10.
    assert_eq!(scenario.sample_count(), 6);
    assert_eq!(record.scalar_power_sums()[0].power_sums[0], 45.0);
    assert_eq!(record.scalar_means(), vec![7.5]);
}

#[test]
fn test_sample_count_grows_by_one_per_accepted_step() {
    let config = scenario_config("drag", 0.0);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1, 2]), None, true).unwrap();
    scenario.initialize().unwrap();

    let mut clock = SimClock::new(&unit_steps(3));
    let mut counts = vec![scenario.sample_count()];
    while clock.advance() {
        scenario
            .interest_region_mut()
            .ensure_field("PRESSURE")
            .copy_from_slice(&[clock.time, -clock.time]);
        let sample = StepSample::new().with("drag", clock.time);
        scenario.finalize_step(&clock, &sample).unwrap();
        counts.push(scenario.sample_count());
        assert_eq!(
            scenario.nodal().unwrap().sample_count(),
            scenario.sample_count()
        );
    }
    assert_eq!(counts, vec![0, 1, 2, 3]);
    assert_eq!(scenario.state(), ScenarioState::Accumulating);
}

#[test]
fn test_initialized_without_samples_gives_no_data() {
    let config = scenario_config("drag", 0.0);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();
    scenario.initialize().unwrap();

    assert_eq!(scenario.evaluate_qoi().unwrap(), QoiOutcome::NoData);
    assert_eq!(scenario.state(), ScenarioState::NoData);
}

#[test]
fn test_non_reference_level_records_nothing() {
    let config = scenario_config("drag,moment", 0.0);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, false).unwrap();

    let outcome = Driver::new(&unit_steps(3), drag_moment_solver())
        .unwrap()
        .run(&mut scenario)
        .unwrap();

    assert!(outcome.is_no_data());
    assert_eq!(scenario.sample_count(), 0);
    assert_eq!(scenario.state(), ScenarioState::NoData);
}

#[test]
fn test_evaluate_twice_gives_identical_records() {
    let config = scenario_config("drag,moment", 0.0);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();
    let first = Driver::new(&unit_steps(3), drag_moment_solver())
        .unwrap()
        .run(&mut scenario)
        .unwrap();
    let second = scenario.evaluate_qoi().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_inconsistent_step_is_fatal() {
    let config = scenario_config("drag,moment", 0.0);
    let solver = ScriptedSolver::new(&["drag"], vec![vec![1.0]; 3], vec![vec![5.0]; 3]);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();

    let res = Driver::new(&unit_steps(3), solver).unwrap().run(&mut scenario);
    assert!(matches!(res, Err(QoiError::InconsistentUpdate(_))));
    assert_eq!(scenario.sample_count(), 0);
    assert_eq!(scenario.nodal().unwrap().sample_count(), 0);
}

#[test]
fn test_hooks_require_initialize() {
    let config = scenario_config("drag", 0.0);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();
    let mut clock = SimClock::new(&unit_steps(1));
    clock.advance();

    let sample = StepSample::new().with("drag", 1.0);
    assert!(matches!(
        scenario.finalize_step(&clock, &sample),
        Err(QoiError::Validation(_))
    ));
    assert!(matches!(
        scenario.evaluate_qoi(),
        Err(QoiError::Validation(_))
    ));
    assert_eq!(scenario.state(), ScenarioState::Uninitialized);

    scenario.initialize().unwrap();
    assert!(matches!(
        scenario.initialize(),
        Err(QoiError::Validation(_))
    ));
}

fn reference_region(xs: &[f64]) -> Region {
    let nodes = xs
        .iter()
        .enumerate()
        .map(|(i, &x)| Node::new(i as u64 + 1, x, 0.0, 0.0))
        .collect();
    Region::new("reference", nodes).unwrap()
}

#[test]
fn test_mapping_onto_reference_region() {
    let mut config = scenario_config("drag", 0.0);
    config.mapping = true;

    // Model nodes sit at x = 1, 2, 3.
    let model = line_region(REGION, &[1, 2, 3]);
    let reference = reference_region(&[1.9, 2.1, 3.0]);
    let solver = ScriptedSolver::new(
        &["drag"],
        vec![vec![1.0], vec![1.0]],
        vec![vec![1.0, 5.0, 9.0]; 2],
    )
    .with_weighted(vec![1.0, 5.0, 9.0]);

    let mut scenario = SimulationScenario::new(&config, model, Some(reference), true).unwrap();
    let record = Driver::new(&unit_steps(2), solver)
        .unwrap()
        .run(&mut scenario)
        .unwrap()
        .into_record()
        .unwrap();

    assert_eq!(record.node_count(), 3);
    assert_eq!(record.node_means(), vec![5.0, 5.0, 9.0]);
    let firsts: Vec<f64> = record
        .node_power_sums()
        .iter()
        .map(|s| s.power_sums[0])
        .collect();
    assert_eq!(firsts, vec![10.0, 10.0, 18.0]);
    assert_eq!(scenario.reference_region().unwrap().name(), "reference");
}

#[test]
fn test_mapping_failure_leaves_counts_untouched() {
    let mut config = scenario_config("drag", 0.0);
    config.mapping = true;

    let reference = reference_region(&[100.0, 101.0]);
    let solver = ScriptedSolver::new(&["drag"], vec![vec![1.0]; 2], vec![vec![1.0, 5.0, 9.0]; 2]);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1, 2, 3]), Some(reference), true)
            .unwrap();

    let res = Driver::new(&unit_steps(2), solver).unwrap().run(&mut scenario);
    assert!(matches!(res, Err(QoiError::MappingFailure(_))));
    assert_eq!(scenario.sample_count(), 0);
    assert_eq!(scenario.nodal().unwrap().sample_count(), 0);
}

#[test]
fn test_mapping_requires_reference_region() {
    let mut config = scenario_config("drag", 0.0);
    config.mapping = true;
    let res = SimulationScenario::new(&config, line_region(REGION, &[1]), None, true);
    assert!(matches!(res, Err(QoiError::Config(_))));
}

#[test]
fn test_invalid_config_is_rejected_up_front() {
    let config = scenario_config("drag", 1.0);
    let res = SimulationScenario::new(&config, line_region(REGION, &[1]), None, true);
    assert!(matches!(res, Err(QoiError::Config(_))));
}

fn synthetic_run(seed: u64) -> mlmc_qoi::qoi::QoiRecord {
    let mut config = full_config("drag_force_x,base_moment_z", 0.3, 0);
    config.time = TimeParams {
        start_time: 0.0,
        end_time: 1.0,
        delta_time: 0.05,
    };
    let solver = SyntheticFlow::new(&config, seed).with_perturbation(0.1);
    let region = Region::grid(REGION, 3, 3, 1.0).unwrap();
    let mut scenario = SimulationScenario::new(&config.scenario, region, None, true).unwrap();

    let record = Driver::new(&config.time, solver)
        .unwrap()
        .run(&mut scenario)
        .unwrap()
        .into_record()
        .unwrap();
    assert_eq!(scenario.sample_count(), 15);
    record
}

#[test]
fn test_synthetic_flow_is_reproducible_per_seed() {
    let a = synthetic_run(7);
    let b = synthetic_run(7);
    let c = synthetic_run(8);
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 2 * (2 + 9));
}

#[test]
fn test_synthetic_weighted_field_is_post_burnin_average() {
    let record = synthetic_run(3);
    let means = record.node_means();
    for (mean, sums) in means.iter().zip(record.node_power_sums()) {
        assert_close(*mean, sums.power_sums[0] / sums.count as f64);
    }
}

#[rstest]
#[case(0.0)]
#[case(-0.25)]
fn test_driver_rejects_non_positive_time_step(#[case] delta_time: f64) {
    let time = TimeParams {
        start_time: 0.0,
        end_time: 1.0,
        delta_time,
    };
    let res = Driver::new(&time, drag_moment_solver());
    assert!(matches!(res, Err(QoiError::Config(_))));
}

#[test]
fn test_late_burnin_still_sees_the_final_step() {
    // dt = 0.4 over [0, 1]: steps at 0.4, 0.8 and a clamped 1.0.
    let config = scenario_config("drag", 0.9);
    let solver = ScriptedSolver::new(
        &["drag"],
        vec![vec![1.0], vec![2.0], vec![3.0]],
        vec![vec![5.0]; 3],
    )
    .with_weighted(vec![5.0]);
    let mut scenario =
        SimulationScenario::new(&config, line_region(REGION, &[1]), None, true).unwrap();
    let time = TimeParams {
        start_time: 0.0,
        end_time: 1.0,
        delta_time: 0.4,
    };

    let record = Driver::new(&time, solver)
        .unwrap()
        .run(&mut scenario)
        .unwrap()
        .into_record()
        .expect("the step at t = 1.0 passes the gate");
    assert_eq!(scenario.sample_count(), 1);
    assert_eq!(record.scalar_means(), vec![3.0]);
}

/// Remembers the hook order and the value the solver left in the region.
struct Recorder {
    region: Region,
    calls: Vec<String>,
}

impl Stage for Recorder {
    fn initialize(&mut self) -> QoiResult<()> {
        self.calls.push("initialize".to_string());
        Ok(())
    }

    fn finalize_step(&mut self, clock: &SimClock, _sample: &StepSample) -> QoiResult<()> {
        let value = self.region.field("T")?[0];
        self.calls.push(format!("finalize {} {}", clock.step, value));
        Ok(())
    }

    fn evaluate_qoi(&mut self) -> QoiResult<QoiOutcome> {
        self.calls.push("evaluate".to_string());
        Ok(QoiOutcome::NoData)
    }
}

impl InterestRegion for Recorder {
    fn interest_region_mut(&mut self) -> &mut Region {
        &mut self.region
    }
}

struct TimeWriter;

impl PhysicsSolver for TimeWriter {
    fn solve_step(&mut self, clock: &SimClock, region: &mut Region) -> QoiResult<StepSample> {
        region.ensure_field("T").fill(clock.time);
        Ok(StepSample::new())
    }
}

#[test]
fn test_driver_calls_hooks_in_order() {
    let mut recorder = Recorder {
        region: line_region("any", &[1]),
        calls: Vec::new(),
    };
    let outcome = Driver::new(&unit_steps(2), TimeWriter)
        .unwrap()
        .run(&mut recorder)
        .unwrap();

    assert!(outcome.is_no_data());
    assert_eq!(
        recorder.calls,
        vec!["initialize", "finalize 1 1", "finalize 2 2", "evaluate"]
    );
}
