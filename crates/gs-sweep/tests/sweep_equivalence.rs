use gs_sweep::{
    routine_fn, ExecutionStrategy, GridPoint, InvocationArgs, JobOutcome, ParameterSpace, Sweep, SweepConfig,
    SweepReport,
};
use gs_types::{JobError, ParameterValue};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const TEMPLATE: &str = "[global]\n\
pa                  = {pa}\n\
pb                  = {pb}\n\
pc                  = {pc}\n\
kex_ab              = {kex_ab}\n\
kex_bc              = {kex_bc}\n\
dw_ab               = 3.5\n";

fn write_inputs(dir: &Path, template: &str) -> SweepConfig {
    fs::create_dir_all(dir.join("Experiments")).unwrap();
    fs::write(dir.join("params.template"), template).unwrap();
    fs::write(dir.join("method.cfg"), "").unwrap();
    fs::write(dir.join("3st.pb_kex"), "").unwrap();
    fs::write(dir.join("Experiments/cpmg_800.cfg"), "").unwrap();

    let pa: Vec<f64> = (0..5).map(|i| 0.9 + 0.02 * i as f64).collect();
    let pb: Vec<f64> = (1..=4).map(|i| 0.01 * i as f64).collect();

    SweepConfig::new(
        ParameterSpace::new()
            .add("pa", pa)
            .add("pb", pb)
            .add_fixed("kex_ab", 300),
        dir.join("params.template"),
        dir.join("Parameters_tmp/params_A{pa:.2f}_B{pb:.2f}.cfg")
            .display()
            .to_string(),
        "Output_A{pa:.2f}_B{pb:.2f}",
        dir.join("method.cfg"),
        dir.join("3st.pb_kex"),
    )
    .with_experiments([dir.join("Experiments/cpmg_800.cfg")])
    .with_fixed("kex_bc", 600)
    .with_link("pc", "pb")
}

/// Fails every point with pb = 0.02 and jitters completion order.
fn flaky_fit(args: &InvocationArgs) -> Result<serde_json::Value, JobError> {
    let output = args.value_of("-o").unwrap_or_default().to_string();
    std::thread::sleep(Duration::from_millis((output.len() % 3) as u64));
    if output.ends_with("B0.02") {
        Err(JobError::invocation("minimizer did not converge"))
    } else {
        Ok(serde_json::json!({ "output": output }))
    }
}

fn outcome_set(report: &SweepReport) -> BTreeSet<(String, bool)> {
    report
        .results
        .iter()
        .map(|r| (r.point.to_string(), r.outcome.is_success()))
        .collect()
}

#[test]
fn sequential_and_parallel_runs_produce_the_same_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let sweep = Sweep::prepare(&write_inputs(dir.path(), TEMPLATE)).unwrap();
    let routine = routine_fn("flaky", flaky_fit);

    let sequential = sweep
        .clone()
        .with_strategy(ExecutionStrategy::Sequential)
        .run(&routine);
    let parallel = sweep
        .with_strategy(ExecutionStrategy::Parallel { workers: 4 })
        .run(&routine);

    assert_eq!(sequential.total_points, 20);
    assert_eq!(parallel.total_points, 20);
    assert_eq!(sequential.results.len(), 20);
    assert_eq!(parallel.results.len(), 20);
    assert_eq!(sequential.failed(), 5);
    assert_eq!(outcome_set(&sequential), outcome_set(&parallel));
    for result in &parallel.results {
        let matching = sequential.outcome_for(&result.point).unwrap();
        assert_eq!(matching.is_success(), result.outcome.is_success());
    }

    let grid_order: Vec<usize> = parallel
        .results_in_grid_order()
        .iter()
        .map(|r| r.job_number)
        .collect();
    assert_eq!(grid_order, (0..20).collect::<Vec<_>>());
}

#[test]
fn each_job_gets_its_own_config_and_output() {
    let dir = tempfile::tempdir().unwrap();
    let sweep = Sweep::prepare(&write_inputs(dir.path(), TEMPLATE))
        .unwrap()
        .with_strategy(ExecutionStrategy::Parallel { workers: 3 });
    let routine = routine_fn("echo", |args: &InvocationArgs| {
        Ok(serde_json::json!({
            "config": args.value_of("-p"),
            "output": args.value_of("-o"),
        }))
    });

    let report = sweep.run(&routine);
    assert!(report.is_clean());

    for result in &report.results {
        let JobOutcome::Succeeded { value } = &result.outcome else {
            panic!("unexpected failure for {}", result.point);
        };
        assert_eq!(value["output"], result.output.as_str());
        let config = value["config"].as_str().unwrap();
        let rendered = fs::read_to_string(config).unwrap();
        let pb = result.point.get("pb").unwrap().to_string();
        assert!(rendered.contains(&format!("pb                  = {pb}\n")));
        assert!(rendered.contains(&format!("pc                  = {pb}\n")));
        assert!(rendered.contains("kex_bc              = 600\n"));
    }

    let written = fs::read_dir(dir.path().join("Parameters_tmp")).unwrap().count();
    assert_eq!(written, 20);
}

#[test]
fn missing_placeholder_is_reported_per_point_and_sweep_continues() {
    let dir = tempfile::tempdir().unwrap();
    let template = format!("{TEMPLATE}kex_ac              = {{kex_ac}}\n");
    let sweep = Sweep::prepare(&write_inputs(dir.path(), &template)).unwrap();
    let calls = AtomicUsize::new(0);
    let routine = routine_fn("count", |_: &InvocationArgs| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::Value::Null)
    });

    let report = sweep.run(&routine);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(report.results.is_empty());
    assert_eq!(report.rendering_failures.len(), 20);
    for failure in &report.rendering_failures {
        assert_eq!(failure.missing_parameter.as_deref(), Some("kex_ac"));
        assert!(failure.reason.contains("params.template"));
    }
    assert!(!dir.path().join("Parameters_tmp").exists());
}

#[test]
fn empty_candidate_list_means_no_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = write_inputs(dir.path(), TEMPLATE);
    config.parameters = ParameterSpace::new()
        .add("pa", Vec::<f64>::new())
        .add("pb", [0.1]);
    let sweep = Sweep::prepare(&config).unwrap();
    let routine = routine_fn("never", |_: &InvocationArgs| -> Result<serde_json::Value, JobError> {
        panic!("no grid point should be invoked")
    });

    let report = sweep.run(&routine);
    assert_eq!(report.total_points, 0);
    assert!(report.results.is_empty());
    assert!(report.rendering_failures.is_empty());
}

#[test]
fn points_that_fail_rendering_do_not_hide_the_ones_that_render() {
    let dir = tempfile::tempdir().unwrap();
    let template = format!("{TEMPLATE}pa_int              = {{pa:d}}\n");
    let mut config = write_inputs(dir.path(), &template);
    config.parameters = ParameterSpace::new()
        .add("pa", [ParameterValue::Int(1), ParameterValue::Float(0.5)])
        .add("pb", [0.01, 0.02])
        .add_fixed("kex_ab", 300);
    let sweep = Sweep::prepare(&config)
        .unwrap()
        .with_strategy(ExecutionStrategy::Parallel { workers: 2 });
    let routine = routine_fn("ok", |_: &InvocationArgs| Ok(serde_json::Value::Null));

    let report = sweep.run(&routine);

    assert_eq!(report.total_points, 4);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.abandoned(), 2);
    for failure in &report.rendering_failures {
        assert_eq!(failure.point.get("pa"), Some(&ParameterValue::Float(0.5)));
        assert!(failure.reason.contains("'d'"));
        assert_eq!(failure.missing_parameter, None);
    }

    let rendered = GridPoint::new().with("pa", 1).with("pb", 0.02).with("kex_ab", 300);
    assert!(report.outcome_for(&rendered).unwrap().is_success());
    let abandoned = GridPoint::new().with("pa", 0.5).with("pb", 0.02).with("kex_ab", 300);
    assert_eq!(report.outcome_for(&abandoned), None);

    let config_file = dir.path().join("Parameters_tmp/params_A1.00_B0.02.cfg");
    assert!(fs::read_to_string(config_file).unwrap().contains("pa_int              = 1\n"));
}
