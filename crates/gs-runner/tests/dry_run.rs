use gs_runner::{run, Cli};
use gs_sweep::JobOutcome;
use std::fs;
use std::path::Path;

fn write_sweep(dir: &Path, template: &str) -> std::path::PathBuf {
    fs::create_dir_all(dir.join("Experiments")).unwrap();
    fs::write(dir.join("params.template"), template).unwrap();
    fs::write(dir.join("method.cfg"), "").unwrap();
    fs::write(dir.join("3st.pb_kex"), "").unwrap();
    fs::write(dir.join("Experiments/cpmg_600.cfg"), "").unwrap();
    fs::write(dir.join("Experiments/cpmg_800.cfg"), "").unwrap();

    let config = serde_json::json!({
        "parameters": {
            "pa": [0.9, 0.95],
            "pb": [0.01, 0.05],
            "kex_ab": 300
        },
        "links": { "pc": "pb" },
        "template": dir.join("params.template"),
        "config_name": dir.join("Parameters_tmp/params_A{pa:.2f}_B{pb:.2f}.cfg"),
        "output_name": "Output_A{pa:.2f}_B{pb:.2f}",
        "experiment_dir": dir.join("Experiments"),
        "method": dir.join("method.cfg"),
        "kinetics": dir.join("3st.pb_kex"),
        "workers": 2
    });
    let path = dir.join("sweep.json");
    fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    path
}

fn cli(config: &Path, report: &Path) -> Cli {
    Cli {
        config: config.to_path_buf(),
        verbose: false,
        workers: None,
        dry_run: true,
        report: Some(report.to_path_buf()),
        fail_on_error: false,
    }
}

#[test]
fn dry_run_renders_every_point_and_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sweep(dir.path(), "pa = {pa}\npb = {pb}\npc = {pc}\nkex_ab = {kex_ab}\n");
    let report_path = dir.path().join("report.json");

    let report = run(&cli(&config, &report_path)).unwrap();
    assert_eq!(report.total_points, 4);
    assert!(report.is_clean());
    assert_eq!(report.strategy, "parallel (2 workers)");

    let rendered =
        fs::read_to_string(dir.path().join("Parameters_tmp/params_A0.95_B0.05.cfg")).unwrap();
    assert_eq!(rendered, "pa = 0.95\npb = 0.05\npc = 0.05\nkex_ab = 300\n");

    let first = report.results_in_grid_order()[0];
    let JobOutcome::Succeeded { value } = &first.outcome else {
        panic!("dry run should not fail");
    };
    let command = value["command"].as_str().unwrap();
    assert!(command.starts_with("chemex fit -e "));
    assert!(command.contains("cpmg_600.cfg"));
    assert!(command.contains("cpmg_800.cfg"));
    assert!(command.ends_with(&format!(
        "-f powell -p {} -o Output_A0.90_B0.01",
        first.config_path.display()
    )));

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written["total_points"], 4);
    assert_eq!(written["results"].as_array().unwrap().len(), 4);
}

#[test]
fn missing_placeholder_does_not_stop_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sweep(dir.path(), "pa = {pa}
kex_bc = {kex_bc}
");
    let report_path = dir.path().join("report.json");

    let report = run(&cli(&config, &report_path)).unwrap();
    assert_eq!(report.total_points, 4);
    assert_eq!(report.abandoned(), 4);
    assert!(!report.is_clean());
    assert!(report
        .rendering_failures
        .iter()
        .all(|f| f.missing_parameter.as_deref() == Some("kex_bc")));
}

#[test]
fn setup_errors_abort_before_any_job() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_sweep(dir.path(), "pa = {pa}
");
    fs::remove_file(dir.path().join("method.cfg")).unwrap();

    let err = run(&cli(&config, &dir.path().join("report.json"))).unwrap_err();
    assert!(format!("{err:#}").contains("method"));
    assert!(!dir.path().join("Parameters_tmp").exists());
    assert!(!dir.path().join("report.json").exists());
}
