mod common;

use common::{BODY, write_docx};
use dfconvert::batch::{Job, run_get_batch};
use dfconvert::config::Config;
use dfconvert::{Adapter, ErrorKind};

#[test]
fn five_concurrent_gets_share_one_input() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("shared.docx");
    write_docx(&docx, BODY);

    let jobs: Vec<Job> = (0..5)
        .map(|i| Job::get(&docx, dir.path().join(format!("out-{i}.html"))))
        .collect();
    let adapter = Adapter::from_config(&Config::default()).unwrap();
    let report = run_get_batch(&adapter, &jobs, 5).unwrap();

    assert!(report.all_ok(), "{report:?}");
    assert_eq!(report.workers, 5);
    assert_eq!(report.jobs.len(), 5);

    let first = std::fs::read(&jobs[0].abstract_path).unwrap();
    for (job, r) in jobs.iter().zip(&report.jobs) {
        assert_eq!(r.abstract_path, job.abstract_path);
        assert_eq!(std::fs::read(&job.abstract_path).unwrap(), first);
        assert_eq!(r.output_sha256, report.jobs[0].output_sha256);
    }
}

#[test]
fn repeated_outputs_are_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("shared.docx");
    write_docx(&docx, BODY);
    let same = dir.path().join("same.html");
    let other = dir.path().join("other.html");

    let jobs = vec![
        Job::get(&docx, &same),
        Job::get(&docx, &other),
        Job::get(&docx, &same),
    ];
    let adapter = Adapter::from_config(&Config::default()).unwrap();
    let report = run_get_batch(&adapter, &jobs, 2).unwrap();

    assert_eq!(report.ok, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(report.jobs[0].error_kind, Some(ErrorKind::DuplicateOutput));
    assert_eq!(report.jobs[2].error_kind, Some(ErrorKind::DuplicateOutput));
    assert!(report.jobs[1].ok);
    assert!(!same.exists());
}

#[test]
fn spellings_of_the_same_output_count_as_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("shared.docx");
    write_docx(&docx, BODY);
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let jobs = vec![
        Job::get(&docx, dir.path().join("out.html")),
        Job::get(&docx, dir.path().join(".").join("out.html")),
        Job::get(&docx, dir.path().join("sub").join("..").join("out.html")),
        Job::get(&docx, dir.path().join("sub").join("out.html")),
    ];
    let adapter = Adapter::from_config(&Config::default()).unwrap();
    let report = run_get_batch(&adapter, &jobs, 2).unwrap();

    for r in &report.jobs[..3] {
        assert_eq!(r.error_kind, Some(ErrorKind::DuplicateOutput));
    }
    assert!(report.jobs[3].ok);
    assert!(!dir.path().join("out.html").exists());
}

#[test]
fn failures_do_not_stop_the_other_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let docx = dir.path().join("shared.docx");
    write_docx(&docx, BODY);
    let taken = dir.path().join("taken.html");
    std::fs::write(&taken, "existing").unwrap();

    let jobs = vec![
        Job::get(&docx, &taken),
        Job::get(dir.path().join("missing.docx"), dir.path().join("a.html")),
        Job::get(&docx, dir.path().join("b.html")),
    ];
    let adapter = Adapter::from_config(&Config::default()).unwrap();
    let report = run_get_batch(&adapter, &jobs, 0).unwrap();

    let kinds: Vec<_> = report.jobs.iter().map(|j| j.error_kind).collect();
    assert_eq!(
        kinds,
        vec![
            Some(ErrorKind::OutputExists),
            Some(ErrorKind::InputNotFound),
            None
        ]
    );
    assert!(report.jobs[2].output_sha256.is_some());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["jobs"][0]["error_kind"], "output_exists");
    assert_eq!(json["jobs"][2]["abstract"], serde_json::json!(dir.path().join("b.html")));
}
