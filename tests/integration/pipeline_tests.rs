use std::fs;
use std::path::{Path, PathBuf};

use blockdedupe::cli::Cli;
use blockdedupe::error::ExitCode;
use blockdedupe::run_app;
use clap::Parser;
use tempfile::{tempdir, TempDir};

const WHOLE: &str = "\
0a0a /data/a.img
0b0b /data/b.img
0a0a /data/a-copy.img
0c0c /data/c.img
";

const BLOCKS: &str = "\
1111 /data/a.img offset 0-1023
2222 /data/a.img offset 1024-2047
1111 /data/a-copy.img offset 0-1023
2222 /data/a-copy.img offset 1024-2047
1111 /data/b.img offset 0-1023
2222 /data/b.img offset 1024-2047
9999 /data/c.img offset 0-1023
";

struct Fixture {
    dir: TempDir,
    whole: PathBuf,
    blocks: PathBuf,
    config: PathBuf,
}

impl Fixture {
    fn new(whole: &str, blocks: &str) -> Self {
        let dir = tempdir().unwrap();
        let whole_path = dir.path().join("whole.sums");
        let blocks_path = dir.path().join("blocks.sums");
        let config = dir.path().join("config.toml");
        fs::write(&whole_path, whole).unwrap();
        fs::write(&blocks_path, blocks).unwrap();
        fs::write(&config, "parallel = false\n").unwrap();
        Self {
            dir,
            whole: whole_path,
            blocks: blocks_path,
            config,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<ExitCode> {
        let mut argv = vec![
            "blockdedupe".to_string(),
            "-q".to_string(),
            "--config".to_string(),
            self.config.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        run_app(Cli::try_parse_from(argv).unwrap())
    }

    fn analyze(&self, extra: &[&str]) -> anyhow::Result<ExitCode> {
        let whole = self.whole.display().to_string();
        let blocks = self.blocks.display().to_string();
        let mut args = vec!["analyze", whole.as_str(), blocks.as_str()];
        args.extend_from_slice(extra);
        self.run(&args)
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_analyze_writes_json_report() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let report = fixture.path("report.json");
    let report_arg = report.display().to_string();

    let code = fixture.analyze(&["--output-file", &report_arg]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let json = read_json(&report);
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["files"], serde_json::json!(["/data/a.img", "/data/b.img"]));
    assert_eq!(groups[0]["savings"], 2);
    assert_eq!(json["summary"]["dropped_duplicates"], 1);
    assert_eq!(json["summary"]["dropped_single_block"], 1);
    assert_eq!(json["summary"]["exit_code_name"], "BD000");
}

#[test]
fn test_analyze_pretty_flag() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let compact = fixture.path("compact.json");
    let pretty = fixture.path("pretty.json");

    fixture
        .analyze(&["--output-file", &compact.display().to_string()])
        .unwrap();
    fixture
        .analyze(&["--pretty", "--output-file", &pretty.display().to_string()])
        .unwrap();

    assert_eq!(fs::read_to_string(&compact).unwrap().lines().count(), 1);
    assert!(fs::read_to_string(&pretty).unwrap().lines().count() > 1);
}

#[test]
fn test_analyze_csv_report() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let report = fixture.path("report.csv");

    fixture
        .analyze(&["-o", "csv", "--output-file", &report.display().to_string()])
        .unwrap();

    let content = fs::read_to_string(&report).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("group,parent,depth"));
    assert!(lines[1].ends_with(",,0,2,/data/a.img;/data/b.img,1111@0-1023;2222@1024-2047,2"));
}

#[test]
fn test_analyze_saves_duplicate_sets() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let dups = fixture.path("dups.json");
    let report = fixture.path("report.json");

    fixture
        .analyze(&[
            "--save-duplicates",
            &dups.display().to_string(),
            "--output-file",
            &report.display().to_string(),
        ])
        .unwrap();

    let json = read_json(&dups);
    assert_eq!(json[0]["hash"], "0a0a");
    assert_eq!(
        json[0]["files"],
        serde_json::json!(["/data/a.img", "/data/a-copy.img"])
    );
}

#[test]
fn test_analyze_saves_built_vectors() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let vectors = fixture.path("vectors.json");
    let report = fixture.path("report.json");

    let code = fixture
        .analyze(&[
            "--save-vectors",
            &vectors.display().to_string(),
            "--output-file",
            &report.display().to_string(),
        ])
        .unwrap();
    assert_eq!(code, ExitCode::Success);

    // The duplicate copy and the single-block file never become vectors
    let json = read_json(&vectors);
    let saved = json.as_array().unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0]["file"], "/data/a.img");
    assert_eq!(saved[1]["file"], "/data/b.img");
    assert_eq!(saved[0]["blocks"][0]["hash"], "1111");
    assert_eq!(saved[0]["blocks"][1]["range"]["start"], 1024);
    assert_eq!(read_json(&report)["summary"]["vectors_built"], 2);
}

#[test]
fn test_saved_vectors_keep_unshared_blocks() {
    let blocks = "\
1111 /p offset 0-9
2222 /p offset 10-19
1111 /q offset 0-9
9999 /q offset 10-19
";
    let fixture = Fixture::new("", blocks);
    let vectors = fixture.path("vectors.json");
    let report = fixture.path("report.json");

    let code = fixture
        .analyze(&[
            "--save-vectors",
            &vectors.display().to_string(),
            "--output-file",
            &report.display().to_string(),
        ])
        .unwrap();
    assert_eq!(code, ExitCode::NoGroups);

    let json = read_json(&vectors);
    assert_eq!(json[1]["file"], "/q");
    let hashes: Vec<&str> = json[1]["blocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["hash"].as_str().unwrap())
        .collect();
    assert_eq!(hashes, vec!["1111", "9999"]);
}

#[test]
fn test_analyze_without_shared_blocks_reports_no_groups() {
    let blocks = "\
1111 /x offset 0-9
2222 /x offset 10-19
3333 /y offset 0-9
4444 /y offset 10-19
";
    let fixture = Fixture::new("", blocks);
    let report = fixture.path("report.json");

    let code = fixture
        .analyze(&["--output-file", &report.display().to_string()])
        .unwrap();
    assert_eq!(code, ExitCode::NoGroups);

    let json = read_json(&report);
    assert!(json["groups"].as_array().unwrap().is_empty());
    assert_eq!(json["summary"]["exit_code"], 2);
}

#[test]
fn test_no_singleton_filter_keeps_lone_file() {
    // /q and /r fall below two shared blocks and are dropped, leaving /p
    // alone with the blocks it shared with them.
    let blocks = "\
1111 /p offset 0-9
2222 /p offset 10-19
1111 /q offset 0-9
9999 /q offset 10-19
2222 /r offset 10-19
8888 /r offset 20-29
";
    let fixture = Fixture::new("", blocks);
    let report = fixture.path("report.json");
    let report_arg = report.display().to_string();

    let code = fixture.analyze(&["--output-file", &report_arg]).unwrap();
    assert_eq!(code, ExitCode::NoGroups);

    let code = fixture
        .analyze(&["--no-singleton-filter", "--sequential", "--output-file", &report_arg])
        .unwrap();
    assert_eq!(code, ExitCode::Success);

    let json = read_json(&report);
    let groups = json["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["files"], serde_json::json!(["/p"]));
    assert_eq!(groups[0]["savings"], 0);
}

#[test]
fn test_analyze_unparsable_input_fails() {
    let fixture = Fixture::new(WHOLE, "1111 /a offset 0-1023\ngarbage\n");
    let err = fixture.analyze(&[]).unwrap_err();

    assert_eq!(ExitCode::from_error(&err), ExitCode::InvalidInput);
    assert!(format!("{err:#}").contains("line 2"));
}

#[test]
fn test_analyze_missing_config_file_fails() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let whole = fixture.whole.display().to_string();
    let blocks = fixture.blocks.display().to_string();
    let missing = fixture.path("nope.toml").display().to_string();

    let cli = Cli::try_parse_from([
        "blockdedupe",
        "-q",
        "--config",
        missing.as_str(),
        "analyze",
        whole.as_str(),
        blocks.as_str(),
    ])
    .unwrap();
    let err = run_app(cli).unwrap_err();
    assert_eq!(ExitCode::from_error(&err), ExitCode::GeneralError);
}

#[test]
fn test_duplicates_exit_codes() {
    let fixture = Fixture::new(WHOLE, BLOCKS);
    let whole = fixture.whole.display().to_string();
    assert_eq!(
        fixture.run(&["duplicates", &whole]).unwrap(),
        ExitCode::Success
    );

    let unique = Fixture::new("0a0a /a\n0b0b /b\n", "");
    let whole = unique.whole.display().to_string();
    assert_eq!(
        unique.run(&["duplicates", &whole, "-o", "json"]).unwrap(),
        ExitCode::NoGroups
    );
}
