use blockdedupe::analyzer::Analyzer;
use blockdedupe::error::ExitCode;
use blockdedupe::output::{CsvOutput, JsonOutput};
use blockdedupe::records::{BlockRecord, DuplicateMap};
use blockdedupe::registry::{BlockRange, Fingerprint};

fn block(hash: &str, start: u64, end: u64, file: &str) -> BlockRecord {
    BlockRecord::new(Fingerprint::new(hash, BlockRange::new(start, end)), file)
}

// A and B share 0a on 0-100, B and C share 0b on the same range, all three
// share 0c.
fn split_records() -> Vec<BlockRecord> {
    vec![
        block("0a", 0, 100, "/A"),
        block("0c", 101, 200, "/A"),
        block("0a", 0, 100, "/B"),
        block("0b", 0, 100, "/B"),
        block("0c", 101, 200, "/B"),
        block("0b", 0, 100, "/C"),
        block("0c", 101, 200, "/C"),
    ]
}

#[test]
fn test_json_nests_subgroups() {
    let (groups, summary) = Analyzer::with_defaults()
        .with_parallel(false)
        .analyze(&DuplicateMap::new(), split_records())
        .unwrap();

    let output = JsonOutput::new(&groups, &summary, ExitCode::Success);
    let json: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

    let root = &json["groups"][0];
    assert_eq!(root["files"], serde_json::json!(["/A", "/B", "/C"]));
    assert_eq!(root["selected_csums"][0]["hash"], "0c");
    assert_eq!(root["selected_csums"][0]["range"]["start"], 101);
    assert_eq!(root["savings"], 5);

    let subgroups = root["subgroup"].as_array().unwrap();
    assert_eq!(subgroups.len(), 2);
    assert_eq!(subgroups[0]["files"], serde_json::json!(["/A"]));
    assert_eq!(subgroups[1]["files"], serde_json::json!(["/B", "/C"]));
    assert!(subgroups[1]["subgroup"].as_array().unwrap().is_empty());

    assert_eq!(json["summary"]["groups"], 1);
    assert_eq!(json["summary"]["total_groups"], 3);
    assert_eq!(json["summary"]["split_iterations"], 1);
    assert_eq!(json["summary"]["total_savings"], 5);
}

#[test]
fn test_csv_flattens_tree_with_parents() {
    let (groups, _) = Analyzer::with_defaults()
        .with_parallel(false)
        .analyze(&DuplicateMap::new(), split_records())
        .unwrap();
    let root_name = groups[0].name.clone();

    let csv = CsvOutput::new(&groups).to_string().unwrap();
    let mut reader = csv::Reader::from_reader(csv.as_bytes());
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();

    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][0], root_name);
    assert_eq!(&rows[0][1], "");
    assert_eq!(&rows[0][2], "0");
    assert_eq!(&rows[0][3], "3");
    assert_eq!(&rows[0][4], "");
    assert_eq!(&rows[0][5], "0c@101-200");
    assert_eq!(&rows[0][6], "5");

    for (row, files) in rows[1..].iter().zip(["1", "2"]) {
        assert_eq!(&row[1], root_name);
        assert_eq!(&row[2], "1");
        assert_eq!(&row[3], files);
    }
}

#[test]
fn test_exports_of_empty_result() {
    let (groups, summary) = Analyzer::with_defaults()
        .with_parallel(false)
        .analyze(&DuplicateMap::new(), Vec::new())
        .unwrap();
    assert!(groups.is_empty());

    let output = JsonOutput::new(&groups, &summary, ExitCode::NoGroups);
    let json: serde_json::Value = serde_json::from_str(&output.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["summary"]["exit_code_name"], "BD002");
    assert_eq!(json["summary"]["input_records"], 0);

    let csv = CsvOutput::new(&groups).to_string().unwrap();
    assert_eq!(csv.lines().count(), 1);
}
