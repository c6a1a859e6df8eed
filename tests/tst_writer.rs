use options_snapshot::{build_table, snapshot_file_name, write_snapshot, RowPolicy, SnapshotError};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::fs;

    fn ts(h: u32, m: u32, s: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn sample_table() -> options_snapshot::SnapshotTable {
        let response = json!({ "snapshots": {
            "BTC251231150000": { "greeks": { "delta": 0.5 }, "impliedVolatility": 0.7 },
            "BTC251231160000": { "latestTrade": { "p": 1.25, "x": "B,C" } },
        }});
        build_table(&response, 3, RowPolicy::Strict).unwrap()
    }

    fn file_names(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            snapshot_file_name("BTC_snapshots", ts(9, 5, 3)),
            "BTC_snapshots_2025-10-14_09-05-03.csv"
        );
    }

    #[test]
    fn test_file_names_sort_chronologically() {
        let earlier = snapshot_file_name("BTC_snapshots", ts(9, 59, 59));
        let later = snapshot_file_name("BTC_snapshots", ts(10, 0, 0));
        assert!(earlier < later);
    }

    #[test]
    fn test_replaces_all_prefix_matches() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "BTC_snapshots_2025-10-11_00-00-00.csv",
            "BTC_snapshots_2025-10-12_00-00-00.csv",
            "BTC_snapshots_2025-10-13_00-00-00.csv",
        ] {
            fs::write(dir.path().join(name), "old").unwrap();
        }

        let path = write_snapshot(dir.path(), "BTC_snapshots", &sample_table(), ts(12, 0, 0)).unwrap();

        assert_eq!(file_names(dir.path()), vec!["BTC_snapshots_2025-10-14_12-00-00.csv"]);
        assert_eq!(path, dir.path().join("BTC_snapshots_2025-10-14_12-00-00.csv"));
    }

    #[test]
    fn test_other_files_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("ETH_snapshots_2025-10-13_00-00-00.csv"), "eth").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        write_snapshot(dir.path(), "BTC_snapshots", &sample_table(), ts(12, 0, 0)).unwrap();

        assert_eq!(
            file_names(dir.path()),
            vec![
                "BTC_snapshots_2025-10-14_12-00-00.csv",
                "ETH_snapshots_2025-10-13_00-00-00.csv",
                "notes.txt",
            ]
        );
    }

    #[test]
    fn test_csv_has_union_header_and_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(dir.path(), "BTC_snapshots", &sample_table(), ts(12, 0, 0)).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(
            header,
            vec![
                "symbol",
                "impliedVolatility",
                "greeks_delta",
                "expires",
                "price",
                "latestTrade_p",
                "latestTrade_x",
            ]
        );

        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][0], "BTC251231150000");
        assert_eq!(&rows[0][1], "0.7");
        assert_eq!(&rows[0][3], "2025-12-31");
        assert_eq!(&rows[0][5], "");
        assert_eq!(&rows[1][1], "");
        assert_eq!(&rows[1][4], "160000");
        assert_eq!(&rows[1][6], "B,C");
    }

    #[test]
    fn test_missing_directory_is_local_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_snapshot(&missing, "BTC_snapshots", &sample_table(), ts(12, 0, 0)).unwrap_err();
        assert!(matches!(err, SnapshotError::LocalWrite { .. }));
        assert!(err.is_fatal());
    }
}
