//! Integration tests for tiercache

mod scenarios;

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn tiercache() -> Command {
        cargo_bin_cmd!("tiercache")
    }

    /// Config with a scalar flat-file map and a set SQLite map, all under `dir`
    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        let content = format!(
            r#"
[general]
data_dir = "{}"

[maps.gi2kegg]
flat_file = "gi2kegg.csv"

[maps.gene2pathway]
shape = "set"
database = "kegg.db"
key_column = "gene"
value_column = "pathway"
"#,
            dir.display()
        );
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        tiercache()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("layered key-value caches"));
    }

    #[test]
    fn version_displays() {
        tiercache()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tiercache"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();
        tiercache()
            .env("TIERCACHE_CONFIG", dir.path().join("absent.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[general]"))
            .stdout(predicate::str::contains("min_interval_ms = 1000"));
    }

    #[test]
    fn config_init_writes_example() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("nested").join("config.toml");
        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["config", "init"])
            .assert()
            .success();

        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[maps.gene2pathway]"));
    }

    #[test]
    fn unknown_map_fails_with_hint() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["get", "nope", "K1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No map named 'nope'"))
            .stderr(predicate::str::contains("tiercache config show"));
    }

    #[test]
    fn import_then_get_offline() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let csv = dir.path().join("seed.csv");
        fs::write(&csv, "key,value\n16130957,eco:b3061\nunknown,None\n").unwrap();

        tiercache()
            .arg("-c")
            .arg(&config)
            .arg("import")
            .arg("gi2kegg")
            .arg(&csv)
            .assert()
            .success();
        assert!(dir.path().join("gi2kegg.csv").exists());

        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["get", "gi2kegg", "16130957", "unknown", "--offline"])
            .assert()
            .success()
            .stdout(predicate::str::contains("16130957\teco:b3061"))
            .stdout(predicate::str::contains("unknown\tNone"));
    }

    #[test]
    fn missing_key_is_skipped_with_warning() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["get", "gi2kegg", "absent", "--offline"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("'absent' not found"));
    }

    #[test]
    fn set_map_dump_as_json() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let csv = dir.path().join("pathways.csv");
        fs::write(&csv, "gene,pathway\neco:b3061,eco00630\neco:b3061,eco01100\n").unwrap();

        tiercache()
            .arg("-c")
            .arg(&config)
            .arg("import")
            .arg("gene2pathway")
            .arg(&csv)
            .assert()
            .success();

        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["dump", "gene2pathway", "-f", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"eco:b3061\""))
            .stdout(predicate::str::contains("\"eco00630\""))
            .stdout(predicate::str::contains("\"eco01100\""));
    }

    #[test]
    fn export_matches_import() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        let seed = dir.path().join("seed.csv");
        let out = dir.path().join("out.csv");
        let content = "gene,pathway\ng,a\ng,\"b,c\"\nh,None\n";
        fs::write(&seed, content).unwrap();

        tiercache()
            .arg("-c")
            .arg(&config)
            .arg("import")
            .arg("gene2pathway")
            .arg(&seed)
            .assert()
            .success();
        tiercache()
            .arg("-c")
            .arg(&config)
            .arg("export")
            .arg("gene2pathway")
            .arg(&out)
            .assert()
            .success();

        assert_eq!(fs::read_to_string(&out).unwrap(), content);
    }

    #[test]
    fn corrupt_flat_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = write_config(dir.path());
        fs::write(dir.path().join("gi2kegg.csv"), "key,value\na,b,c\n").unwrap();

        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["get", "gi2kegg", "a", "--offline"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("corrupt"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("config.toml");
        fs::write(&config, "[maps.broken]\nshape = \"scalar\"\n").unwrap();

        tiercache()
            .arg("-c")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn completions_generate() {
        tiercache()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tiercache"));
    }
}
