use assert_cmd::Command;

fn cli() -> Command {
    let mut command = Command::cargo_bin("bookstore-cli").unwrap();
    command
        .env("BOOKSTORE_CONFIG_DIR", std::env::temp_dir().join("bookstore-cli-no-config"))
        .env_remove("BOOKSTORE_ENV")
        .env_remove("DB_PASSWORD");
    command
}

#[test]
fn help_lists_subcommands() {
    let output = cli().arg("--help").assert().success().get_output().stdout.clone();
    let help = String::from_utf8(output).unwrap();

    for subcommand in ["serve", "migrate", "config"] {
        assert!(help.contains(subcommand), "missing {subcommand}");
    }
}

#[test]
fn config_redacts_password() {
    let output = cli()
        .arg("config")
        .env("DB_PASSWORD", "hunter2")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let rendered = String::from_utf8(output).unwrap();

    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("********"));
}

#[test]
fn unknown_environment_fails() {
    cli().arg("config").env("BOOKSTORE_ENV", "qa").assert().failure();
}

#[test]
fn migrate_creates_sqlite_schema() {
    let dir = std::env::temp_dir().join(format!("bookstore-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let database = dir.join("books.db");

    cli()
        .arg("migrate")
        .env("BOOKSTORE_DATABASE__DRIVER", "sqlite")
        .env(
            "BOOKSTORE_DATABASE__URL",
            format!("sqlite://{}?mode=rwc", database.display()),
        )
        .assert()
        .success();

    assert!(database.exists());
    let _ = std::fs::remove_dir_all(&dir);
}
