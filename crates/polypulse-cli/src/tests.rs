use super::*;

#[test]
fn parses_db_ping_command() {
    let cli =
        Cli::try_parse_from(["polypulse-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["polypulse-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["polypulse-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn push_takes_file_and_server_flags() {
    let cli = Cli::try_parse_from([
        "polypulse-cli",
        "push",
        "batch.json",
        "--server",
        "http://10.0.0.5:3001",
        "--token",
        "pusher-key",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Push { file, server }) => {
            assert_eq!(file, PathBuf::from("batch.json"));
            assert_eq!(server.server, "http://10.0.0.5:3001");
            assert_eq!(server.token.as_deref(), Some("pusher-key"));
            assert_eq!(server.timeout_secs, 30);
        }
        other => panic!("expected push, got {other:?}"),
    }
}

#[test]
fn push_requires_a_file() {
    assert!(Cli::try_parse_from(["polypulse-cli", "push"]).is_err());
}

#[test]
fn stats_defaults_to_one_hour() {
    let cli = Cli::try_parse_from(["polypulse-cli", "stats"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Stats { ref duration }) if duration == "1h"
    ));
}

#[test]
fn events_accepts_duration_and_limit() {
    let cli = Cli::try_parse_from([
        "polypulse-cli",
        "events",
        "--duration",
        "15s",
        "--limit",
        "5",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Events { ref duration, limit: 5 }) if duration == "15s"
    ));
}

#[test]
fn events_rejects_non_numeric_limit() {
    assert!(Cli::try_parse_from(["polypulse-cli", "events", "--limit", "many"]).is_err());
}
