use clap::Parser;
use tabpilot_cli::cli::commands::Commands;
use tabpilot_cli::cli::CliArgs;

#[test]
fn run_accepts_goal_and_overrides() {
    let cli = CliArgs::try_parse_from([
        "tabpilot",
        "--json",
        "run",
        "find the cheapest flight",
        "--start-url",
        "https://example.com",
        "--max-rounds",
        "3",
        "--visible",
    ])
    .unwrap();

    assert!(cli.json);
    assert_eq!(cli.log_level, "info");
    match cli.command {
        Commands::Run(args) => {
            assert_eq!(args.goal, "find the cheapest flight");
            assert_eq!(args.start_url.as_deref(), Some("https://example.com"));
            assert_eq!(args.max_rounds, Some(3));
            assert!(args.visible);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn global_flags_follow_the_subcommand() {
    let cli = CliArgs::try_parse_from([
        "tabpilot",
        "capture",
        "https://example.com",
        "--highlight",
        "--config",
        "custom.toml",
        "--log-json",
    ])
    .unwrap();

    assert!(cli.log_json);
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("custom.toml")));
    assert!(matches!(cli.command, Commands::Capture(ref args) if args.highlight));
}

#[test]
fn parse_action_takes_one_argument() {
    let cli =
        CliArgs::try_parse_from(["tabpilot", "parse-action", r#"{"no_op": {}}"#]).unwrap();
    assert!(matches!(cli.command, Commands::ParseAction(ref args) if args.action == r#"{"no_op": {}}"#));

    assert!(CliArgs::try_parse_from(["tabpilot", "run"]).is_err());
}
