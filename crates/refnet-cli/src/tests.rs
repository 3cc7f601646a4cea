use super::*;
use refnet_core::{CandidateOffice, RawPlace, ReferralTier};
use refnet_discovery::RankedOffice;

const USER: &str = "6f1c1a52-6c57-4a2e-9d59-0c1f35d7a001";

fn user() -> Uuid {
    Uuid::parse_str(USER).expect("uuid")
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["refnet-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["refnet-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_prune_with_override() {
    let cli = Cli::try_parse_from(["refnet-cli", "db", "prune", "--days", "7"])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Prune { days: Some(7) }
        })
    ));
}

#[test]
fn discover_defaults_to_distance_sort_without_added_offices() {
    let cli = Cli::try_parse_from(["refnet-cli", "discover", "--user", USER, "--distance", "10"])
        .expect("expected valid cli args");

    let Some(Commands::Discover {
        user: parsed,
        distance,
        zip,
        office_type,
        sort,
        show_added,
    }) = cli.command
    else {
        panic!("expected discover command");
    };
    assert_eq!(parsed, user());
    assert_eq!(distance, 10);
    assert!(zip.is_none());
    assert!(office_type.is_none());
    assert_eq!(sort, SortKey::Distance);
    assert!(!show_added);
}

#[test]
fn discover_accepts_zip_filter_and_sort() {
    let cli = Cli::try_parse_from([
        "refnet-cli",
        "discover",
        "--user",
        USER,
        "--distance",
        "25",
        "--zip",
        "07030",
        "--office-type",
        "orthodontist",
        "--sort",
        "rating",
        "--show-added",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Discover {
            distance: 25,
            zip: Some(ref z),
            office_type: Some(ref t),
            sort: SortKey::Rating,
            show_added: true,
            ..
        }) if z == "07030" && t == "orthodontist"
    ));
}

#[test]
fn discover_rejects_unknown_sort_key() {
    let result = Cli::try_parse_from([
        "refnet-cli",
        "discover",
        "--user",
        USER,
        "--distance",
        "10",
        "--sort",
        "closest",
    ]);
    assert!(result.is_err());
}

#[test]
fn discover_rejects_non_uuid_user() {
    let result = Cli::try_parse_from(["refnet-cli", "discover", "--user", "bob", "--distance", "10"]);
    assert!(result.is_err());
}

#[test]
fn parses_session_clear() {
    let cli = Cli::try_parse_from(["refnet-cli", "session", "clear", "--user", USER])
        .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Session {
            command: SessionCommands::Clear { user: u }
        }) if u == user()
    ));
}

#[test]
fn import_requires_at_least_one_office_id() {
    assert!(Cli::try_parse_from(["refnet-cli", "import", "--user", USER]).is_err());

    let office = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["refnet-cli", "import", "--user", USER, office.as_str()])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Import { ref office_ids, .. }) if office_ids.len() == 1
    ));
}

fn ranked(in_network: bool, imported: bool, tier: Option<ReferralTier>) -> RankedOffice {
    let mut office = CandidateOffice::from_raw(RawPlace {
        place_id: "ChIJabc".to_string(),
        name: "Elite Dental".to_string(),
        address: None,
        phone: None,
        website: None,
        rating: None,
        coordinates: None,
        raw_type_label: None,
    });
    office.already_in_network = in_network;
    office.imported = imported;
    RankedOffice {
        office,
        distance_miles: None,
        tier,
    }
}

#[test]
fn status_label_reflects_network_state() {
    assert_eq!(discover::status_label(&ranked(false, false, None)), "new");
    assert_eq!(discover::status_label(&ranked(false, true, None)), "imported");
    assert_eq!(
        discover::status_label(&ranked(true, false, Some(ReferralTier::Strong))),
        "in network (strong)"
    );
}

#[test]
fn missing_values_render_as_dash() {
    assert_eq!(discover::fmt_miles(None), "\u{2014}");
    assert_eq!(discover::fmt_miles(Some(3.906)), "3.9");
    assert_eq!(discover::fmt_rating(Some(4.66)), "4.7");
}

#[test]
fn truncate_keeps_short_values() {
    assert_eq!(discover::truncate("Elite Dental", 30), "Elite Dental");
    assert_eq!(discover::truncate("Brooklyn Heights Family Dentistry", 12), "Brooklyn ...");
}
