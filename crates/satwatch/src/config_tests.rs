// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;

use clap::Parser;

use super::*;

fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        vars.iter().map(|&(k, v)| (k.to_owned(), v.to_owned())).collect();
    move |name: &str| map.get(name).cloned()
}

fn full_args() -> Vec<&'static str> {
    vec![
        "satwatch",
        "--telegram-token", "123:abc",
        "--telegram-chat-id", "-100200300",
        "--authorized-telegram-ids", "111, 222,bogus,333",
        "--cron-schedule", "0 */5 * * * *",
        "--prtg-url", "https://prtg.example",
        "--prtg-api-token", "tok",
        "--iptx-jyp", "1001",
        "--iptx-mnk", "1002",
        "--iptx-tmk", "1003",
        "--nif-jyp", "2001",
        "--nif-mnk", "2002",
        "--nif-tmk", "2003",
        "--g1g-url", "https://g1g.example",
        "--g1k-url", "https://g1k.example",
        "--g1l-url", "https://g1l.example",
        "--api-email", "ops@example.com",
        "--api-password", "secret",
    ]
}

#[test]
fn full_config_parses_and_validates() -> anyhow::Result<()> {
    let config = Config::parse_from(full_args());
    config.validate()?;
    assert_eq!(config.telegram_chat_id, "-100200300");
    assert_eq!(config.cron_schedule, "0 */5 * * * *");
    Ok(())
}

#[test]
fn empty_required_value_fails_validation() {
    let mut args = full_args();
    // Blank out the PRTG URL; presence alone must not be enough.
    let pos = args.iter().position(|a| *a == "https://prtg.example").unwrap();
    args[pos] = " ";
    let config = Config::parse_from(args);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("PRTG_URL"));
}

#[test]
fn authorized_ids_skip_malformed_entries() {
    let config = Config::parse_from(full_args());
    let ids = config.authorized_ids();
    assert_eq!(ids.len(), 3);
    assert!(ids.contains(&111));
    assert!(ids.contains(&222));
    assert!(ids.contains(&333));
}

#[test]
fn sensor_ids_resolve_per_gateway() {
    let config = Config::parse_from(full_args());
    assert_eq!(config.nif_sensor(crate::report::Gateway::Jayapura), "2001");
    assert_eq!(config.iptx_sensor(crate::report::Gateway::Timika), "1003");
}

#[test]
fn state_and_log_paths_share_the_log_dir() {
    let config = Config::parse_from(full_args());
    assert_eq!(config.state_file(), PathBuf::from("logs/active_alerts.json"));
    assert_eq!(config.log_file(), PathBuf::from("logs/satwatch.log"));
}

#[test]
fn db_family_absent_without_username() -> anyhow::Result<()> {
    let families = DbFamilies::with_lookup(env_from(&[
        ("DB_ONE_JYP_HOST", "db.example"),
        ("DB_ONE_JYP_PORT", "5432"),
        ("DB_ONE_JYP_NAME", "modems"),
    ]))?;
    assert!(families.one(Gateway::Jayapura).is_none());
    Ok(())
}

#[test]
fn db_family_configured_with_username() -> anyhow::Result<()> {
    let families = DbFamilies::with_lookup(env_from(&[
        ("DB_ONE_JYP_USERNAME", "monitor"),
        ("DB_ONE_JYP_HOST", "db.example"),
        ("DB_ONE_JYP_PORT", "5432"),
        ("DB_ONE_JYP_NAME", "modems"),
    ]))?;
    let cfg = families.one(Gateway::Jayapura).unwrap();
    assert_eq!(cfg.user, "monitor");
    assert_eq!(cfg.pass, "");
    assert_eq!(cfg.port, "5432");
    assert!(families.five(Gateway::Jayapura).is_none());
    assert!(families.one(Gateway::Manokwari).is_none());
    Ok(())
}

#[test]
fn db_family_username_without_host_is_fatal() {
    let err = DbFamilies::with_lookup(env_from(&[
        ("DB_FIVE_TMK_USERNAME", "monitor"),
        ("DB_FIVE_TMK_PORT", "5432"),
        ("DB_FIVE_TMK_NAME", "kpi"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("DB_FIVE_TMK_HOST"));
}

#[test]
#[serial_test::serial]
fn db_families_read_from_process_env() -> anyhow::Result<()> {
    std::env::set_var("DB_FIVE_MNK_USERNAME", "monitor");
    std::env::set_var("DB_FIVE_MNK_HOST", "db5.example");
    std::env::set_var("DB_FIVE_MNK_PORT", "5433");
    std::env::set_var("DB_FIVE_MNK_NAME", "kpi");

    let families = DbFamilies::from_env()?;
    assert_eq!(families.five(Gateway::Manokwari).unwrap().host, "db5.example");

    std::env::remove_var("DB_FIVE_MNK_USERNAME");
    std::env::remove_var("DB_FIVE_MNK_HOST");
    std::env::remove_var("DB_FIVE_MNK_PORT");
    std::env::remove_var("DB_FIVE_MNK_NAME");
    Ok(())
}
