use crate::config::Config;
use crate::output::{self, Summary};
use crate::patreon::PatreonClient;
use crate::patreon::auth::Credentials;
use crate::tiers;
use eyre::{Report, WrapErr as _};
use tracing::{info, warn};

/// Fetches, classifies and writes one full snapshot of the campaign's patrons.
#[tracing::instrument(skip(config))]
pub async fn update_patrons(config: &Config, credentials: &Credentials) -> Result<Summary, Report> {
    info!("Fetching patron data from Patreon API...");
    let client = PatreonClient::new(&config.api).wrap_err("couldn't build HTTP client")?;
    let patrons = client.fetch_patrons(credentials).await;

    if patrons.is_empty() {
        warn!("No patrons found or API request failed.");
        warn!(
            "Set PATREON_ACCESS_TOKEN and PATREON_CAMPAIGN_ID as environment variables, \
             or create '{}' (gitignore'd) with PATREON_ACCESS_TOKEN='...' and PATREON_CAMPAIGN_ID='...'",
            config.credentials_file.display()
        );
    }

    info!("Categorizing patrons by subscription length...");
    let buckets = tiers::classify(&patrons);
    let summary = output::emit(&buckets, &config.output_dir)?;

    info!(
        one_year = summary.one_year,
        six_months = summary.six_months,
        one_month = summary.one_month,
        "All patron data updated"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{PATRONS_JSON, PatronEntry, mentions_path};
    use crate::patreon::mock::{MockCampaign, TOKEN};
    use crate::tiers::Tier;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config_in(dir: &std::path::Path) -> Config {
        Config {
            output_dir: dir.join("_data"),
            credentials_file: dir.join(".patreon.env"),
            ..Config::default()
        }
    }

    fn read_entries(config: &Config) -> Vec<PatronEntry> {
        let json = std::fs::read_to_string(config.output_dir.join(PATRONS_JSON)).unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[tokio::test]
    async fn missing_credentials_write_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let summary = update_patrons(&config, &Credentials::default()).await.unwrap();
        assert_eq!(summary, Summary::default());

        for tier in Tier::ALL {
            let csv = std::fs::read_to_string(mentions_path(&config.output_dir, tier)).unwrap();
            assert_eq!(csv, "member_id,displayed_name,last_payment_timestamp\r\n");
        }
        assert!(read_entries(&config).is_empty());
    }

    #[tokio::test]
    async fn only_eligible_patrons_are_listed() {
        let recent = (Utc::now() - Duration::days(3)).to_rfc3339();
        let stale = (Utc::now() - Duration::days(400)).to_rfc3339();
        let mock = MockCampaign::start(
            "c1",
            vec![(
                vec![
                    json!({
                        "id": "m1",
                        "attributes": {
                            "patron_status": "active_patron",
                            "last_charge_date": recent,
                            "currently_entitled_amount_cents": 300
                        },
                        "relationships": {"user": {"data": {"id": "u1", "type": "user"}}}
                    }),
                    json!({
                        "id": "m2",
                        "attributes": {
                            "patron_status": "active_patron",
                            "last_charge_date": stale,
                            "currently_entitled_amount_cents": 1500
                        },
                        "relationships": {"user": {"data": {"id": "u2", "type": "user"}}}
                    }),
                    json!({
                        "id": "m3",
                        "attributes": {
                            "patron_status": "active_patron",
                            "last_charge_date": null,
                            "currently_entitled_amount_cents": 500
                        }
                    }),
                ],
                vec![
                    json!({"id": "u1", "type": "user", "attributes": {"full_name": "Nora"}}),
                    json!({"id": "u2", "type": "user", "attributes": {"full_name": "Boris"}}),
                ],
            )],
        )
        .await;

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            api: mock.api_config(),
            ..config_in(dir.path())
        };
        let credentials = Credentials {
            access_token: TOKEN.to_string(),
            campaign_id: "c1".to_string(),
        };

        let summary = update_patrons(&config, &credentials).await.unwrap();
        assert_eq!(summary.listed, 1);

        let entries = read_entries(&config);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].member_id, "m1");
        assert_eq!(entries[0].displayed_name, "Nora");
        assert_eq!(entries[0].tier, "NOTUS");

        let one_year =
            std::fs::read_to_string(mentions_path(&config.output_dir, Tier::OneYear)).unwrap();
        assert_eq!(one_year, "member_id,displayed_name,last_payment_timestamp\r\n");
    }
}
