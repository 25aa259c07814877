use crate::patreon::Patron;
use crate::tiers::timestamp::normalize_date;
use crate::tiers::{Buckets, Tier};
use eyre::{Report, WrapErr as _};
use serde_derive::{Deserialize, Serialize};
use std::fmt::Debug;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PATRONS_JSON: &str = "patrons.json";
const MENTIONS_HEADER: [&str; 3] = ["member_id", "displayed_name", "last_payment_timestamp"];

#[derive(Serialize)]
struct MentionRow<'a> {
    member_id: &'a str,
    displayed_name: &'a str,
    last_payment_timestamp: String,
}

impl<'a> From<&'a Patron> for MentionRow<'a> {
    fn from(patron: &'a Patron) -> Self {
        Self {
            member_id: &patron.member_id,
            displayed_name: &patron.displayed_name,
            last_payment_timestamp: normalize_date(&patron.last_payment_timestamp),
        }
    }
}

/// Entry of `patrons.json`, read by the client-side perks lookup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PatronEntry {
    pub member_id: String,
    pub displayed_name: String,
    pub tier: String,
    pub last_payment_timestamp: String,
}

impl PatronEntry {
    pub fn new(tier: Tier, patron: &Patron) -> Self {
        Self {
            member_id: patron.member_id.clone(),
            displayed_name: patron.displayed_name.clone(),
            tier: tier.label().to_string(),
            last_payment_timestamp: normalize_date(&patron.last_payment_timestamp),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub one_month: usize,
    pub six_months: usize,
    pub one_year: usize,
    pub listed: usize,
}

pub fn mentions_path(output_dir: &Path, tier: Tier) -> PathBuf {
    output_dir.join(format!("{}_mentions.csv", tier.key()))
}

#[tracing::instrument(skip(patrons))]
pub fn write_mentions(path: impl AsRef<Path> + Debug, patrons: &[Patron]) -> Result<(), Report> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_path(path.as_ref())?;
    writer.write_record(MENTIONS_HEADER)?;
    for patron in patrons {
        writer.serialize(MentionRow::from(patron))?;
    }
    writer.flush()?;
    Ok(())
}

#[tracing::instrument(skip(entries))]
pub fn write_patrons_json(
    path: impl AsRef<Path> + Debug,
    entries: &[PatronEntry],
) -> Result<(), Report> {
    let mut file = std::fs::File::create(path)?;
    let contents = serde_json::to_string_pretty(entries)?;

    Ok(file.write_all(contents.as_bytes())?)
}

/// Writes the three mention CSVs and `patrons.json` into `output_dir`.
pub fn emit(buckets: &Buckets, output_dir: &Path) -> Result<Summary, Report> {
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("couldn't create {}", output_dir.display()))?;

    for tier in Tier::ALL {
        let path = mentions_path(output_dir, tier);
        let patrons = buckets.get(tier);
        write_mentions(&path, patrons)
            .wrap_err_with(|| format!("couldn't write {}", path.display()))?;
        info!("Updated {} with {} patrons", path.display(), patrons.len());
    }

    let entries: Vec<PatronEntry> = buckets
        .iter()
        .map(|(tier, patron)| PatronEntry::new(tier, patron))
        .collect();
    let json_path = output_dir.join(PATRONS_JSON);
    write_patrons_json(&json_path, &entries)
        .wrap_err_with(|| format!("couldn't write {}", json_path.display()))?;
    info!("Generated {} with {} patrons", json_path.display(), entries.len());

    Ok(Summary {
        one_month: buckets.get(Tier::OneMonth).len(),
        six_months: buckets.get(Tier::SixMonths).len(),
        one_year: buckets.get(Tier::OneYear).len(),
        listed: entries.len(),
    })
}
