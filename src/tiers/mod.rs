use crate::patreon::Patron;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tracing::warn;

pub mod timestamp;

use timestamp::{TimestampError, parse_timestamp, to_utc};

/// Subscription-length tier, keyed by the exact pledge amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    OneMonth,
    SixMonths,
    OneYear,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::OneMonth, Tier::SixMonths, Tier::OneYear];

    pub fn from_pledge_cents(cents: u64) -> Option<Self> {
        match cents {
            300 => Some(Tier::OneMonth),
            500 => Some(Tier::SixMonths),
            1500 => Some(Tier::OneYear),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Tier::OneMonth => "one_month",
            Tier::SixMonths => "six_months",
            Tier::OneYear => "one_year",
        }
    }

    /// Name shown to supporters.
    pub fn label(self) -> &'static str {
        match self {
            Tier::OneMonth => "NOTUS",
            Tier::SixMonths => "ZEPHYRUS",
            Tier::OneYear => "BOREAS",
        }
    }

    pub fn window(self) -> Duration {
        match self {
            Tier::OneMonth => Duration::days(30),
            Tier::SixMonths => Duration::days(180),
            Tier::OneYear => Duration::days(365),
        }
    }
}

/// Eligible patrons per tier, each bucket sorted by case-folded name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets(BTreeMap<Tier, Vec<Patron>>);

impl Buckets {
    pub fn get(&self, tier: Tier) -> &[Patron] {
        self.0.get(&tier).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every bucketed patron, tiers in `Tier::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Tier, &Patron)> {
        self.0
            .iter()
            .flat_map(|(tier, patrons)| patrons.iter().map(move |p| (*tier, p)))
    }
}

pub fn classify(patrons: &[Patron]) -> Buckets {
    classify_at(patrons, Utc::now())
}

pub fn classify_at(patrons: &[Patron], now: DateTime<Utc>) -> Buckets {
    let mut buckets: BTreeMap<Tier, Vec<Patron>> =
        Tier::ALL.iter().map(|tier| (*tier, Vec::new())).collect();

    for patron in patrons {
        let Some(tier) = Tier::from_pledge_cents(patron.pledge_amount_cents) else {
            warn!(
                "Unknown pledge amount {} cents for {}",
                patron.pledge_amount_cents, patron.displayed_name
            );
            continue;
        };

        let charged_at = match parse_timestamp(&patron.last_payment_timestamp) {
            Ok(dt) => to_utc(dt),
            Err(TimestampError::Empty) => continue,
            Err(e) => {
                warn!(
                    "Could not parse date for patron {}: {}",
                    patron.displayed_name, e
                );
                continue;
            }
        };

        let Some(eligible_until) = charged_at.checked_add_signed(tier.window()) else {
            warn!(
                "Last charge date {} for patron {} is out of range",
                patron.last_payment_timestamp, patron.displayed_name
            );
            continue;
        };
        if eligible_until > now {
            if let Some(bucket) = buckets.get_mut(&tier) {
                bucket.push(patron.clone());
            }
        }
    }

    for bucket in buckets.values_mut() {
        bucket.sort_by_cached_key(|p| p.displayed_name.to_lowercase());
    }
    Buckets(buckets)
}
