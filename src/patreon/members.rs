use serde_derive::Deserialize;
use std::collections::HashMap;

use crate::patreon::Patron;

pub const ANONYMOUS: &str = "Anonymous";

/// One page of `GET /campaigns/{id}/members`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MembersPage {
    #[serde(default)]
    pub data: Vec<Member>,
    #[serde(default)]
    pub included: Vec<Included>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub attributes: MemberAttributes,
    #[serde(default)]
    pub relationships: Option<MemberRelationships>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MemberAttributes {
    pub patron_status: Option<String>,
    pub full_name: Option<String>,
    pub last_charge_date: Option<String>,
    pub last_charge_status: Option<String>,
    pub currently_entitled_amount_cents: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemberRelationships {
    pub user: Option<Relationship>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Relationship {
    pub data: Option<ResourceIdentifier>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceIdentifier {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Included {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: UserAttributes,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct UserAttributes {
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Links {
    pub next: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatronStatus {
    Active,
    Declined,
    Former,
    Other,
}

impl From<Option<&str>> for PatronStatus {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some("active_patron") => PatronStatus::Active,
            Some("declined_patron") => PatronStatus::Declined,
            Some("former_patron") => PatronStatus::Former,
            _ => PatronStatus::Other,
        }
    }
}

impl Member {
    pub fn status(&self) -> PatronStatus {
        PatronStatus::from(self.attributes.patron_status.as_deref())
    }

    fn user_id(&self) -> Option<&str> {
        self.relationships
            .as_ref()?
            .user
            .as_ref()?
            .data
            .as_ref()
            .map(|d| d.id.as_str())
    }
}

impl MembersPage {
    pub fn next_url(&self) -> Option<&str> {
        self.links.as_ref()?.next.as_deref()
    }

    /// Active members of this page, with names resolved from this page's `included` users.
    pub fn active_patrons(&self) -> Vec<Patron> {
        let users: HashMap<&str, &Included> = self
            .included
            .iter()
            .filter(|i| i.kind == "user")
            .map(|i| (i.id.as_str(), i))
            .collect();

        self.data
            .iter()
            .filter(|m| m.status() == PatronStatus::Active)
            .map(|member| {
                let user_name = member
                    .user_id()
                    .and_then(|id| users.get(id))
                    .and_then(|u| u.attributes.full_name.clone());
                Patron {
                    member_id: member.id.clone(),
                    displayed_name: user_name
                        .or_else(|| member.attributes.full_name.clone())
                        .unwrap_or_else(|| ANONYMOUS.to_string()),
                    last_payment_timestamp: member
                        .attributes
                        .last_charge_date
                        .clone()
                        .unwrap_or_default(),
                    pledge_amount_cents: member
                        .attributes
                        .currently_entitled_amount_cents
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}
