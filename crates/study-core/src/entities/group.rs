//! Group entity - a study group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::RecordId;

/// Study group entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: RecordId,
    pub name: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub owner_id: RecordId,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: impl Into<String>, owner_id: RecordId) -> Self {
        Self {
            id: RecordId::new_v4(),
            name: name.into(),
            subject: None,
            description: None,
            avatar_url: None,
            owner_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Denormalized preview shown to invitees before they join
    pub fn summary(&self, member_count: i64) -> GroupSummary {
        GroupSummary {
            id: self.id,
            name: self.name.clone(),
            subject: self.subject.clone(),
            description: self.description.clone(),
            avatar_url: self.avatar_url.clone(),
            member_count,
        }
    }
}

/// Public group preview attached to invite validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: RecordId,
    pub name: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub member_count: i64,
}
