use serde::{Deserialize, Serialize};

/// A travel guide as returned by `GET /guides/{id}` and `/guides/mes-guides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Guide {
    pub id: i64,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "nombreJours", default)]
    pub days: u32,
    #[serde(rename = "mobilites", default)]
    pub mobilities: Vec<String>,
    #[serde(rename = "saisons", default)]
    pub seasons: Vec<String>,
    #[serde(rename = "pourQui", default)]
    pub audience: Vec<String>,
    #[serde(rename = "guideActivites", default)]
    pub activities: Vec<GuideActivite>,
    #[serde(rename = "invitedUserIds", default)]
    pub invited_user_ids: Vec<i64>,
    #[serde(rename = "favori", alias = "favorite", default)]
    pub favorite: bool,
}

/// Placement of an activity on one day of a guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GuideActivite {
    pub id: i64,
    #[serde(rename = "guideId")]
    pub guide_id: i64,
    #[serde(rename = "activiteId")]
    pub activite_id: i64,
    #[serde(rename = "jour")]
    pub day: u32,
    #[serde(rename = "ordre", default)]
    pub order: u32,
    pub activite: Option<Activite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Activite {
    pub id: i64,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "categorie")]
    pub category: Option<String>,
    #[serde(rename = "adresse")]
    pub address: Option<String>,
    #[serde(rename = "telephone")]
    pub phone: Option<String>,
    #[serde(rename = "horairesOuverture")]
    pub opening_hours: Option<String>,
    #[serde(rename = "siteInternet")]
    pub website: Option<String>,
}

impl Guide {
    /// Day numbers 1..=days.
    pub fn day_list(&self) -> Vec<u32> {
        (1..=self.days).collect()
    }

    /// Activities for `day` (0 means every day), sorted by their order within the day.
    pub fn activities_for_day(&self, day: u32) -> Vec<&GuideActivite> {
        let mut activities: Vec<&GuideActivite> = self
            .activities
            .iter()
            .filter(|a| day == 0 || a.day == day)
            .collect();
        activities.sort_by_key(|a| a.order);
        activities
    }

    /// Overwrite the fields a draft carries.
    pub fn apply(&mut self, draft: &GuideDraft) {
        if let Some(ref title) = draft.title {
            self.title = title.clone();
        }
        if let Some(ref description) = draft.description {
            self.description = description.clone();
        }
        if let Some(days) = draft.days {
            self.days = days;
        }
        if let Some(ref mobilities) = draft.mobilities {
            self.mobilities = mobilities.clone();
        }
        if let Some(ref seasons) = draft.seasons {
            self.seasons = seasons.clone();
        }
        if let Some(ref audience) = draft.audience {
            self.audience = audience.clone();
        }
    }
}

/// Body of `POST /guides` and `PUT /guides/{id}`. Unset fields are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuideDraft {
    #[serde(rename = "titre", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "nombreJours", skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(rename = "mobilites", skip_serializing_if = "Option::is_none")]
    pub mobilities: Option<Vec<String>>,
    #[serde(rename = "saisons", skip_serializing_if = "Option::is_none")]
    pub seasons: Option<Vec<String>>,
    #[serde(rename = "pourQui", skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,
}
