use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db::status::StatusTransition;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BulkStatusRequest {
    pub ids: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    pub ids: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTagsRequest {
    pub tag_ids: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TagNamesRequest {
    pub names: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TagLookupRequest {
    pub names: Vec<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RenameTagRequest {
    pub new_name: String,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimestampQuery {
    pub timestamp: Option<DateTime<Utc>>,
}

/// Name used to attribute per-item errors of a bulk operation.
pub fn bulk_operation_path(transition: StatusTransition) -> &'static str {
    match transition {
        StatusTransition::Archive => "saveArchive",
        StatusTransition::Unarchive => "saveUnArchive",
        StatusTransition::Favorite => "saveFavorite",
        StatusTransition::Unfavorite => "saveUnFavorite",
        StatusTransition::Delete => "saveDelete",
    }
}
