use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::fields;

/// The value type a field (column) holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
}

impl FieldType {
    pub const ALL: [FieldType; 4] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Date,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or(())
    }
}

/// A typed column of a sheet.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = fields)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub sheet_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = fields)]
pub struct NewField<'a> {
    pub id: &'a str,
    pub sheet_id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub type_: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_parses_known_names() {
        assert_eq!("text".parse::<FieldType>(), Ok(FieldType::Text));
        assert_eq!("date".parse::<FieldType>(), Ok(FieldType::Date));
        assert!("Text".parse::<FieldType>().is_err());
        assert!("currency".parse::<FieldType>().is_err());
    }

    #[test]
    fn field_serializes_with_client_casing() {
        let now = Utc::now();
        let field = Field {
            id: "fld_1".to_string(),
            sheet_id: "sht_1".to_string(),
            name: "Price".to_string(),
            description: Some("Unit price".to_string()),
            type_: FieldType::Number.to_string(),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["sheetId"], "sht_1");
        assert_eq!(value["type"], "number");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("sheet_id").is_none());
    }
}
