//! Row mapping for the harvested entities

use crate::entities::{Animal, Group, Image};
use crate::storage::{Row, StorageError, Table};
use rusqlite::types::Value;

/// An entity that can be written to one table
pub trait Record {
    const TABLE: Table;

    /// Unique key (canonical URL)
    fn key(&self) -> &str;

    /// `(column, value)` pairs in schema column order
    fn values(&self) -> Result<Vec<(&'static str, Value)>, StorageError>;

    /// Row for upsert, keyed by [`Record::key`]
    fn to_row(&self) -> Result<Row, StorageError> {
        Ok(Row {
            key: self.key().to_string(),
            values: self.values()?,
        })
    }
}

fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

// Flags are stored as "true"/"false" text, as the older scrapers did.
fn flag(value: Option<bool>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

impl Record for Animal {
    const TABLE: Table = Table::Animals;

    fn key(&self) -> &str {
        self.url.as_str()
    }

    fn values(&self) -> Result<Vec<(&'static str, Value)>, StorageError> {
        let details = self.available.as_ref();

        let values = vec![
            ("url", Value::Text(self.url.to_string())),
            ("site_id", self.site_id.map_or(Value::Null, |id| Value::Integer(id as i64))),
            ("name", text(self.name.as_deref())),
            ("description", text(details.and_then(|d| d.description.as_deref()))),
            ("gender", text(self.gender.as_deref())),
            ("breed", text(self.breed.as_deref())),
            ("species", text(self.species.as_deref())),
            ("status", Value::Text(self.status.to_string())),
            ("group_url", text(self.group.as_deref())),
            ("state", text(self.state.as_deref())),
            ("interstate", flag(details.map(|d| d.interstate))),
            ("last_updated", text(self.last_updated.as_deref())),
            ("scraped_at", Value::Text(self.scraped_at.to_rfc3339())),
            ("age", text(details.and_then(|d| d.age.as_deref()))),
            ("adoption_fee", text(details.and_then(|d| d.adoption_fee.as_deref()))),
            ("desexed", flag(details.and_then(|d| d.desexed))),
            ("vaccinated", flag(details.and_then(|d| d.vaccinated))),
            ("wormed", flag(details.and_then(|d| d.wormed))),
            ("heartworm_treated", flag(details.and_then(|d| d.heartworm_treated))),
        ];

        Ok(values)
    }
}

impl Record for Image {
    const TABLE: Table = Table::Images;

    fn key(&self) -> &str {
        &self.url
    }

    fn values(&self) -> Result<Vec<(&'static str, Value)>, StorageError> {
        Ok(vec![
            ("url", Value::Text(self.url.clone())),
            ("animal_url", Value::Text(self.animal.to_string())),
        ])
    }
}

impl Record for Group {
    const TABLE: Table = Table::Groups;

    fn key(&self) -> &str {
        self.url.as_str()
    }

    fn values(&self) -> Result<Vec<(&'static str, Value)>, StorageError> {
        let contact = self.contact.as_ref();
        let phone = |i: usize| text(contact.and_then(|c| c.phones.get(i)).map(String::as_str));

        let flagged = if self.flagged_labels.is_empty() {
            Value::Null
        } else {
            Value::Text(serde_json::to_string(&self.flagged_labels)?)
        };

        let values = vec![
            ("url", Value::Text(self.url.to_string())),
            ("name", text(self.name.as_deref())),
            ("about", text(self.about.as_deref())),
            ("adoption_process", text(self.adoption_process.as_deref())),
            ("states", Value::Text(serde_json::to_string(&self.states)?)),
            ("social", Value::Text(serde_json::to_string(&self.social)?)),
            ("contact_name", text(contact.and_then(|c| c.name.as_deref()))),
            ("phone_1", phone(0)),
            ("phone_2", phone(1)),
            ("phone_3", phone(2)),
            ("flagged_labels", flagged),
            ("scraped_at", Value::Text(self.scraped_at.to_rfc3339())),
        ];

        Ok(values)
    }
}
