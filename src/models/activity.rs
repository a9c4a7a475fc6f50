// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Volunteer activity ("convocatoria") model for storage and API.
//!
//! Older clients and endpoints used Spanish and camelCase field names for the
//! same values; those are accepted through serde aliases so the rest of the
//! crate only sees the canonical names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};

/// Activity area. New areas are added as variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(alias = "medio_ambiente", alias = "medioambiente", alias = "ambiente")]
    Environment,
    #[serde(alias = "ninos", alias = "niños", alias = "infancia")]
    Children,
    #[serde(alias = "adultos_mayores", alias = "adulto_mayor")]
    Elderly,
    #[serde(alias = "comunidad")]
    Community,
    #[serde(alias = "educacion", alias = "educación")]
    Education,
    #[serde(alias = "salud")]
    Health,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Environment => "environment",
            Category::Children => "children",
            Category::Elderly => "elderly",
            Category::Community => "community",
            Category::Education => "education",
            Category::Health => "health",
        }
    }

    /// Parse a single category name, accepting every alias.
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(raw.trim().to_lowercase())).ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[serde(alias = "presencial", alias = "in-person")]
    InPerson,
    #[serde(alias = "en_linea", alias = "online")]
    Virtual,
    #[serde(alias = "hibrida", alias = "hibrido", alias = "híbrida")]
    Hybrid,
}

/// Lifecycle status. Only the closure workflow moves an activity to `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    #[default]
    #[serde(alias = "activa", alias = "abierta")]
    Active,
    #[serde(alias = "cerrada")]
    Closed,
    #[serde(alias = "finalizada", alias = "completada")]
    Completed,
}

impl ActivityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityStatus::Active => "active",
            ActivityStatus::Closed => "closed",
            ActivityStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Location {
    #[serde(alias = "lugar", alias = "nombre_lugar", alias = "venueName")]
    pub venue: String,
    #[serde(alias = "direccion")]
    pub address: String,
    #[serde(alias = "comuna")]
    pub district: String,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Contact {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "correo")]
    pub email: Option<String>,
    #[serde(default, alias = "telefono")]
    pub phone: Option<String>,
}

/// Stored activity record (document ID = `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Activity {
    pub id: String,
    #[serde(alias = "titulo")]
    pub title: String,
    #[serde(alias = "descripcion")]
    pub description: String,
    #[serde(alias = "categoria")]
    pub category: Category,
    #[serde(alias = "modalidad")]
    pub modality: Modality,
    #[serde(
        alias = "fecha_inicio",
        alias = "fechaInicio",
        alias = "startDate",
        with = "crate::time_utils::flexible"
    )]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub start: DateTime<Utc>,
    #[serde(
        default,
        alias = "fecha_fin",
        alias = "fechaFin",
        alias = "endDate",
        with = "crate::time_utils::flexible_option"
    )]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub end: Option<DateTime<Utc>>,
    #[serde(alias = "ubicacion")]
    pub location: Location,
    /// `None` means unlimited.
    #[serde(
        default,
        alias = "cupos",
        alias = "capacidad",
        alias = "cupo_maximo",
        alias = "maxParticipants"
    )]
    pub capacity: Option<u32>,
    #[serde(default, alias = "estado")]
    pub status: ActivityStatus,
    #[serde(default, alias = "imagen", alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "requisitos")]
    pub requirements: Vec<String>,
    #[serde(default, alias = "contacto")]
    pub contact: Option<Contact>,
    #[serde(default, alias = "motivo_cierre", alias = "closureReason")]
    pub closure_reason: Option<String>,
    #[serde(
        default,
        alias = "fecha_cierre",
        alias = "closedAt",
        with = "crate::time_utils::flexible_option"
    )]
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::flexible")]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Declared duration in hours, if an end time is set.
    pub fn duration_hours(&self) -> Option<f64> {
        self.end
            .map(|end| (end - self.start).num_minutes().max(0) as f64 / 60.0)
    }

    /// Refuse new enrollments unless the activity is active.
    pub fn ensure_accepting_enrollments(&self) -> Result<()> {
        match self.status {
            ActivityStatus::Active => Ok(()),
            ActivityStatus::Closed => Err(AppError::ActivityClosed {
                reason: self
                    .closure_reason
                    .clone()
                    .unwrap_or_else(|| "closed".to_string()),
            }),
            ActivityStatus::Completed => Err(AppError::ActivityClosed {
                reason: "activity already took place".to_string(),
            }),
        }
    }

    /// Transition `active -> closed`.
    ///
    /// A failed call leaves the activity untouched.
    pub fn close(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let reason = validate_closure_reason(reason)?;

        match self.status {
            ActivityStatus::Active => {}
            ActivityStatus::Closed => return Err(AppError::AlreadyClosed),
            ActivityStatus::Completed => {
                return Err(AppError::Conflict(format!(
                    "Activity {} is completed and cannot be closed",
                    self.id
                )))
            }
        }

        self.status = ActivityStatus::Closed;
        self.closure_reason = Some(reason);
        self.closed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    fn matches_text(&self, needle: &str) -> bool {
        [
            self.title.as_str(),
            self.description.as_str(),
            self.location.venue.as_str(),
            self.location.district.as_str(),
        ]
        .iter()
        .any(|haystack| haystack.to_lowercase().contains(needle))
    }
}

/// Trimmed, non-empty closure reason.
pub fn validate_closure_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("reason", "closure reason is required"));
    }
    Ok(reason.to_string())
}

fn not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

fn check_schedule(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<()> {
    match end {
        Some(end) if end < start => Err(AppError::validation(
            "end",
            "end must not be earlier than start",
        )),
        _ => Ok(()),
    }
}

/// Capacities are stored as `u32`; that is the only upper bound.
fn stored_capacity(capacity: i64) -> Result<u32> {
    if capacity < 1 {
        return Err(AppError::validation(
            "capacity",
            "capacity must be a positive integer",
        ));
    }
    u32::try_from(capacity)
        .map_err(|_| AppError::validation("capacity", "capacity is larger than can be stored"))
}

/// Present-but-null becomes `Some(None)`; pair with `#[serde(default)]` for absent.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::validation(field, format!("{} is required", field)))
}

fn clean_requirements(requirements: Vec<String>) -> Vec<String> {
    requirements
        .into_iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect()
}

/// Location as received from clients; every part optional until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LocationInput {
    #[validate(custom(function = "not_blank"))]
    #[serde(default, alias = "lugar", alias = "nombre_lugar", alias = "venueName")]
    pub venue: Option<String>,
    #[validate(custom(function = "not_blank"))]
    #[serde(default, alias = "direccion")]
    pub address: Option<String>,
    #[validate(custom(function = "not_blank"))]
    #[serde(default, alias = "comuna")]
    pub district: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

impl LocationInput {
    fn into_location(self) -> Result<Location> {
        self.validate()
            .map_err(|e| prefix_validation(AppError::from(e), "location"))?;
        Ok(Location {
            venue: required(self.venue, "location.venue")?.trim().to_string(),
            address: required(self.address, "location.address")?.trim().to_string(),
            district: required(self.district, "location.district")?.trim().to_string(),
            region: self.region,
        })
    }

    fn merge_into(self, location: &mut Location) -> Result<()> {
        self.validate()
            .map_err(|e| prefix_validation(AppError::from(e), "location"))?;
        if let Some(venue) = self.venue {
            location.venue = venue.trim().to_string();
        }
        if let Some(address) = self.address {
            location.address = address.trim().to_string();
        }
        if let Some(district) = self.district {
            location.district = district.trim().to_string();
        }
        if self.region.is_some() {
            location.region = self.region;
        }
        Ok(())
    }
}

fn prefix_validation(err: AppError, prefix: &str) -> AppError {
    match err {
        AppError::Validation { field, message } => AppError::Validation {
            field: format!("{}.{}", prefix, field),
            message,
        },
        other => other,
    }
}

/// Create-activity request body.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewActivity {
    #[validate(required(message = "title is required"), custom(function = "not_blank"))]
    #[serde(default, alias = "titulo")]
    pub title: Option<String>,
    #[validate(
        required(message = "description is required"),
        custom(function = "not_blank")
    )]
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    #[validate(required(message = "category is required"))]
    #[serde(default, alias = "categoria")]
    pub category: Option<Category>,
    #[validate(required(message = "modality is required"))]
    #[serde(default, alias = "modalidad")]
    pub modality: Option<Modality>,
    #[validate(required(message = "start is required"))]
    #[serde(
        default,
        alias = "fecha_inicio",
        alias = "fechaInicio",
        alias = "startDate",
        with = "crate::time_utils::flexible_option"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "fecha_fin",
        alias = "fechaFin",
        alias = "endDate",
        with = "crate::time_utils::flexible_option"
    )]
    pub end: Option<DateTime<Utc>>,
    #[validate(required(message = "location is required"))]
    #[serde(default, alias = "ubicacion")]
    pub location: Option<LocationInput>,
    #[validate(range(min = 1, message = "capacity must be a positive integer"))]
    #[serde(
        default,
        alias = "cupos",
        alias = "capacidad",
        alias = "cupo_maximo",
        alias = "maxParticipants"
    )]
    pub capacity: Option<i64>,
    #[serde(default, alias = "imagen", alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "requisitos")]
    pub requirements: Option<Vec<String>>,
    #[serde(default, alias = "contacto")]
    pub contact: Option<Contact>,
}

impl NewActivity {
    /// Validate and build a new `active` activity.
    pub fn into_activity(self, id: String, now: DateTime<Utc>) -> Result<Activity> {
        self.validate()?;

        let start = required(self.start, "start")?;
        check_schedule(start, self.end)?;

        Ok(Activity {
            id,
            title: required(self.title, "title")?.trim().to_string(),
            description: required(self.description, "description")?
                .trim()
                .to_string(),
            category: required(self.category, "category")?,
            modality: required(self.modality, "modality")?,
            start,
            end: self.end,
            location: required(self.location, "location")?.into_location()?,
            capacity: self.capacity.map(stored_capacity).transpose()?,
            status: ActivityStatus::Active,
            image_url: self.image_url,
            requirements: clean_requirements(self.requirements.unwrap_or_default()),
            contact: self.contact,
            closure_reason: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. Status is deliberately absent: closing goes through the closure workflow.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ActivityPatch {
    #[validate(custom(function = "not_blank"))]
    #[serde(default, alias = "titulo")]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank"))]
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
    #[serde(default, alias = "categoria")]
    pub category: Option<Category>,
    #[serde(default, alias = "modalidad")]
    pub modality: Option<Modality>,
    #[serde(
        default,
        alias = "fecha_inicio",
        alias = "fechaInicio",
        alias = "startDate",
        with = "crate::time_utils::flexible_option"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        default,
        alias = "fecha_fin",
        alias = "fechaFin",
        alias = "endDate",
        deserialize_with = "crate::time_utils::flexible_nullable::deserialize"
    )]
    pub end: Option<Option<DateTime<Utc>>>,
    #[serde(default, alias = "ubicacion")]
    pub location: Option<LocationInput>,
    /// Outer `None`: leave as is. `Some(None)`: explicit null, clear it.
    #[serde(
        default,
        alias = "cupos",
        alias = "capacidad",
        alias = "cupo_maximo",
        alias = "maxParticipants",
        deserialize_with = "nullable"
    )]
    pub capacity: Option<Option<i64>>,
    #[serde(default, alias = "imagen", alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default, alias = "requisitos")]
    pub requirements: Option<Vec<String>>,
    #[serde(default, alias = "contacto")]
    pub contact: Option<Contact>,
}

impl ActivityPatch {
    /// Check supplied fields without touching any activity.
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if let Some(location) = &self.location {
            location
                .validate()
                .map_err(|e| prefix_validation(AppError::from(e), "location"))?;
        }
        if let Some(Some(capacity)) = self.capacity {
            stored_capacity(capacity)?;
        }
        Ok(())
    }

    /// Apply supplied fields. On error the activity is left unchanged.
    pub fn apply_to(self, activity: &mut Activity, now: DateTime<Utc>) -> Result<()> {
        self.check()?;

        let start = self.start.unwrap_or(activity.start);
        let end = self.end.unwrap_or(activity.end);
        check_schedule(start, end)?;

        let capacity = match self.capacity {
            Some(capacity) => capacity.map(stored_capacity).transpose()?,
            None => activity.capacity,
        };
        let mut location = activity.location.clone();
        if let Some(input) = self.location {
            input.merge_into(&mut location)?;
        }

        if let Some(title) = self.title {
            activity.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            activity.description = description.trim().to_string();
        }
        if let Some(category) = self.category {
            activity.category = category;
        }
        if let Some(modality) = self.modality {
            activity.modality = modality;
        }
        activity.start = start;
        activity.end = end;
        activity.location = location;
        activity.capacity = capacity;
        if self.image_url.is_some() {
            activity.image_url = self.image_url;
        }
        if let Some(requirements) = self.requirements {
            activity.requirements = clean_requirements(requirements);
        }
        if self.contact.is_some() {
            activity.contact = self.contact;
        }
        activity.updated_at = now;
        Ok(())
    }
}

/// Listing filters (query string).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityFilter {
    #[serde(default, alias = "categoria")]
    pub category: Option<Category>,
    #[serde(default, alias = "estado")]
    pub status: Option<ActivityStatus>,
    #[serde(default, alias = "modalidad")]
    pub modality: Option<Modality>,
    /// Earliest start (inclusive)
    #[serde(default, alias = "desde", with = "crate::time_utils::flexible_option")]
    pub from: Option<DateTime<Utc>>,
    /// Latest start (inclusive)
    #[serde(default, alias = "hasta", with = "crate::time_utils::flexible_option")]
    pub to: Option<DateTime<Utc>>,
    /// Free-text search
    #[serde(default, alias = "search", alias = "buscar")]
    pub q: Option<String>,
    /// Comma-separated categories to promote to the front
    #[serde(default, alias = "intereses")]
    pub interests: Option<String>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        if self.category.is_some_and(|c| c != activity.category) {
            return false;
        }
        if self.status.is_some_and(|s| s != activity.status) {
            return false;
        }
        if self.modality.is_some_and(|m| m != activity.modality) {
            return false;
        }
        if self.from.is_some_and(|from| activity.start < from) {
            return false;
        }
        if self.to.is_some_and(|to| activity.start > to) {
            return false;
        }
        match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => activity.matches_text(&q.to_lowercase()),
            _ => true,
        }
    }

    /// Declared interests; unknown names are ignored.
    pub fn interest_categories(&self) -> Vec<Category> {
        self.interests
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(Category::parse)
            .collect()
    }
}

/// Stable partition: activities in one of `interests` first, original order kept on both sides.
pub fn promote_interests(activities: Vec<Activity>, interests: &[Category]) -> Vec<Activity> {
    if interests.is_empty() {
        return activities;
    }
    let (mut preferred, rest): (Vec<_>, Vec<_>) = activities
        .into_iter()
        .partition(|a| interests.contains(&a.category));
    preferred.extend(rest);
    preferred
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 12, 0, 0).unwrap()
    }

    fn valid_request() -> serde_json::Value {
        json!({
            "title": "Limpieza de playa",
            "description": "Retiro de residuos en la costa",
            "category": "environment",
            "modality": "in_person",
            "start": "2025-05-10T09:00:00Z",
            "end": "2025-05-10T11:00:00Z",
            "location": {
                "venue": "Playa Grande",
                "address": "Av. Costanera 100",
                "district": "Cartagena"
            },
            "capacity": 10
        })
    }

    fn make_activity(id: &str, category: Category) -> Activity {
        let request: NewActivity = serde_json::from_value(json!({
            "title": format!("Activity {}", id),
            "description": "desc",
            "category": category.as_str(),
            "modality": "virtual",
            "start": "2025-05-10T09:00:00Z",
            "location": {"venue": "V", "address": "A", "district": "D"}
        }))
        .unwrap();
        request.into_activity(id.to_string(), now()).unwrap()
    }

    #[test]
    fn test_create_valid_activity() {
        let request: NewActivity = serde_json::from_value(valid_request()).unwrap();
        let activity = request.into_activity("a1".to_string(), now()).unwrap();

        assert_eq!(activity.status, ActivityStatus::Active);
        assert_eq!(activity.capacity, Some(10));
        assert_eq!(activity.duration_hours(), Some(2.0));
        assert_eq!(activity.location.district, "Cartagena");
    }

    #[test]
    fn test_missing_title_names_field() {
        let mut body = valid_request();
        body.as_object_mut().unwrap().remove("title");
        let request: NewActivity = serde_json::from_value(body).unwrap();

        match request.into_activity("a1".to_string(), now()) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "title"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_location_part_names_nested_field() {
        let mut body = valid_request();
        body["location"]["district"] = json!("   ");
        let request: NewActivity = serde_json::from_value(body).unwrap();

        match request.into_activity("a1".to_string(), now()) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "location.district"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_capacity_must_be_positive() {
        for bad in [0, -3] {
            let mut body = valid_request();
            body["capacity"] = json!(bad);
            let request: NewActivity = serde_json::from_value(body).unwrap();

            match request.into_activity("a1".to_string(), now()) {
                Err(AppError::Validation { field, .. }) => assert_eq!(field, "capacity"),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_large_capacity_accepted() {
        let mut body = valid_request();
        body["capacity"] = json!(150_000);
        let request: NewActivity = serde_json::from_value(body).unwrap();

        let activity = request.into_activity("a1".to_string(), now()).unwrap();
        assert_eq!(activity.capacity, Some(150_000));
    }

    #[test]
    fn test_capacity_beyond_storage_has_own_message() {
        let mut body = valid_request();
        body["capacity"] = json!(i64::from(u32::MAX) + 1);
        let request: NewActivity = serde_json::from_value(body).unwrap();

        match request.into_activity("a1".to_string(), now()) {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "capacity");
                assert_eq!(message, "capacity is larger than can be stored");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut body = valid_request();
        body["end"] = json!("2025-05-10T08:00:00Z");
        let request: NewActivity = serde_json::from_value(body).unwrap();

        match request.into_activity("a1".to_string(), now()) {
            Err(AppError::Validation { field, .. }) => assert_eq!(field, "end"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_legacy_field_names_normalized() {
        let request: NewActivity = serde_json::from_value(json!({
            "titulo": "Acompañamiento",
            "descripcion": "Visitas a hogar de ancianos",
            "categoria": "adultos_mayores",
            "modalidad": "presencial",
            "fechaInicio": "2025-06-01T15:00",
            "fecha_fin": "2025-06-01",
            "ubicacion": {"lugar": "Hogar", "direccion": "Calle 1", "comuna": "Ñuñoa"},
            "cupos": 5
        }))
        .unwrap();

        // fecha_fin at midnight precedes the start, so schedule validation trips.
        assert!(request.clone().into_activity("x".to_string(), now()).is_err());

        let fixed = NewActivity {
            end: None,
            ..request
        };
        let activity = fixed.into_activity("x".to_string(), now()).unwrap();
        assert_eq!(activity.category, Category::Elderly);
        assert_eq!(activity.modality, Modality::InPerson);
        assert_eq!(activity.capacity, Some(5));
        assert_eq!(activity.location.venue, "Hogar");
        assert_eq!(activity.duration_hours(), None);
    }

    #[test]
    fn test_stored_activity_roundtrips_aliases() {
        let activity = make_activity("a1", Category::Health);
        let stored = serde_json::to_value(&activity).unwrap();
        let back: Activity = serde_json::from_value(stored).unwrap();
        assert_eq!(back, activity);
    }

    #[test]
    fn test_patch_applies_only_supplied_fields() {
        let mut activity = make_activity("a1", Category::Children);
        let patch: ActivityPatch = serde_json::from_value(json!({
            "title": "Nuevo título",
            "location": {"district": "Providencia"}
        }))
        .unwrap();

        patch.apply_to(&mut activity, now()).unwrap();

        assert_eq!(activity.title, "Nuevo título");
        assert_eq!(activity.description, "desc");
        assert_eq!(activity.location.district, "Providencia");
        assert_eq!(activity.location.venue, "V");
    }

    #[test]
    fn test_patch_null_clears_end_and_capacity() {
        let mut activity = make_activity("a1", Category::Children);
        activity.end = Some(Utc.with_ymd_and_hms(2025, 5, 10, 11, 0, 0).unwrap());
        activity.capacity = Some(20);

        let patch: ActivityPatch =
            serde_json::from_value(json!({"end": null, "capacity": null})).unwrap();
        assert_eq!(patch.end, Some(None));
        assert_eq!(patch.capacity, Some(None));
        patch.apply_to(&mut activity, now()).unwrap();

        assert_eq!(activity.end, None);
        assert_eq!(activity.capacity, None);
    }

    #[test]
    fn test_patch_absent_end_and_capacity_kept() {
        let mut activity = make_activity("a1", Category::Children);
        let end = Utc.with_ymd_and_hms(2025, 5, 10, 11, 0, 0).unwrap();
        activity.end = Some(end);
        activity.capacity = Some(20);

        let patch: ActivityPatch = serde_json::from_value(json!({"title": "Otro"})).unwrap();
        assert_eq!(patch.end, None);
        assert_eq!(patch.capacity, None);
        patch.apply_to(&mut activity, now()).unwrap();

        assert_eq!(activity.end, Some(end));
        assert_eq!(activity.capacity, Some(20));
    }

    #[test]
    fn test_patch_sets_capacity_and_legacy_end() {
        let mut activity = make_activity("a1", Category::Children);
        let patch: ActivityPatch = serde_json::from_value(
            json!({"cupos": 30, "fechaFin": "2025-05-10T12:00:00Z"}),
        )
        .unwrap();
        patch.apply_to(&mut activity, now()).unwrap();

        assert_eq!(activity.capacity, Some(30));
        assert_eq!(activity.duration_hours(), Some(3.0));
    }

    #[test]
    fn test_patch_rejects_non_positive_capacity() {
        let patch: ActivityPatch = serde_json::from_value(json!({"capacity": 0})).unwrap();
        match patch.check() {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "capacity");
                assert_eq!(message, "capacity must be a positive integer");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_patch_leaves_activity_untouched() {
        let mut activity = make_activity("a1", Category::Children);
        let before = activity.clone();
        let patch: ActivityPatch = serde_json::from_value(json!({
            "title": "ok",
            "end": "2020-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(patch.apply_to(&mut activity, now()).is_err());
        assert_eq!(activity, before);
    }

    #[test]
    fn test_close_records_reason_once() {
        let mut activity = make_activity("a1", Category::Environment);
        let closed_at = now();

        activity.close("  fecha_alcanzada ", closed_at).unwrap();
        assert_eq!(activity.status, ActivityStatus::Closed);
        assert_eq!(activity.closure_reason.as_deref(), Some("fecha_alcanzada"));

        let later = closed_at + chrono::Duration::hours(1);
        assert!(matches!(
            activity.close("otro motivo", later),
            Err(AppError::AlreadyClosed)
        ));
        assert_eq!(activity.closure_reason.as_deref(), Some("fecha_alcanzada"));
        assert_eq!(activity.closed_at, Some(closed_at));
    }

    #[test]
    fn test_close_requires_reason() {
        let mut activity = make_activity("a1", Category::Environment);
        assert!(matches!(
            activity.close("   ", now()),
            Err(AppError::Validation { .. })
        ));
        assert_eq!(activity.status, ActivityStatus::Active);
    }

    #[test]
    fn test_closed_activity_refuses_enrollment_with_reason() {
        let mut activity = make_activity("a1", Category::Environment);
        activity.close("cupos completos", now()).unwrap();

        match activity.ensure_accepting_enrollments() {
            Err(AppError::ActivityClosed { reason }) => assert_eq!(reason, "cupos completos"),
            other => panic!("expected ActivityClosed, got {:?}", other),
        }
    }

    #[test]
    fn test_filter_matches() {
        let activity = make_activity("a1", Category::Environment);

        let by_text = ActivityFilter {
            q: Some("ACTIVITY a1".to_string()),
            ..Default::default()
        };
        assert!(by_text.matches(&activity));

        let by_category = ActivityFilter {
            category: Some(Category::Health),
            ..Default::default()
        };
        assert!(!by_category.matches(&activity));

        let by_window = ActivityFilter {
            from: Some(Utc.with_ymd_and_hms(2025, 5, 11, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(!by_window.matches(&activity));
    }

    #[test]
    fn test_promote_interests_is_stable_partition() {
        let activities = vec![
            make_activity("1", Category::Health),
            make_activity("2", Category::Environment),
            make_activity("3", Category::Health),
            make_activity("4", Category::Children),
            make_activity("5", Category::Environment),
        ];
        let filter = ActivityFilter {
            interests: Some("medioambiente, unknown,children".to_string()),
            ..Default::default()
        };

        let ordered = promote_interests(activities, &filter.interest_categories());
        let ids: Vec<&str> = ordered.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "4", "5", "1", "3"]);
    }
}
