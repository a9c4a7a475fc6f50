// SPDX-License-Identifier: MIT
// Copyright 2026 The Souls Authors

//! Identity types shared by the session layer and stored records.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Role granted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "estudiante", alias = "voluntario")]
    Student,
    #[serde(alias = "administrador")]
    Admin,
}

/// Student snapshot embedded in enrollments and roster entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StudentSummary {
    /// Identity-provider subject
    #[serde(alias = "usuario_id", alias = "userId", alias = "student_id")]
    pub id: String,
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "correo")]
    pub email: Option<String>,
}

impl StudentSummary {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }
}
