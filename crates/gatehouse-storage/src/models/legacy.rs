//! Field-name normalization at the store boundary
//!
//! Snapshots and inputs written by older deployments use Spanish field names
//! (`usuario`, `correo`, `contrasena`, ...) and sometimes both schemes at once.
//! Each raw type here accepts every synonym and folds it into the canonical
//! shape. The canonical name wins when both are present.
//!
//! | canonical | fallbacks |
//! |-----------|-----------|
//! | `username` | `usuario` |
//! | `email` | `correo` |
//! | `passwordHash` | `contrasena`, `password` |
//! | `phone` | `telefono` |
//! | `department` | `departamento` |
//! | `role` | `rol` |
//! | `idCardMarker` | `idCard`, `IDcard`, `idCardHash` |
//! | `active` | `activo` |
//! | `createdAt` | `fechaCreacion` |
//!
//! Unknown fields (`secret`, `_id`, `__v`, ...) are ignored.

use chrono::{DateTime, Utc};
use gatehouse_core::{Role, UserId};
use serde::Deserialize;
use thiserror::Error;

use super::user::{NewUser, UserPatch, UserRecord};
use crate::crypto::empty_card_marker;

/// A stored record could not be normalized.
#[derive(Debug, Error)]
#[error("malformed user record: {0}")]
pub struct MalformedRecord(String);

/// Identifier as found in older snapshots: a number or a numeric string.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseId {
    Number(u64),
    Text(String),
}

impl TryFrom<LooseId> for UserId {
    type Error = MalformedRecord;

    fn try_from(id: LooseId) -> Result<Self, Self::Error> {
        match id {
            LooseId::Number(n) => Ok(UserId::new(n)),
            LooseId::Text(s) => s
                .parse()
                .map_err(|_| MalformedRecord(format!("non-numeric id '{s}'"))),
        }
    }
}

/// Timestamp as found in older snapshots: RFC 3339 or epoch milliseconds.
#[derive(Deserialize)]
#[serde(untagged)]
enum LooseTimestamp {
    Millis(i64),
    Rfc3339(DateTime<Utc>),
}

impl LooseTimestamp {
    fn into_datetime(self) -> Result<DateTime<Utc>, MalformedRecord> {
        match self {
            LooseTimestamp::Rfc3339(dt) => Ok(dt),
            LooseTimestamp::Millis(ms) => DateTime::from_timestamp_millis(ms)
                .ok_or_else(|| MalformedRecord(format!("timestamp {ms} out of range"))),
        }
    }
}

/// Stored user record in any naming scheme.
#[derive(Deserialize)]
pub(crate) struct RawUserRecord {
    id: Option<LooseId>,

    username: Option<String>,
    usuario: Option<String>,

    email: Option<String>,
    correo: Option<String>,

    #[serde(rename = "passwordHash")]
    password_hash: Option<String>,
    contrasena: Option<String>,
    password: Option<String>,

    phone: Option<String>,
    telefono: Option<String>,

    department: Option<String>,
    departamento: Option<String>,

    role: Option<Role>,
    rol: Option<Role>,

    #[serde(rename = "idCardMarker")]
    id_card_marker: Option<String>,
    #[serde(rename = "idCard")]
    id_card: Option<String>,
    #[serde(rename = "IDcard")]
    id_card_legacy: Option<String>,
    #[serde(rename = "idCardHash")]
    id_card_hash: Option<String>,

    active: Option<bool>,
    activo: Option<bool>,

    #[serde(rename = "createdAt")]
    created_at: Option<LooseTimestamp>,
    #[serde(rename = "fechaCreacion")]
    fecha_creacion: Option<LooseTimestamp>,
}

fn required(value: Option<String>, field: &str) -> Result<String, MalformedRecord> {
    value.ok_or_else(|| MalformedRecord(format!("missing {field}")))
}

impl TryFrom<RawUserRecord> for UserRecord {
    type Error = MalformedRecord;

    fn try_from(raw: RawUserRecord) -> Result<Self, Self::Error> {
        let id = raw
            .id
            .ok_or_else(|| MalformedRecord("missing id".to_string()))?
            .try_into()?;

        let created_at = match raw.created_at.or(raw.fecha_creacion) {
            Some(ts) => ts.into_datetime()?,
            None => Utc::now(),
        };

        Ok(UserRecord {
            id,
            username: required(raw.username.or(raw.usuario), "username")?,
            email: required(raw.email.or(raw.correo), "email")?,
            password_hash: required(
                raw.password_hash.or(raw.contrasena).or(raw.password),
                "passwordHash",
            )?,
            phone: raw.phone.or(raw.telefono).unwrap_or_default(),
            department: raw.department.or(raw.departamento).unwrap_or_default(),
            role: raw.role.or(raw.rol).unwrap_or_default(),
            id_card_marker: raw
                .id_card_marker
                .or(raw.id_card)
                .or(raw.id_card_legacy)
                .or(raw.id_card_hash)
                .unwrap_or_else(empty_card_marker),
            active: raw.active.or(raw.activo).unwrap_or(true),
            created_at,
        })
    }
}

/// Creation input in any naming scheme.
#[derive(Deserialize)]
pub(crate) struct RawNewUser {
    username: Option<String>,
    usuario: Option<String>,

    email: Option<String>,
    correo: Option<String>,

    password: Option<String>,
    contrasena: Option<String>,

    phone: Option<String>,
    telefono: Option<String>,

    department: Option<String>,
    departamento: Option<String>,

    role: Option<Role>,
    rol: Option<Role>,

    #[serde(rename = "cardUid")]
    card_uid: Option<String>,
    #[serde(rename = "idCard")]
    id_card: Option<String>,
    #[serde(rename = "IDcard")]
    id_card_legacy: Option<String>,

    active: Option<bool>,
    activo: Option<bool>,
}

impl From<RawNewUser> for NewUser {
    fn from(raw: RawNewUser) -> Self {
        NewUser {
            username: raw.username.or(raw.usuario).unwrap_or_default(),
            email: raw.email.or(raw.correo).unwrap_or_default(),
            password: raw.password.or(raw.contrasena).unwrap_or_default(),
            phone: raw.phone.or(raw.telefono).unwrap_or_default(),
            department: raw.department.or(raw.departamento).unwrap_or_default(),
            role: raw.role.or(raw.rol),
            card_uid: raw.card_uid.or(raw.id_card).or(raw.id_card_legacy),
            active: raw.active.or(raw.activo),
        }
    }
}

/// Update input in any naming scheme.
#[derive(Deserialize)]
pub(crate) struct RawUserPatch {
    password: Option<String>,
    contrasena: Option<String>,

    email: Option<String>,
    correo: Option<String>,

    phone: Option<String>,
    telefono: Option<String>,

    department: Option<String>,
    departamento: Option<String>,

    username: Option<String>,
    usuario: Option<String>,

    #[serde(rename = "cardUid")]
    card_uid: Option<String>,
    #[serde(rename = "idCard")]
    id_card: Option<String>,
    #[serde(rename = "IDcard")]
    id_card_legacy: Option<String>,

    role: Option<Role>,
    rol: Option<Role>,

    active: Option<bool>,
    activo: Option<bool>,
}

impl From<RawUserPatch> for UserPatch {
    fn from(raw: RawUserPatch) -> Self {
        UserPatch {
            password: raw.password.or(raw.contrasena),
            email: raw.email.or(raw.correo),
            phone: raw.phone.or(raw.telefono),
            department: raw.department.or(raw.departamento),
            username: raw.username.or(raw.usuario),
            card_uid: raw.card_uid.or(raw.id_card).or(raw.id_card_legacy),
            role: raw.role.or(raw.rol),
            active: raw.active.or(raw.activo),
        }
    }
}
