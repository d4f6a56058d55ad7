use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use haocai_auth::Principal;
use haocai_core::FieldError;

use crate::errors::Validate;

const MAX_NAME_LEN: usize = 100;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_name("name", &self.name, &mut errors);
        errors
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Validate for CreateSupplierRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_name("name", &self.name, &mut errors);

        if let Some(phone) = &self.phone {
            let digits = phone.chars().filter(|c| !matches!(c, '-' | ' ' | '+')).collect::<String>();
            if digits.len() < 7 || digits.len() > 20 || !digits.chars().all(|c| c.is_ascii_digit()) {
                errors.push(FieldError::new("phone", "联系电话格式不正确"));
            }
        }
        if let Some(email) = &self.email {
            let valid = email
                .split_once('@')
                .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
            if !valid {
                errors.push(FieldError::new("email", "邮箱格式不正确"));
            }
        }
        errors
    }
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Validate for AdjustStockRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.delta == 0 {
            errors.push(FieldError::new("delta", "调整数量不能为0"));
        }
        if self.reason.as_deref().is_some_and(|r| r.chars().count() > 200) {
            errors.push(FieldError::new("reason", "长度不能超过200"));
        }
        errors
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.username.trim().is_empty() {
            errors.push(FieldError::new("username", "用户名不能为空"));
        }
        if self.password.is_empty() {
            errors.push(FieldError::new("password", "密码不能为空"));
        }
        errors
    }
}

fn check_name(field: &str, value: &str, errors: &mut Vec<FieldError>) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(FieldError::new(field, "不能为空"));
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        errors.push(FieldError::new(field, format!("长度不能超过{MAX_NAME_LEN}")));
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub parent_id: Option<u64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: u64,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub material_id: u64,
    pub quantity: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub username: String,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WhoAmI {
    pub authenticated: bool,
    pub subject: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl WhoAmI {
    pub fn from_principal(principal: Option<&Principal>) -> Self {
        match principal {
            Some(p) => Self {
                authenticated: true,
                subject: Some(p.subject().to_string()),
                roles: p.roles().iter().map(|r| r.as_str().to_string()).collect(),
                permissions: p.sorted_permissions().into_iter().map(str::to_string).collect(),
            },
            None => Self {
                authenticated: false,
                subject: None,
                roles: Vec::new(),
                permissions: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_validation_collects_every_violation() {
        let req = CreateSupplierRequest {
            name: "   ".into(),
            contact_person: None,
            phone: Some("12ab".into()),
            email: Some("nobody".into()),
        };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["name", "phone", "email"]);
    }

    #[test]
    fn well_formed_supplier_passes() {
        let req = CreateSupplierRequest {
            name: "华东钢材".into(),
            contact_person: Some("王工".into()),
            phone: Some("+86 138-0000-0000".into()),
            email: Some("sales@example.com".into()),
        };
        assert!(req.validate().is_empty());
    }

    #[test]
    fn zero_adjustment_is_rejected() {
        let req = AdjustStockRequest { delta: 0, reason: None };
        assert_eq!(req.validate().len(), 1);
    }

    #[test]
    fn login_request_needs_both_fields_and_hides_password() {
        let req = LoginRequest { username: " ".into(), password: String::new() };
        let fields: Vec<_> = req.validate().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, ["username", "password"]);

        let req = LoginRequest { username: "admin".into(), password: "hunter2".into() };
        assert!(req.validate().is_empty());
        assert!(!format!("{req:?}").contains("hunter2"));
    }

    #[test]
    fn whoami_for_anonymous() {
        let who = WhoAmI::from_principal(None);
        assert!(!who.authenticated);
        assert!(who.permissions.is_empty());
    }
}
