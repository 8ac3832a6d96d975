// Authorization models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::auth::token::TokenService;

/// Role claim carried in access tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything the admin extractor needs, shared through router state
#[derive(Clone)]
pub struct AuthSettings {
    pub tokens: Arc<TokenService>,
    /// Lower-cased addresses granted admin rights regardless of role claim
    admin_emails: Arc<Vec<String>>,
}

impl AuthSettings {
    pub fn new(tokens: TokenService, admin_emails: Vec<String>) -> Self {
        let admin_emails = admin_emails
            .into_iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            tokens: Arc::new(tokens),
            admin_emails: Arc::new(admin_emails),
        }
    }

    /// Admin if the role claim says so or the email is allow-listed
    pub fn is_admin(&self, role: Role, email: &str) -> bool {
        role == Role::Admin || self.admin_emails.contains(&email.trim().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_by_role_or_email_list() {
        let settings = AuthSettings::new(
            TokenService::new("secret".to_string()),
            vec![" Owner@Example.com ".to_string(), "".to_string()],
        );

        assert!(settings.is_admin(Role::Admin, "anyone@example.com"));
        assert!(settings.is_admin(Role::Customer, "owner@example.com"));
        assert!(!settings.is_admin(Role::Customer, "someone@example.com"));
        assert!(!settings.is_admin(Role::Customer, ""));
    }
}
