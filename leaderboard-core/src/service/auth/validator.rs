use super::{jwt::JwtService, Claims};
use crate::{models::MemberId, Error, Result};
use std::sync::Arc;

/// Bearer credential validation for HTTP requests
#[derive(Clone)]
pub struct JwtValidator {
    jwt_service: Arc<JwtService>,
}

impl JwtValidator {
    #[must_use]
    pub const fn new(jwt_service: Arc<JwtService>) -> Self {
        Self { jwt_service }
    }

    /// Extract bearer token from Authorization header value
    ///
    /// Supports both "Bearer <token>" and "bearer <token>" formats.
    pub fn extract_bearer_token(auth_value: &str) -> Result<String> {
        let token = auth_value
            .strip_prefix("Bearer ")
            .or_else(|| auth_value.strip_prefix("bearer "))
            .ok_or_else(|| {
                Error::Authentication("Authorization header must start with 'Bearer '".to_string())
            })?
            .trim();

        if token.is_empty() {
            return Err(Error::Authentication("Bearer token is empty".to_string()));
        }
        Ok(token.to_string())
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        self.jwt_service.verify_token(token)
    }

    /// Validate an Authorization header value and resolve the member
    pub fn validate_http(&self, auth_header: &str) -> Result<MemberId> {
        let token = Self::extract_bearer_token(auth_header)?;
        Ok(self.validate_token(&token)?.member_id())
    }
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JwtConfig;

    fn validator() -> (JwtValidator, Arc<JwtService>) {
        let jwt = Arc::new(
            JwtService::new(&JwtConfig {
                secret: "validator-secret".to_string(),
                ..JwtConfig::default()
            })
            .unwrap(),
        );
        (JwtValidator::new(jwt.clone()), jwt)
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(JwtValidator::extract_bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(JwtValidator::extract_bearer_token("bearer abc").unwrap(), "abc");
        assert!(JwtValidator::extract_bearer_token("Basic abc").is_err());
        assert!(JwtValidator::extract_bearer_token("Bearer ").is_err());
    }

    #[test]
    fn test_validate_http_resolves_member() {
        let (validator, jwt) = validator();
        let token = jwt.sign_token(&MemberId::from("bob")).unwrap();

        let member = validator.validate_http(&format!("Bearer {token}")).unwrap();
        assert_eq!(member.as_str(), "bob");
        assert!(validator.validate_http(&token).is_err());
    }
}
