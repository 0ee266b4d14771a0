use crate::structs::{ConnectRequest, FormRequirements, SecurityClass};

/// Credentials typed into the form for the selected network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The network currently being configured, together with what its form needs.
///
/// The controller owns at most one of these at a time. It knows nothing about
/// transport: it only decides which fields are mandatory and how they map
/// onto a connect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionContext {
    ssid: String,
    security: SecurityClass,
    credentials: Credentials,
}

impl SelectionContext {
    pub fn open(ssid: impl Into<String>, open: bool, enterprise: bool) -> Self {
        Self {
            ssid: ssid.into(),
            security: SecurityClass::from_flags(open, enterprise),
            credentials: Credentials::default(),
        }
    }

    /// Discards the context held in `slot`, if any, along with its credentials.
    pub fn close(slot: &mut Option<SelectionContext>) {
        if let Some(mut context) = slot.take() {
            context.clear_credentials();
        }
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn security(&self) -> SecurityClass {
        self.security
    }

    pub fn requirements(&self) -> FormRequirements {
        self.security.requirements()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.credentials.username = Some(username.into());
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.credentials.password = Some(password.into());
    }

    pub fn clear_credentials(&mut self) {
        self.credentials = Credentials::default();
    }

    /// Builds the connect payload.
    ///
    /// Fields the form does not ask for are never sent, even if something
    /// was typed into them: an open network always goes out with an empty
    /// `pass`, and only enterprise targets carry `user` and `enterprise`.
    pub fn build_request(&self) -> ConnectRequest {
        let requirements = self.requirements();
        let pass = if requirements.password {
            self.credentials.password.clone().unwrap_or_default()
        } else {
            String::new()
        };

        let mut request = ConnectRequest {
            ssid: self.ssid.clone(),
            pass,
            user: None,
            enterprise: None,
        };
        if self.security == SecurityClass::Enterprise {
            request.user = Some(self.credentials.username.clone().unwrap_or_default());
            request.enterprise = Some("true".to_string());
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn open_network_requires_nothing() {
        let context = SelectionContext::open("Cafe", true, false);
        let requirements = context.requirements();
        assert_eq!(context.security(), SecurityClass::Open);
        assert!(!requirements.username);
        assert!(!requirements.password);
    }

    #[test]
    fn open_network_request_has_empty_pass_and_no_enterprise_fields() {
        let mut context = SelectionContext::open("Cafe", true, false);
        context.set_username("ignored");
        context.set_password("ignored");

        let body = serde_json::to_value(context.build_request()).unwrap();
        assert_eq!(body, json!({"ssid": "Cafe", "pass": ""}));
    }

    #[test]
    fn secured_request_carries_password_only() {
        let mut context = SelectionContext::open("Home", false, false);
        context.set_password("hunter22");

        let body = serde_json::to_value(context.build_request()).unwrap();
        assert_eq!(body, json!({"ssid": "Home", "pass": "hunter22"}));
    }

    #[test]
    fn enterprise_request_adds_user_and_flag() {
        let mut context = SelectionContext::open("Corp", true, true);
        context.set_username("alice@corp.example");
        context.set_password("s3cret");

        let request = context.build_request();
        assert!(request.is_enterprise());
        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({
                "ssid": "Corp",
                "pass": "s3cret",
                "user": "alice@corp.example",
                "enterprise": "true"
            })
        );
    }

    #[test]
    fn close_is_a_no_op_without_context() {
        let mut slot: Option<SelectionContext> = None;
        SelectionContext::close(&mut slot);
        assert!(slot.is_none());

        let mut slot = Some(SelectionContext::open("Home", false, false));
        SelectionContext::close(&mut slot);
        SelectionContext::close(&mut slot);
        assert!(slot.is_none());
    }
}
