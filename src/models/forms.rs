use crate::validation::forms::FormFields;
use serde::{Deserialize, Serialize};

// Missing fields deserialize as empty strings so the validator reports
// "This field is required." instead of axum rejecting the body.

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedbackForm {
    pub title: String,
    pub content: String,
}

impl FormFields for RegisterForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(&self.username),
            "password" => Some(&self.password),
            "email" => Some(&self.email),
            "first_name" => Some(&self.first_name),
            "last_name" => Some(&self.last_name),
            _ => None,
        }
    }
}

impl FormFields for LoginForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "username" => Some(&self.username),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

impl FormFields for FeedbackForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "content" => Some(&self.content),
            _ => None,
        }
    }
}
