//! Declarative form definitions and the pure validator that checks request
//! data against them.
//!
//! Each form is a static [`FormSpec`] listing its fields and the rules that
//! apply to each one. [`validate`] walks the spec in order and collects every
//! failure into [`FieldErrors`]; handlers re-render the form with those
//! messages and never touch the store when validation fails.

use validator::ValidateEmail;

/// How a field is rendered as an HTML input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Password,
    Email,
    TextArea,
}

impl FieldKind {
    pub fn input_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::TextArea => "text",
            FieldKind::Password => "password",
            FieldKind::Email => "email",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present and non-empty. Stops the remaining rules for the field when it fails.
    Required,
    /// Bounds on the number of characters (not bytes)
    Length { min: Option<usize>, max: Option<usize> },
    Email,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub rules: &'static [Rule],
}

#[derive(Debug)]
pub struct FormSpec {
    pub fields: &'static [FieldSpec],
}

pub const REQUIRED_MESSAGE: &str = "This field is required.";
pub const EMAIL_MESSAGE: &str = "Invalid email address.";

const USERNAME: FieldSpec = FieldSpec {
    name: "username",
    label: "Username",
    kind: FieldKind::Text,
    rules: &[Rule::Required, Rule::Length { min: Some(1), max: Some(20) }],
};

const PASSWORD: FieldSpec = FieldSpec {
    name: "password",
    label: "Password",
    kind: FieldKind::Password,
    rules: &[Rule::Required, Rule::Length { min: Some(6), max: Some(15) }],
};

pub static REGISTER_FORM: FormSpec = FormSpec {
    fields: &[
        USERNAME,
        PASSWORD,
        FieldSpec {
            name: "email",
            label: "Email",
            kind: FieldKind::Email,
            rules: &[Rule::Required, Rule::Email],
        },
        FieldSpec {
            name: "first_name",
            label: "First Name",
            kind: FieldKind::Text,
            rules: &[Rule::Required, Rule::Length { min: None, max: Some(30) }],
        },
        FieldSpec {
            name: "last_name",
            label: "Last Name",
            kind: FieldKind::Text,
            rules: &[Rule::Required, Rule::Length { min: None, max: Some(30) }],
        },
    ],
};

pub static LOGIN_FORM: FormSpec = FormSpec {
    fields: &[USERNAME, PASSWORD],
};

pub static FEEDBACK_FORM: FormSpec = FormSpec {
    fields: &[
        FieldSpec {
            name: "title",
            label: "Title",
            kind: FieldKind::Text,
            rules: &[Rule::Required, Rule::Length { min: None, max: Some(50) }],
        },
        FieldSpec {
            name: "content",
            label: "Content",
            kind: FieldKind::TextArea,
            rules: &[Rule::Required],
        },
    ],
};

/// Access to submitted values by field name
pub trait FormFields {
    fn field(&self, name: &str) -> Option<&str>;
}

/// Field-level error messages, in form order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push((field.to_string(), message.into()));
    }

    /// Build a single-error set, e.g. for store constraint violations
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.errors
            .iter()
            .filter(move |(name, _)| name == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }
}

/// Check `input` against every rule in `spec`
pub fn validate<F: FormFields + ?Sized>(spec: &FormSpec, input: &F) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    for field in spec.fields {
        let value = input.field(field.name).unwrap_or("");

        for rule in field.rules {
            if let Err(message) = check_rule(*rule, value) {
                errors.add(field.name, message);
                if *rule == Rule::Required {
                    break;
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_rule(rule: Rule, value: &str) -> Result<(), String> {
    match rule {
        Rule::Required => {
            if value.is_empty() {
                return Err(REQUIRED_MESSAGE.to_string());
            }
        }
        Rule::Length { min, max } => {
            let len = value.chars().count();
            let too_short = min.is_some_and(|min| len < min);
            let too_long = max.is_some_and(|max| len > max);

            if !too_short && !too_long {
                return Ok(());
            }

            return Err(match (min, max) {
                (Some(min), Some(max)) => {
                    format!("Field must be between {} and {} characters long.", min, max)
                }
                (None, Some(max)) => format!("Field cannot be longer than {} characters.", max),
                (Some(min), None) => format!("Field must be at least {} characters long.", min),
                (None, None) => return Ok(()),
            });
        }
        Rule::Email => {
            if !is_valid_email(value) {
                return Err(EMAIL_MESSAGE.to_string());
            }
        }
    }

    Ok(())
}

/// RFC 5322 syntax (internationalized domains included) with a dotted domain,
/// so bare hosts like `alice@localhost` are rejected
fn is_valid_email(value: &str) -> bool {
    value.validate_email()
        && value
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}
