//! HTML pages.
//!
//! Every page goes through [`layout`], which renders the navigation for the
//! current viewer and any pending flash messages. Forms are rendered from
//! their [`FormSpec`] so labels, input types and error placement always
//! match what the validator checks.

use crate::core::routes::{
    add_feedback_path, delete_feedback_path, delete_user_path, profile_path, update_feedback_path,
};
use crate::models::{feedback::Feedback, user::User};
use crate::utils::html::escape;
use crate::validation::forms::{
    FieldErrors, FieldKind, FormFields, FormSpec, FEEDBACK_FORM, LOGIN_FORM, REGISTER_FORM,
};
use axum::{http::StatusCode, response::Html};

pub fn layout(title: &str, viewer: Option<&str>, flashes: &[String], body: &str) -> Html<String> {
    let nav = match viewer {
        Some(username) => format!(
            r#"<a href="{}">{}</a> <a href="/logout">Log out</a>"#,
            escape(&profile_path(username)),
            escape(username)
        ),
        None => r#"<a href="/register">Register</a> <a href="/login">Log in</a>"#.to_string(),
    };

    let flashes: String = flashes
        .iter()
        .map(|message| format!(r#"<div class="flash">{}</div>"#, escape(message)))
        .collect();

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<nav>{nav}</nav>\n{flashes}\n<main>\n<h1>{title}</h1>\n{body}\n</main>\n</body>\n</html>\n",
        title = escape(title),
        nav = nav,
        flashes = flashes,
        body = body,
    ))
}

/// Render `spec` as an HTML form. Password values are never echoed back.
pub fn render_form(
    spec: &FormSpec,
    values: &dyn FormFields,
    errors: &FieldErrors,
    action: &str,
    submit_label: &str,
) -> String {
    let mut html = format!(r#"<form method="POST" action="{}">"#, escape(action));
    html.push('\n');

    for field in spec.fields {
        let value = match field.kind {
            FieldKind::Password => "",
            _ => values.field(field.name).unwrap_or(""),
        };

        html.push_str(&format!(
            r#"<p><label for="{name}">{label}</label> "#,
            name = field.name,
            label = escape(field.label)
        ));

        if field.kind == FieldKind::TextArea {
            html.push_str(&format!(
                r#"<textarea id="{name}" name="{name}">{value}</textarea>"#,
                name = field.name,
                value = escape(value)
            ));
        } else {
            html.push_str(&format!(
                r#"<input type="{kind}" id="{name}" name="{name}" value="{value}">"#,
                kind = field.kind.input_type(),
                name = field.name,
                value = escape(value)
            ));
        }

        for message in errors.for_field(field.name) {
            html.push_str(&format!(r#" <span class="error">{}</span>"#, escape(message)));
        }

        html.push_str("</p>\n");
    }

    html.push_str(&format!(r#"<button type="submit">{}</button></form>"#, escape(submit_label)));
    html
}

pub fn register_page(
    values: &dyn FormFields,
    errors: &FieldErrors,
    flashes: &[String],
) -> Html<String> {
    let form = render_form(&REGISTER_FORM, values, errors, "/register", "Register");
    layout("Register", None, flashes, &form)
}

pub fn login_page(values: &dyn FormFields, errors: &FieldErrors, flashes: &[String]) -> Html<String> {
    let form = render_form(&LOGIN_FORM, values, errors, "/login", "Log in");
    layout("Log in", None, flashes, &form)
}

pub fn profile_page(user: &User, feedback: &[Feedback], flashes: &[String]) -> Html<String> {
    let mut body = format!(
        "<ul>\n<li>Username: {}</li>\n<li>Email: {}</li>\n<li>First name: {}</li>\n<li>Last name: {}</li>\n</ul>\n",
        escape(&user.username),
        escape(&user.email),
        escape(&user.first_name),
        escape(&user.last_name),
    );

    body.push_str("<h2>Feedback</h2>\n");
    if feedback.is_empty() {
        body.push_str("<p>No feedback yet.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for item in feedback {
            body.push_str(&format!(
                r#"<li><h3>{title}</h3><p>{content}</p><a href="{edit}">Edit</a> <a href="{delete}">Delete</a></li>"#,
                title = escape(&item.title),
                content = escape(&item.content),
                edit = update_feedback_path(item.id),
                delete = delete_feedback_path(item.id),
            ));
            body.push('\n');
        }
        body.push_str("</ul>\n");
    }

    body.push_str(&format!(
        r#"<p><a href="{}">Add feedback</a></p><p><a href="{}">Delete account</a></p>"#,
        escape(&add_feedback_path(&user.username)),
        escape(&delete_user_path(&user.username)),
    ));

    layout(&user.full_name(), Some(&user.username), flashes, &body)
}

pub fn add_feedback_page(
    username: &str,
    values: &dyn FormFields,
    errors: &FieldErrors,
    flashes: &[String],
) -> Html<String> {
    let form = render_form(&FEEDBACK_FORM, values, errors, &add_feedback_path(username), "Add");
    layout("Add feedback", Some(username), flashes, &form)
}

pub fn edit_feedback_page(
    feedback: &Feedback,
    values: &dyn FormFields,
    errors: &FieldErrors,
    flashes: &[String],
) -> Html<String> {
    let form = render_form(
        &FEEDBACK_FORM,
        values,
        errors,
        &update_feedback_path(feedback.id),
        "Save",
    );
    layout("Edit feedback", Some(&feedback.username), flashes, &form)
}

pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    let title = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    layout(&title, None, &[], &format!("<p>{}</p>", escape(message)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forms::{FeedbackForm, RegisterForm};

    #[test]
    fn test_register_page_escapes_values_and_hides_password() {
        let form = RegisterForm {
            username: "<b>bob</b>".to_string(),
            password: "secret123".to_string(),
            ..Default::default()
        };
        let mut errors = FieldErrors::new();
        errors.add("email", "This field is required.");

        let Html(html) = register_page(&form, &errors, &[]);

        assert!(html.contains("&lt;b&gt;bob&lt;/b&gt;"));
        assert!(!html.contains("<b>bob</b>"));
        assert!(!html.contains("secret123"));
        assert!(html.contains(r#"<span class="error">This field is required.</span>"#));
        assert!(html.contains(r#"type="email""#));
    }

    #[test]
    fn test_profile_lists_feedback_with_links() {
        let user = User::new(
            "alice".to_string(),
            "hash".to_string(),
            "alice@example.com".to_string(),
            "Alice".to_string(),
            "Liddell".to_string(),
        );
        let feedback = vec![Feedback::new(
            7,
            "Great".to_string(),
            "Loved it".to_string(),
            "alice".to_string(),
        )];

        let Html(html) = profile_page(&user, &feedback, &["User Added".to_string()]);

        assert!(html.contains("Alice Liddell"));
        assert!(html.contains("/feedback/7/update"));
        assert!(html.contains("/feedback/7/delete"));
        assert!(html.contains("/users/alice/feedback/add"));
        assert!(html.contains(r#"<div class="flash">User Added</div>"#));
        assert!(!html.contains("hash"));
    }

    #[test]
    fn test_feedback_form_renders_textarea() {
        let form = FeedbackForm {
            title: "Title".to_string(),
            content: "Body & soul".to_string(),
        };
        let Html(html) = add_feedback_page("alice", &form, &FieldErrors::new(), &[]);

        assert!(html.contains("<textarea"));
        assert!(html.contains("Body &amp; soul"));
        assert!(html.contains(r#"action="/users/alice/feedback/add""#));
    }

    #[test]
    fn test_error_page_title() {
        let Html(html) = error_page(StatusCode::UNAUTHORIZED, "nope");
        assert!(html.contains("401 Unauthorized"));
    }
}
