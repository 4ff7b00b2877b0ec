//! Body rendering and message construction.
//!
//! Bodies are minijinja templates; variables missing from the context render
//! as empty strings. HTML templates auto-escape their variables, plain-text
//! templates do not.

use minijinja::{AutoEscape, Environment};
use serde_json::Value;

use crate::address::Address;
use crate::email::{ContentSubtype, Email};
use crate::links::LinkResolver;
use crate::model::Template;
use crate::params::{Context, TOKEN_KEY, URL_KEY};

/// Add the access URL when the context carries a token and a resolver is set.
///
/// A non-string token is used through its JSON representation.
pub fn inject_url(context: &mut Context, links: Option<&dyn LinkResolver>) {
    let Some(links) = links else {
        return;
    };
    let token = match context.get(TOKEN_KEY) {
        Some(Value::String(token)) => token.clone(),
        Some(other) => other.to_string(),
        None => return,
    };
    context.insert(URL_KEY.to_string(), Value::String(links.resolve(&token)));
}

/// Render a template body against a context.
///
/// HTML bodies auto-escape their variables. Plain-text bodies insert them
/// verbatim, so `&` or `<` in a name reaches the recipient unchanged.
pub fn render_body(source: &str, is_html: bool, context: &Context) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(move |_| {
        if is_html {
            AutoEscape::Html
        } else {
            AutoEscape::None
        }
    });
    let template = env.template_from_str(source)?;
    template.render(context)
}

/// Check a template body parses.
pub fn validate_body(source: &str) -> Result<(), minijinja::Error> {
    Environment::new().template_from_str(source).map(|_| ())
}

/// The outgoing bulk message for one envelope.
pub fn build_email(template: &Template, body: String, from: &Address, to: &str) -> Email {
    Email::new()
        .from(from)
        .to(to)
        .subject(&template.subject)
        .body(body)
        .subtype(ContentSubtype::from_html_flag(template.is_html))
        .bulk()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::SiteLinks;
    use crate::model::TemplateId;
    use serde_json::json;

    fn context(value: Value) -> Context {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_render_with_url() {
        let mut ctx = context(json!({ "nom_destinataire": "nom dest1", "token": "T" }));
        let links = SiteLinks::new("example.com", "/acces/{token}");
        inject_url(&mut ctx, Some(&links));

        let body = render_body("{{ nom_destinataire }}{{ url }}", false, &ctx).unwrap();
        assert_eq!(body, "nom dest1http://example.com/acces/T");
    }

    #[test]
    fn test_no_resolver_leaves_url_empty() {
        let mut ctx = context(json!({ "nom_destinataire": "nom dest1", "token": "T" }));
        inject_url(&mut ctx, None);
        assert!(!ctx.contains_key(URL_KEY));

        let body = render_body("{{ nom_destinataire }}{{ url }}", false, &ctx).unwrap();
        assert_eq!(body, "nom dest1");
    }

    #[test]
    fn test_no_token_no_url() {
        let mut ctx = context(json!({ "nom_destinataire": "x" }));
        let links = SiteLinks::new("example.com", "/acces/{token}");
        inject_url(&mut ctx, Some(&links));
        assert!(!ctx.contains_key(URL_KEY));
    }

    #[test]
    fn test_html_escaping() {
        let ctx = context(json!({ "name": "<b>&" }));
        assert_eq!(render_body("{{ name }}", true, &ctx).unwrap(), "&lt;b&gt;&amp;");
        assert_eq!(render_body("{{ name }}", false, &ctx).unwrap(), "<b>&");
    }

    #[test]
    fn test_syntax_error() {
        assert!(validate_body("{{ unclosed").is_err());
        assert!(render_body("{% if %}", false, &Context::new()).is_err());
    }

    #[test]
    fn test_build_email() {
        let template = Template {
            id: TemplateId(1),
            code: "mod_test".into(),
            subject: "sujet_modele".into(),
            body: String::new(),
            is_html: true,
        };
        let email = build_email(&template, "<p>x</p>".into(), &"expediteur@test.org".into(), "dest1@test.org");

        assert_eq!(email.subject, "sujet_modele");
        assert_eq!(email.to[0].email, "dest1@test.org");
        assert_eq!(email.subtype, ContentSubtype::Html);
        assert_eq!(email.headers.get("Precedence").map(String::as_str), Some("bulk"));
    }
}
