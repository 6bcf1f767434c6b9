use oauth_engine::LoginPrompt;
use tera::{Context, Tera};

pub const LOGIN_TEMPLATE: &str = "oauth/login.html";

const LOGIN_HTML: &str = include_str!("../templates/oauth/login.html");

/// Builds the template engine with the embedded templates
pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(LOGIN_TEMPLATE, LOGIN_HTML)?;
    Ok(tera)
}

pub fn render_login(tera: &Tera, prompt: &LoginPrompt) -> Result<String, tera::Error> {
    let mut context = Context::new();
    context.insert("action", &prompt.action);
    context.insert("title", &prompt.title);
    context.insert("csrf_token", &prompt.csrf_token);
    tera.render(LOGIN_TEMPLATE, &context)
}
