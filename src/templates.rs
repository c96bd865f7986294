use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

const TEMPLATES: &[(&str, &str)] = &[
    ("alert_triggered", include_str!("../templates/alert_triggered.hbs")),
    ("alert_created", include_str!("../templates/alert_created.hbs")),
    ("crypto_snapshot", include_str!("../templates/crypto_snapshot.hbs")),
    ("equity_snapshot", include_str!("../templates/equity_snapshot.hbs")),
    ("digest_crypto", include_str!("../templates/digest_crypto.hbs")),
    ("digest_stocks", include_str!("../templates/digest_stocks.hbs")),
    ("digest_news", include_str!("../templates/digest_news.hbs")),
    ("welcome", include_str!("../templates/welcome.hbs")),
    ("trending", include_str!("../templates/trending.hbs")),
    ("market_overview", include_str!("../templates/market_overview.hbs")),
];

pub fn build_handlebars() -> Result<Hbs, handlebars::TemplateError> {
    let mut hb = Handlebars::new();

    // chat messages are plain text
    hb.register_escape_fn(handlebars::no_escape);

    for (name, src) in TEMPLATES {
        hb.register_template_string(name, src)?;
    }

    Ok(Arc::new(hb))
}
