use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use page_enhancer::navigation::NavigationLog;
use page_enhancer::{
    format_currency, format_date, EnhancerConfig, FixedAnswer, Locale, Page, PageEnhancer,
};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

const USAGE: &str = "usage:
  page-enhancer <page.html> [--base-url URL] [--settle] [--confirm yes|no] [--click SELECTOR]...
  page-enhancer format-date <date> [--locale en-US|en-GB|de-DE]
  page-enhancer format-currency <amount>";

#[derive(Debug)]
struct EnhanceArgs {
    path: PathBuf,
    base_url: Option<Url>,
    settle: bool,
    confirm: bool,
    clicks: Vec<String>,
}

fn main() -> Result<()> {
    let subscriber_result = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if subscriber_result.is_err() {
        // tracing was already initialised; continue silently
    }

    let config_path = std::env::var("PAGE_ENHANCER_CONFIG").ok().map(PathBuf::from);
    let config = EnhancerConfig::load(config_path).context("failed to load enhancer config")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("-h") | Some("--help") => {
            println!("{USAGE}");
            Ok(())
        }
        Some("format-date") => {
            let input = args.get(1).ok_or_else(|| anyhow!("format-date needs a date\n{USAGE}"))?;
            let locale = match flag_value(&args[2..], "--locale") {
                Some(raw) => raw.parse::<Locale>()?,
                None => config.locale,
            };
            println!("{}", format_date(input, locale)?);
            Ok(())
        }
        Some("format-currency") => {
            let raw = args
                .get(1)
                .ok_or_else(|| anyhow!("format-currency needs an amount\n{USAGE}"))?;
            let amount: f64 = raw
                .parse()
                .with_context(|| format!("'{raw}' is not a number"))?;
            println!("{}", format_currency(amount));
            Ok(())
        }
        Some(_) => {
            let enhance_args = parse_enhance_args(&args)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start tokio runtime")?;
            runtime.block_on(enhance(enhance_args, config))
        }
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
        .map(String::as_str)
}

fn parse_enhance_args(args: &[String]) -> Result<EnhanceArgs> {
    let mut parsed = EnhanceArgs {
        path: PathBuf::from(&args[0]),
        base_url: None,
        settle: false,
        confirm: true,
        clicks: Vec::new(),
    };

    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--settle" => parsed.settle = true,
            "--base-url" => {
                let raw = rest.next().ok_or_else(|| anyhow!("--base-url needs a value"))?;
                parsed.base_url = Some(Url::parse(raw).with_context(|| format!("invalid base URL '{raw}'"))?);
            }
            "--confirm" => {
                parsed.confirm = match rest.next().map(String::as_str) {
                    Some("yes") => true,
                    Some("no") => false,
                    other => bail!("--confirm expects yes or no, got {other:?}"),
                };
            }
            "--click" => {
                let selector = rest.next().ok_or_else(|| anyhow!("--click needs a selector"))?;
                parsed.clicks.push(selector.clone());
            }
            other => bail!("unexpected argument '{other}'\n{USAGE}"),
        }
    }
    Ok(parsed)
}

async fn enhance(args: EnhanceArgs, config: EnhancerConfig) -> Result<()> {
    let html = fs::read_to_string(&args.path)
        .with_context(|| format!("failed to read {}", args.path.display()))?;
    let (rendered, report) = render(&html, &args, config).await?;

    println!("{rendered}");
    eprintln!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Enhance `html`, replay the requested clicks and collect the report.
async fn render(html: &str, args: &EnhanceArgs, config: EnhancerConfig) -> Result<(String, Value)> {
    let base_url = args.base_url.clone().unwrap_or_else(|| config.base_url.clone());

    let navigations = Rc::new(NavigationLog::new());
    let page = Page::parse(html, base_url, navigations.clone())?;
    let enhancer = PageEnhancer::bootstrap(config, Rc::new(FixedAnswer(args.confirm)));

    let summary = enhancer.enhance(&page);
    for selector in &args.clicks {
        let target = page
            .select_first(selector)?
            .ok_or_else(|| anyhow!("nothing matches --click '{selector}'"))?;
        let outcome = page.click(&target);
        info!(%selector, prevented = outcome.default_prevented, "clicked");
    }
    if args.settle {
        let ran = page.settle().await;
        info!(timers = ran, "settled pending timers");
    }

    let report = json!({
        "summary": summary,
        "mutations": page.drain_mutations(),
        "navigations": navigations.take(),
        "pending_timers": page.pending_timers(),
    });
    Ok((page.to_html(), report))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELETE_PAGE: &str = r#"<form method="post" action="/students/4/delete/">
    <button id="delete" type="submit" class="btn btn-outline-danger">Delete</button>
</form>"#;

    fn args(line: &[&str]) -> EnhanceArgs {
        let owned: Vec<String> = line.iter().map(|arg| arg.to_string()).collect();
        parse_enhance_args(&owned).unwrap()
    }

    fn navigation_count(report: &Value) -> usize {
        report["navigations"].as_array().map(Vec::len).unwrap_or_default()
    }

    #[test]
    fn parses_repeated_clicks() {
        let parsed = args(&["page.html", "--confirm", "no", "--click", "#a", "--click", "#b"]);
        assert!(!parsed.confirm);
        assert_eq!(parsed.clicks, vec!["#a".to_string(), "#b".to_string()]);

        let missing = parse_enhance_args(&["page.html".to_string(), "--click".to_string()]);
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn confirm_answer_decides_clicked_delete() {
        let declined = args(&["page.html", "--confirm", "no", "--click", "#delete"]);
        let (_, report) = render(DELETE_PAGE, &declined, EnhancerConfig::default()).await.unwrap();
        assert_eq!(navigation_count(&report), 0);

        let accepted = args(&["page.html", "--confirm", "yes", "--click", "#delete"]);
        let (_, report) = render(DELETE_PAGE, &accepted, EnhancerConfig::default()).await.unwrap();
        assert_eq!(navigation_count(&report), 1);
    }

    #[tokio::test]
    async fn unmatched_click_is_an_error() {
        let parsed = args(&["page.html", "--click", "#missing"]);
        assert!(render(DELETE_PAGE, &parsed, EnhancerConfig::default()).await.is_err());
    }
}
