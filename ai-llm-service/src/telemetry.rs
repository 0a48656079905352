use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Targets rendered by [`layer`]: this crate, the review core and the CLI.
pub const TARGET_PREFIXES: &[&str] = &["ai_llm_service", "doc_reviewer", "doc_review"];

/// RFC3339 UTC timer, e.g. `2025-09-12T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct ChronoRfc3339Utc;

impl FormatTime for ChronoRfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        let s = now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        w.write_str(&s)
    }
}

/// Formatting layer that renders only events emitted by the review stack.
///
/// - RFC3339 UTC timestamps
/// - compact single-line format with `file:line`
/// - span close events (durations of instrumented functions)
/// - ANSI colors only when stdout is a terminal
///
/// Compose it in the binary together with an [`EnvFilter`].
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let use_ansi = io::stdout().is_terminal();

    let ours = filter::filter_fn(|meta| is_review_target(meta.target()));

    fmt::layer()
        .with_timer(ChronoRfc3339Utc)
        .with_level(true)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(use_ansi)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(ours)
}

fn is_review_target(target: &str) -> bool {
    TARGET_PREFIXES.iter().any(|p| target.starts_with(p))
}

/// Level directives for every review-stack target, e.g. `doc_reviewer=debug`.
pub fn level_directives(level: Level) -> Vec<Directive> {
    let lvl = level.as_str().to_lowercase();
    TARGET_PREFIXES
        .iter()
        .filter_map(|p| Directive::from_str(&format!("{p}={lvl}")).ok())
        .collect()
}

/// `EnvFilter` from `RUST_LOG` (or `default`), with `level` applied to the review stack.
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    let base = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    level_directives(level)
        .into_iter()
        .fold(base, |f, d| f.add_directive(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_review_targets_only() {
        assert!(is_review_target("doc_reviewer::review"));
        assert!(is_review_target("ai_llm_service::services::open_ai_service"));
        assert!(!is_review_target("hyper::client"));
    }

    #[test]
    fn one_directive_per_target() {
        let ds = level_directives(Level::DEBUG);
        assert_eq!(ds.len(), TARGET_PREFIXES.len());
        assert!(
            ds.iter()
                .any(|d| d.to_string().to_lowercase() == "doc_reviewer=debug")
        );
    }
}
