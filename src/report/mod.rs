//! Presentation of the summary document.

pub mod summary;

use std::{fmt::Write, path::Path};

use ansi_term::{Colour, Style};
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::{
    fs::operations::{read_json, JsonFile},
    utils::{percentage::Percentage, time::format_seconds},
};

use summary::{AppSummary, Summary, Totals};

const BAR_WIDTH: usize = 30;
const NAME_WIDTH: usize = 28;

#[async_trait]
pub trait Presenter: Send + Sync {
    async fn display(&self, summary_path: &Path) -> Result<()>;
}

/// Prints the summary as a colored report on stdout.
#[derive(Debug, Default)]
pub struct TerminalPresenter {
    pub colored: bool,
}

impl TerminalPresenter {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    fn paint(&self, style: Style, text: &str) -> String {
        if self.colored {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn render(&self, summary: &Summary) -> String {
        let mut out = String::new();
        let totals = &summary.summary;
        let heading = Style::new().bold();

        let _ = writeln!(out, "{}", self.paint(heading, "Productivity Report"));
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.paint(heading.underline(), "Summary"));
        let _ = writeln!(out, "  Total time:        {}", format_seconds(totals.total_time));
        let _ = writeln!(
            out,
            "  Productive time:   {}",
            format_seconds(totals.productive_time)
        );
        let _ = writeln!(
            out,
            "  Unproductive time: {}",
            format_seconds(totals.unproductive_time)
        );
        let score = reported_score(totals);
        let _ = writeln!(
            out,
            "  Productivity:      {} {}",
            self.paint(score_colour(score).normal(), &score.bar(BAR_WIDTH)),
            self.paint(score_colour(score).bold(), &score.to_string())
        );

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.paint(heading.underline(), "App usage"));
        if summary.apps.is_empty() {
            let _ = writeln!(out, "  No applications analyzed yet");
        }
        for app in &summary.apps {
            let _ = writeln!(out, "  {}", self.app_line(app));
        }

        if !summary.insights.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", self.paint(heading.underline(), "Key insights"));
            for insight in &summary.insights {
                let _ = writeln!(out, "  • {insight}");
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} {}",
            self.paint(Colour::Green.bold(), "Productive keywords:"),
            summary.productive_keywords.join(", ")
        );
        let _ = writeln!(
            out,
            "{} {}",
            self.paint(Colour::Red.bold(), "Unproductive keywords:"),
            summary.unproductive_keywords.join(", ")
        );
        out
    }

    fn app_line(&self, app: &AppSummary) -> String {
        let name: String = app.app_name.chars().take(NAME_WIDTH).collect();
        format!(
            "{name:<NAME_WIDTH$} {} {}",
            self.paint(
                Colour::Green.normal(),
                &format!("{:>10}", format_seconds(app.productive.total_time_spent))
            ),
            self.paint(
                Colour::Red.normal(),
                &format!("{:>10}", format_seconds(app.unproductive.total_time_spent))
            ),
        )
    }
}

/// The model's score, or the share of productive time when the score is missing, invalid or a
/// bare zero next to recorded time.
fn reported_score(totals: &Totals) -> Percentage {
    totals
        .productivity_score
        .filter(|v| *v > 0. || totals.total_time <= 0.)
        .and_then(Percentage::new_opt)
        .unwrap_or_else(|| Percentage::share(totals.productive_time, totals.total_time))
}

fn score_colour(score: Percentage) -> Colour {
    if *score >= 80. {
        Colour::Green
    } else if *score >= 60. {
        Colour::Yellow
    } else {
        Colour::Red
    }
}

#[async_trait]
impl Presenter for TerminalPresenter {
    async fn display(&self, summary_path: &Path) -> Result<()> {
        let summary = match read_json::<Summary>(summary_path).await? {
            JsonFile::Loaded(v) => v,
            JsonFile::Missing => {
                return Err(anyhow!(
                    "No summary at {summary_path:?} yet. Run the analysis first"
                ))
            }
            JsonFile::Corrupt(e) => return Err(anyhow!("Summary {summary_path:?} is invalid: {e}")),
        };
        println!("{}", self.render(&summary));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{
        summary::{AppSummary, Summary, Totals, Usage},
        Presenter, TerminalPresenter,
    };

    fn summary() -> Summary {
        Summary {
            summary: Totals {
                total_time: 3725.,
                productive_time: 3000.,
                unproductive_time: 725.,
                productivity_score: Some(80.5),
            },
            apps: vec![AppSummary {
                app_name: "VS Code".into(),
                productive: Usage {
                    total_time_spent: 3000.,
                    longest_session: 1200.,
                    last_active: None,
                },
                unproductive: Usage::default(),
            }],
            insights: vec!["Long focused stretches in the morning".into()],
            productive_keywords: vec!["rust".into(), "docs".into()],
            unproductive_keywords: vec!["memes".into()],
        }
    }

    #[test]
    fn test_render_plain() {
        let text = TerminalPresenter::new(false).render(&summary());
        assert!(text.contains("Total time:        1h2m5s"));
        assert!(text.contains("80.5%"));
        assert!(text.contains("VS Code"));
        assert!(text.contains("• Long focused stretches in the morning"));
        assert!(text.contains("Productive keywords: rust, docs"));
        assert!(text.contains("Unproductive keywords: memes"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_render_empty() {
        let text = TerminalPresenter::new(false).render(&Summary::default());
        assert!(text.contains("No applications analyzed yet"));
        assert!(text.contains("0.0%"));
    }

    #[test]
    fn test_missing_score_uses_time_share() {
        let mut summary = summary();
        summary.summary.total_time = 120.;
        summary.summary.productive_time = 90.;

        summary.summary.productivity_score = None;
        let text = TerminalPresenter::new(false).render(&summary);
        assert!(text.contains("75.0%"));

        summary.summary.productivity_score = Some(0.);
        let text = TerminalPresenter::new(false).render(&summary);
        assert!(text.contains("75.0%"));

        summary.summary.productive_time = 0.;
        let text = TerminalPresenter::new(false).render(&summary);
        assert!(text.contains("0.0%"));
    }

    #[tokio::test]
    async fn test_display_missing_summary() -> Result<()> {
        let dir = tempdir()?;
        let result = TerminalPresenter::new(false)
            .display(&dir.path().join("user_data.json"))
            .await;
        assert!(result.is_err());
        Ok(())
    }
}
