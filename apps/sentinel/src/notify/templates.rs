//! HTML bodies and subject lines for the digest and the "nothing today" email.

use chrono::NaiveDate;

use crate::models::job::ScoredJob;
use crate::notify::markdown::{escape_html, markdown_to_html};

/// Characters of description shown per card.
pub const DESCRIPTION_PREVIEW_CHARS: usize = 400;

pub fn display_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn digest_subject(count: usize, date: NaiveDate) -> String {
    format!("Job Hunter Daily Digest - {count} jobs ({})", display_date(date))
}

pub fn empty_subject(date: NaiveDate) -> String {
    format!("Job Hunter - no new jobs today ({})", display_date(date))
}

fn preview(description: &str) -> String {
    let trimmed = description.trim();
    if trimmed.chars().count() <= DESCRIPTION_PREVIEW_CHARS {
        return markdown_to_html(trimmed);
    }
    let cut: String = trimmed.chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
    format!("{}...", markdown_to_html(&cut))
}

fn render_job_card(scored: &ScoredJob) -> String {
    let job = &scored.job;
    let eval = &scored.evaluation;

    let url = if job.job_url.trim().is_empty() {
        "#".to_string()
    } else {
        escape_html(job.job_url.trim())
    };
    let title = escape_html(job.display_title());
    let company = escape_html(job.display_company());
    let location = escape_html(job.display_location());
    let site = job.site.as_str().to_uppercase();
    let description = preview(&job.description);

    let summary = if eval.summary.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<p style="margin: 0 0 12px 0; color: #0f766e; font-size: 14px;"><strong>AI summary:</strong> {}</p>"#,
            escape_html(eval.summary.trim())
        )
    };

    let description_block = if description.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div style="background-color: #f8fafc; padding: 12px; border-radius: 6px; margin-bottom: 12px;">
                <p style="margin: 0; color: #334155; font-size: 14px; line-height: 1.6;">{description}</p>
            </div>"#
        )
    };

    format!(
        r#"
        <div style="border: 1px solid #e2e8f0; border-radius: 8px; padding: 20px; margin-bottom: 20px; background-color: #ffffff;">
            <h2 style="margin: 0 0 12px 0; font-size: 20px; color: #1e293b;">
                <a href="{url}" style="color: #2563eb; text-decoration: none;">{title}</a>
            </h2>
            <div style="color: #64748b; font-size: 14px; margin-bottom: 8px;">
                <span style="font-weight: 600; color: #475569;">{company}</span> · {location}
            </div>
            <div style="color: #94a3b8; font-size: 12px; margin-bottom: 12px;">
                Source: {site} · Score: {score}/10
            </div>
            {summary}
            {description_block}
            <a href="{url}" style="display: inline-block; background-color: #2563eb; color: white; padding: 8px 16px; border-radius: 6px; text-decoration: none; font-size: 14px;">View posting →</a>
        </div>
        "#,
        score = eval.score,
    )
}

pub fn render_digest(jobs: &[ScoredJob], date: NaiveDate) -> String {
    let cards: String = jobs.iter().map(render_job_card).collect();
    let date = display_date(date);
    let count = jobs.len();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Job Hunter Daily Digest</title>
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif; background-color: #f1f5f9; margin: 0; padding: 20px;">
    <div style="max-width: 800px; margin: 0 auto; background-color: #ffffff; border-radius: 12px; overflow: hidden;">
        <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 30px; text-align: center;">
            <h1 style="color: white; margin: 0; font-size: 28px;">Job Hunter Sentinel</h1>
            <p style="color: #e0e7ff; margin: 8px 0 0 0; font-size: 16px;">Your daily picks · {date}</p>
        </div>
        <div style="padding: 20px; background-color: #f8fafc; border-bottom: 1px solid #e2e8f0;">
            <p style="margin: 0; color: #475569; font-size: 16px;">
                <strong style="color: #2563eb; font-size: 20px;">{count}</strong> new matching jobs today
            </p>
        </div>
        <div style="padding: 20px;">
{cards}
        </div>
        <div style="padding: 20px; background-color: #f8fafc; border-top: 1px solid #e2e8f0; text-align: center;">
            <p style="margin: 0; color: #64748b; font-size: 14px;">Sent automatically by Job Hunter Sentinel</p>
        </div>
    </div>
</body>
</html>
"#
    )
}

pub fn render_empty(date: NaiveDate) -> String {
    let date = display_date(date);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f1f5f9; padding: 20px;">
    <div style="max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 12px; padding: 30px;">
        <h1 style="color: #64748b; margin: 0 0 16px 0; font-size: 24px;">Job Hunter Sentinel</h1>
        <p style="color: #475569; font-size: 16px; line-height: 1.6;">No new matching jobs were found today ({date}).</p>
        <p style="color: #94a3b8; font-size: 14px; margin-top: 20px;">Monitoring continues; you will hear from us as soon as something turns up.</p>
    </div>
</body>
</html>
"#
    )
}
