//! Draft commands: `pending`, `confirm`, `posts`

use super::context::CliContext;
use super::error::HelpfulError;
use super::output::{color_for_status, format_time, print_json, print_json_status, print_table};
use anyhow::Result;
use tapeout::workflow::{confirm_pending, ConfirmOutcome};
use tapeout_db::{PostFilter, PostStatus};

#[derive(Debug)]
pub struct PendingArgs {
    pub json: bool,
}

#[derive(Debug)]
pub struct ConfirmArgs {
    pub json: bool,
}

#[derive(Debug)]
pub struct PostsArgs {
    pub design: Option<String>,
    pub status: Option<String>,
    pub limit: u32,
    pub json: bool,
}

pub async fn pending(ctx: &CliContext, args: PendingArgs) -> Result<()> {
    let draft = match ctx.open_existing_db().await? {
        Some(db) => {
            let draft = db.get_latest_pending().await;
            db.close().await;
            draft?
        }
        None => None,
    };

    let Some(draft) = draft else {
        if args.json {
            return print_json_status("no_pending_draft");
        }
        println!("No pending draft. Run 'tapeout check' to create one.");
        return Ok(());
    };

    if args.json {
        return print_json(&serde_json::json!({
            "status": "pending",
            "draft": draft,
        }));
    }

    println!("Pending draft #{} for {}", draft.id, draft.design_name);
    println!("Readiness score: {}", draft.readiness_score);
    println!("Created:         {}", format_time(draft.created_at));
    println!();
    println!("  {}", draft.content);
    println!();
    println!("Run 'tapeout confirm' to publish.");
    Ok(())
}

pub async fn confirm(ctx: &CliContext, args: ConfirmArgs) -> Result<()> {
    let publisher = ctx.publisher()?;
    // Without a store there is no draft; do not create one just to say so.
    let outcome = match ctx.open_existing_db().await? {
        Some(db) => {
            let outcome = confirm_pending(&db, &publisher).await;
            db.close().await;
            outcome?
        }
        None => ConfirmOutcome::NothingToConfirm,
    };
    if args.json {
        return print_json(&outcome);
    }

    match outcome {
        ConfirmOutcome::NothingToConfirm => {
            println!("Nothing to confirm: there is no pending draft.");
        }
        ConfirmOutcome::Published {
            post_id,
            design_name,
            external_id,
            recorded,
        } => {
            println!("Published draft #{} for {} (id: {})", post_id, design_name, external_id);
            if !recorded {
                println!("Warning: a newer draft was saved while publishing; it is still pending.");
            }
        }
    }
    Ok(())
}

pub async fn posts(ctx: &CliContext, args: PostsArgs) -> Result<()> {
    let status = match args.status.as_deref() {
        Some(value) => Some(PostStatus::parse(value).ok_or_else(|| HelpfulError::invalid_status(value))?),
        None => None,
    };
    let filter = PostFilter {
        design_name: args.design,
        status,
        limit: Some(args.limit),
    };

    let posts = match ctx.open_existing_db().await? {
        Some(db) => {
            let posts = db.list_posts(&filter).await;
            db.close().await;
            posts?
        }
        None => Vec::new(),
    };

    if args.json {
        return print_json(&serde_json::json!({
            "status": "ok",
            "posts": posts,
        }));
    }

    if posts.is_empty() {
        println!("No posts.");
        return Ok(());
    }

    let rows = posts
        .iter()
        .map(|p| {
            vec![
                (p.id.to_string(), None),
                (p.design_name.clone(), None),
                (p.status.to_string(), color_for_status(p.status.as_str())),
                (p.readiness_score.clone(), None),
                (format_time(p.created_at), None),
                (p.external_id.clone().unwrap_or_else(|| "-".to_string()), None),
                (preview(&p.content), None),
            ]
        })
        .collect();
    print_table(
        &["ID", "Design", "Status", "Score", "Created", "External ID", "Content"],
        rows,
    );
    Ok(())
}

fn preview(content: &str) -> String {
    const MAX: usize = 48;
    let line = content.lines().next().unwrap_or("");
    match line.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &line[..idx]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_first_line() {
        assert_eq!(preview("short\nsecond"), "short");
        let long = "a".repeat(60);
        assert_eq!(preview(&long), format!("{}...", "a".repeat(48)));
        assert_eq!(preview(""), "");
    }
}
