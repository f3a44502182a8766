//! pinboard docs commands

use serde::Serialize;

use crate::document::{Document, DocumentLoader, DocumentMeta};
use crate::error::{Error, Result};
use crate::markdown;
use crate::output::{emit_success, HumanOutput};

use super::Context;

#[derive(Serialize)]
struct DocsListOutput {
    root: String,
    total: usize,
    documents: Vec<DocumentMeta>,
}

#[derive(Serialize)]
struct DocShowOutput {
    #[serde(flatten)]
    document: Document,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
}

pub fn run_list(ctx: &Context) -> Result<()> {
    let loader = DocumentLoader::new(&ctx.docs_root);
    let documents = loader.list_all()?;

    let mut human = HumanOutput::new("Documents");
    human.push_summary("Root", ctx.docs_root.display().to_string());
    human.push_summary("Total", documents.len().to_string());
    if documents.is_empty() && !ctx.docs_root.is_dir() {
        human.push_warning(format!(
            "documents root {} does not exist",
            ctx.docs_root.display()
        ));
    }
    for doc in &documents {
        human.push_detail(format!(
            "{}  {}  ({})",
            doc.slug,
            doc.title,
            doc.updated_at.format("%Y-%m-%d %H:%M")
        ));
    }

    let output = DocsListOutput {
        root: ctx.docs_root.display().to_string(),
        total: documents.len(),
        documents,
    };
    emit_success(ctx.output, "docs list", &output, Some(&human))
}

pub fn run_show(ctx: &Context, slug: &str, html: bool) -> Result<()> {
    let loader = DocumentLoader::new(&ctx.docs_root);
    let document = loader
        .get(slug)?
        .ok_or_else(|| Error::DocumentNotFound(slug.to_string()))?;

    if !ctx.output.json {
        if !ctx.output.quiet {
            if html {
                print!("{}", markdown::to_html(&document.content));
            } else {
                print!("{}", document.content);
                if !document.content.ends_with('\n') {
                    println!();
                }
            }
        }
        return Ok(());
    }

    let rendered = html.then(|| markdown::to_html(&document.content));
    let output = DocShowOutput {
        document,
        html: rendered,
    };
    emit_success(ctx.output, "docs show", &output, None)
}
