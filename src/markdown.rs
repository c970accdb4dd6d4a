// ============================================================================
// File: src/markdown.rs
// Markdown export of the conversation transcript
// ============================================================================

use anyhow::Result;
use chrono::Local;
use std::fs;
use std::path::Path;

use crate::models::{ChatTurn, ProductRecord, Role};

pub struct MarkdownExporter<'a> {
    turns: &'a [ChatTurn],
}

impl<'a> MarkdownExporter<'a> {
    pub fn new(turns: &'a [ChatTurn]) -> Self {
        Self { turns }
    }

    pub fn export(&self, path: &Path) -> Result<()> {
        fs::write(path, self.render())?;
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut content = String::new();

        self.write_header(&mut content);
        self.write_transcript(&mut content);

        content
    }

    fn write_header(&self, content: &mut String) {
        content.push_str("# ShopBot Conversation\n\n");
        content.push_str(&format!("**Date**: {}\n\n", Local::now().format("%Y-%m-%d %H:%M:%S")));
        content.push_str(&format!("**Turns**: {}\n\n", self.turns.len()));
    }

    fn write_transcript(&self, content: &mut String) {
        content.push_str("## Transcript\n\n");

        for turn in self.turns {
            let speaker = match turn.role() {
                Role::User => "You",
                Role::Assistant => "ShopBot",
            };
            content.push_str(&format!("### {}\n\n", speaker));
            content.push_str(turn.content());
            content.push_str("\n\n");

            if let Some(products) = turn.products() {
                Self::write_products(content, products);
            }

            content.push_str("---\n\n");
        }
    }

    fn write_products(content: &mut String, products: &[ProductRecord]) {
        content.push_str("| # | Title | Price | Rating | Store | Link |\n");
        content.push_str("|---|---|---|---|---|---|\n");
        for (i, product) in products.iter().enumerate() {
            content.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                i + 1,
                cell(&product.display_title()),
                cell(product.display_price()),
                cell(&product.display_rating()),
                cell(product.display_source()),
                cell(product.display_link()),
            ));
        }
        content.push('\n');
    }
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
