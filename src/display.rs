// ============================================================================
// File: src/display.rs
// Terminal rendering of chat turns and the product grid
// ============================================================================

use colored::*;

use crate::models::{ChatTurn, ProductRecord, Role};

/// Width of one product card, in characters
const CELL_WIDTH: usize = 30;

/// Row and column of the `index`-th product in a grid `columns` wide.
pub fn grid_position(index: usize, columns: usize) -> (usize, usize) {
    let columns = columns.max(1);
    (index / columns, index % columns)
}

pub fn print_turn(turn: &ChatTurn, columns: usize) {
    let speaker = match turn.role() {
        Role::User => "You".bright_green().bold(),
        Role::Assistant => "ShopBot".bright_cyan().bold(),
    };
    println!("\n{} {}", "●".bright_black(), speaker);
    println!("{}", render_inline_markdown(turn.content()));

    if let Some(products) = turn.products() {
        println!();
        print!("{}", render_product_grid(products, columns));
    }
}

pub fn print_history(turns: &[ChatTurn], columns: usize) {
    println!("{}", "─".repeat(40).bright_black());
    for turn in turns {
        print_turn(turn, columns);
    }
    println!("{}", "─".repeat(40).bright_black());
}

/// Cards laid out row by row, followed by the numbered deal links.
pub fn render_product_grid(products: &[ProductRecord], columns: usize) -> String {
    let columns = columns.max(1);
    let mut out = String::new();

    let mut rows: Vec<Vec<Vec<String>>> = vec![Vec::new(); products.len().div_ceil(columns)];
    for (i, product) in products.iter().enumerate() {
        let (row, _) = grid_position(i, columns);
        rows[row].push(card_lines(i + 1, product));
    }

    for cells in &rows {
        let height = cells.iter().map(Vec::len).max().unwrap_or(0);

        for line in 0..height {
            let parts: Vec<String> = cells
                .iter()
                .map(|cell| fit(cell.get(line).map(String::as_str).unwrap_or(""), CELL_WIDTH))
                .collect();
            out.push_str(parts.join(" | ").trim_end());
            out.push('\n');
        }
        out.push('\n');
    }

    for (i, product) in products.iter().enumerate() {
        out.push_str(&format!("[{}] View Deal: {}\n", i + 1, product.display_link()));
    }

    out
}

fn card_lines(number: usize, product: &ProductRecord) -> Vec<String> {
    let mut lines = wrap(&format!("#{} {}", number, product.display_title()), CELL_WIDTH);
    lines.push(format!("Price: {}", product.display_price()));
    lines.push(format!("Rating: {}", product.display_rating()));
    lines.push(format!("Store: {}", product.display_source()));
    lines.push(match product.thumbnail {
        Some(_) => "Image: available".to_string(),
        None => "No Image".to_string(),
    });
    lines
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Cut or pad `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

/// Renders `**bold**` spans; everything else is printed as-is.
pub fn render_inline_markdown(text: &str) -> String {
    let segments: Vec<&str> = text.split("**").collect();
    // An odd number of markers leaves the last one unmatched
    if segments.len() % 2 == 0 {
        return text.to_string();
    }

    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            if i % 2 == 1 {
                segment.bold().to_string()
            } else {
                segment.to_string()
            }
        })
        .collect()
}
